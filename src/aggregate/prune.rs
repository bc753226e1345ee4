#![deny(missing_docs)]

//! # Path Pruning
//!
//! Filters a document down to the paths matching a set of allowed
//! prefixes, then drops every definition not reachable from the retained
//! paths via `$ref`.

use crate::model::schema::definition_name;
use crate::model::v2::Swagger;
use crate::walker::walk_reachable_refs;
use std::collections::HashMap;
use std::collections::HashSet;

/// A compact character trie over allowed path prefixes.
///
/// `matches(path)` is true iff some stored prefix is a prefix of `path`.
#[derive(Debug, Default)]
pub struct PathPrefixTrie {
    children: HashMap<char, PathPrefixTrie>,
    terminal: bool,
}

impl PathPrefixTrie {
    /// Builds a trie from an iterator of prefixes.
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut trie = PathPrefixTrie::default();
        for prefix in prefixes {
            trie.insert(prefix.as_ref());
        }
        trie
    }

    /// Adds one prefix.
    pub fn insert(&mut self, prefix: &str) {
        let mut node = self;
        for ch in prefix.chars() {
            node = node.children.entry(ch).or_default();
        }
        node.terminal = true;
    }

    /// True iff some stored prefix prefixes `path`.
    pub fn matches(&self, path: &str) -> bool {
        let mut node = self;
        if node.terminal {
            return true;
        }
        for ch in path.chars() {
            match node.children.get(&ch) {
                Some(next) => {
                    node = next;
                    if node.terminal {
                        return true;
                    }
                }
                None => return false,
            }
        }
        false
    }
}

/// Returns a copy of `doc` containing only the paths matching some
/// allowed prefix, plus the transitive closure of definitions reachable
/// from the retained subset.
pub fn filter_by_path_prefixes<I, S>(doc: &Swagger, prefixes: I) -> Swagger
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let trie = PathPrefixTrie::new(prefixes);
    let mut out = doc.clone();

    out.paths.paths.retain(|pattern, _| trie.matches(pattern));

    // Reachability: chasing refs from the retained paths visits exactly
    // the transitive closure of referenced definitions.
    let mut reachable: HashSet<String> = HashSet::new();
    let mut probe = out.clone();
    walk_reachable_refs(&mut probe, &mut |reference: &str| -> Option<String> {
        if let Some(name) = definition_name(reference) {
            reachable.insert(name.to_string());
        }
        None
    });

    out.definitions
        .retain(|name, _| reachable.contains(name.as_str()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_trie_prefix_matching() {
        let trie = PathPrefixTrie::new(["/api/v1", "/healthz"]);
        assert!(trie.matches("/api/v1/pets"));
        assert!(trie.matches("/api/v1"));
        assert!(trie.matches("/healthz"));
        assert!(!trie.matches("/api/v2/pets"));
        assert!(!trie.matches("/api"));
    }

    #[test]
    fn test_empty_prefix_matches_everything() {
        let trie = PathPrefixTrie::new([""]);
        assert!(trie.matches("/anything"));
    }

    fn three_path_doc() -> Swagger {
        Swagger::from_json_value(json!({
            "swagger": "2.0",
            "paths": {
                "/a": {"get": {"responses": {"200": {
                    "description": "ok", "schema": {"$ref": "#/definitions/A"}}}}},
                "/b": {"get": {"responses": {"200": {
                    "description": "ok", "schema": {"$ref": "#/definitions/B"}}}}},
                "/c": {"get": {"responses": {"200": {
                    "description": "ok", "schema": {"$ref": "#/definitions/C"}}}}}
            },
            "definitions": {
                "A": {"type": "object"},
                "B": {"type": "object"},
                "C": {"type": "object"}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_prune_keeps_only_matching_path_and_reachable_defs() {
        let doc = three_path_doc();
        let pruned = filter_by_path_prefixes(&doc, ["/a"]);
        let paths: Vec<&String> = pruned.paths.paths.keys().collect();
        assert_eq!(paths, vec!["/a"]);
        let defs: Vec<&String> = pruned.definitions.keys().collect();
        assert_eq!(defs, vec!["A"]);
    }

    #[test]
    fn test_prune_transitive_closure() {
        let doc = Swagger::from_json_value(json!({
            "swagger": "2.0",
            "paths": {
                "/a": {"get": {"responses": {"200": {
                    "description": "ok", "schema": {"$ref": "#/definitions/A"}}}}},
                "/z": {"get": {"responses": {"200": {
                    "description": "ok", "schema": {"$ref": "#/definitions/Z"}}}}}
            },
            "definitions": {
                "A": {"type": "object",
                      "properties": {"b": {"$ref": "#/definitions/B"}}},
                "B": {"type": "object",
                      "properties": {"c": {"$ref": "#/definitions/C"}}},
                "C": {"type": "object"},
                "Z": {"type": "object"}
            }
        }))
        .unwrap();
        let pruned = filter_by_path_prefixes(&doc, ["/a"]);
        let mut defs: Vec<&String> = pruned.definitions.keys().collect();
        defs.sort();
        assert_eq!(defs, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_prune_no_match_empties_document() {
        let doc = three_path_doc();
        let pruned = filter_by_path_prefixes(&doc, ["/nope"]);
        assert!(pruned.paths.paths.is_empty());
        assert!(pruned.definitions.is_empty());
    }
}
