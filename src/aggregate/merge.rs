#![deny(missing_docs)]

//! # Document Merging
//!
//! Merges a source document into a destination. Definitions with the
//! same name and identical content are shared; conflicting content
//! either fails the merge or is renamed `<name>_v<i>` with every `$ref`
//! in the source rewritten to follow.

use crate::error::{AppError, AppResult};
use crate::model::schema::DEFINITIONS_REF_PREFIX;
use crate::model::v2::Swagger;
use crate::walker::walk_refs;
use std::collections::HashMap;
use tracing::debug;

/// Conflict policy for [`merge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Any conflicting definition aborts the merge.
    FailOnConflict,
    /// Conflicting source definitions are renamed `<name>_v<i>`.
    RenameOnConflict,
}

/// Merges `source` into `dest`.
///
/// Path conflicts are always fatal. Definition conflicts obey `mode`.
/// `source` is deep-cloned before any rename, so the caller's copy is
/// never modified.
pub fn merge(dest: &mut Swagger, source: &Swagger, mode: MergeMode) -> AppResult<()> {
    merge_impl(dest, source, mode, false)
}

/// Like [`merge`], but a path already present in `dest` is kept as-is
/// and the source's copy is dropped instead of failing the merge.
pub fn merge_ignore_path_conflicts(
    dest: &mut Swagger,
    source: &Swagger,
    mode: MergeMode,
) -> AppResult<()> {
    merge_impl(dest, source, mode, true)
}

fn merge_impl(
    dest: &mut Swagger,
    source: &Swagger,
    mode: MergeMode,
    ignore_path_conflicts: bool,
) -> AppResult<()> {
    let conflicts: Vec<String> = source
        .definitions
        .iter()
        .filter(|(name, schema)| {
            dest.definitions
                .get(name.as_str())
                .is_some_and(|existing| existing != *schema)
        })
        .map(|(name, _)| name.clone())
        .collect();

    if !conflicts.is_empty() && mode == MergeMode::FailOnConflict {
        return Err(AppError::MergeConflict(conflicts[0].clone()));
    }

    let mut source = source.clone();
    if !conflicts.is_empty() {
        let renames = plan_renames(dest, &source, &conflicts);
        apply_renames(&mut source, &renames);
    }

    for (name, schema) in source.definitions {
        dest.definitions.entry(name).or_insert(schema);
    }

    for (pattern, item) in source.paths.paths {
        if dest.paths.paths.contains_key(&pattern) {
            if ignore_path_conflicts {
                debug!(path = %pattern, "keeping existing path over merged duplicate");
                continue;
            }
            return Err(AppError::PathConflict(pattern));
        }
        dest.paths.paths.insert(pattern, item);
    }
    for (key, value) in source.paths.extensions.0 {
        dest.paths.extensions.insert(key, value);
    }

    Ok(())
}

/// Folds several sources into `dest` with rename-on-conflict semantics.
pub fn merge_specs<'a, I>(dest: &mut Swagger, sources: I) -> AppResult<()>
where
    I: IntoIterator<Item = &'a Swagger>,
{
    for source in sources {
        merge(dest, source, MergeMode::RenameOnConflict)?;
    }
    Ok(())
}

/// Chooses a fresh `<name>_v<i>` for each conflicting definition.
///
/// The counter starts at 2 and a candidate is rejected while it is used
/// in dest, in source, or already chosen during this pass.
fn plan_renames(
    dest: &Swagger,
    source: &Swagger,
    conflicts: &[String],
) -> HashMap<String, String> {
    let mut renames = HashMap::new();
    let mut chosen: Vec<String> = Vec::new();
    for name in conflicts {
        let mut i = 2usize;
        let fresh = loop {
            let candidate = format!("{}_v{}", name, i);
            let taken = dest.definitions.contains_key(&candidate)
                || source.definitions.contains_key(&candidate)
                || chosen.iter().any(|c| c == &candidate);
            if !taken {
                break candidate;
            }
            i += 1;
        };
        debug!(from = %name, to = %fresh, "renaming conflicting definition");
        chosen.push(fresh.clone());
        renames.insert(name.clone(), fresh);
    }
    renames
}

/// Rewrites every `$ref` in `source` per the rename table, then moves the
/// renamed definitions under their new names.
fn apply_renames(source: &mut Swagger, renames: &HashMap<String, String>) {
    let by_ref: HashMap<String, String> = renames
        .iter()
        .map(|(old, new)| {
            (
                format!("{}{}", DEFINITIONS_REF_PREFIX, old),
                format!("{}{}", DEFINITIONS_REF_PREFIX, new),
            )
        })
        .collect();

    walk_refs(source, &mut |reference: &str| {
        by_ref.get(reference).cloned()
    });

    for (old, new) in renames {
        if let Some(schema) = source.definitions.shift_remove(old) {
            source.definitions.insert(new.clone(), schema);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::schema::definition_name;
    use crate::walker::collect_refs;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn dest_doc() -> Swagger {
        Swagger::from_json_value(json!({
            "swagger": "2.0",
            "paths": {
                "/pets": {"get": {"responses": {"200": {
                    "description": "ok", "schema": {"$ref": "#/definitions/Pet"}}}}}
            },
            "definitions": {
                "Pet": {"type": "object",
                        "properties": {"name": {"type": "string"}}}
            }
        }))
        .unwrap()
    }

    fn source_doc() -> Swagger {
        Swagger::from_json_value(json!({
            "swagger": "2.0",
            "paths": {
                "/orders": {"get": {"responses": {"200": {
                    "description": "ok", "schema": {"$ref": "#/definitions/Pet"}}}}}
            },
            "definitions": {
                "Pet": {"type": "object",
                        "properties": {"id": {"type": "integer"}}},
                "Order": {"type": "object"}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_merge_renames_conflict_and_rewrites_refs() {
        let mut dest = dest_doc();
        let source = source_doc();
        merge(&mut dest, &source, MergeMode::RenameOnConflict).unwrap();

        let mut names: Vec<&String> = dest.definitions.keys().collect();
        names.sort();
        assert_eq!(names, vec!["Order", "Pet", "Pet_v2"]);
        assert!(dest.paths.paths.contains_key("/pets"));
        assert!(dest.paths.paths.contains_key("/orders"));

        let orders = &dest.paths.paths["/orders"];
        let schema = orders.get.as_ref().unwrap().responses.as_ref().unwrap()
            .status_codes[&200]
            .schema
            .as_ref()
            .unwrap();
        assert_eq!(schema.reference.as_deref(), Some("#/definitions/Pet_v2"));
    }

    #[test]
    fn test_merge_fail_on_conflict() {
        let mut dest = dest_doc();
        let err = merge(&mut dest, &source_doc(), MergeMode::FailOnConflict).unwrap_err();
        assert!(matches!(err, AppError::MergeConflict(ref name) if name == "Pet"));
    }

    #[test]
    fn test_merge_self_is_noop_for_definitions() {
        let mut dest = dest_doc();
        let copy = dest.clone();
        // Same paths conflict, so merge a path-less copy of itself.
        let mut source = copy.clone();
        source.paths.paths.clear();
        merge(&mut dest, &source, MergeMode::RenameOnConflict).unwrap();
        assert_eq!(dest.definitions, copy.definitions);
    }

    #[test]
    fn test_merge_empty_source_is_noop() {
        let mut dest = dest_doc();
        let before = dest.clone();
        merge(&mut dest, &Swagger::default(), MergeMode::RenameOnConflict).unwrap();
        assert_eq!(dest, before);
    }

    #[test]
    fn test_merge_path_conflict_is_fatal() {
        let mut dest = dest_doc();
        let mut source = Swagger::default();
        source.paths.paths.insert(
            "/pets".to_string(),
            dest.paths.paths["/pets"].clone(),
        );
        let err = merge(&mut dest, &source, MergeMode::RenameOnConflict).unwrap_err();
        assert!(matches!(err, AppError::PathConflict(ref p) if p == "/pets"));
    }

    #[test]
    fn test_rename_counter_skips_taken_names() {
        let mut dest = dest_doc();
        dest.definitions.insert(
            "Pet_v2".to_string(),
            crate::model::schema::Schema::of_type("string"),
        );
        merge(&mut dest, &source_doc(), MergeMode::RenameOnConflict).unwrap();
        assert!(dest.definitions.contains_key("Pet_v3"));
        assert!(!dest.definitions.contains_key("Pet_v4"));
    }

    #[test]
    fn test_all_refs_resolve_after_rename_merge() {
        let mut dest = dest_doc();
        merge(&mut dest, &source_doc(), MergeMode::RenameOnConflict).unwrap();
        let report = collect_refs(&dest);
        assert!(report.unresolved.is_empty());
        for reference in &report.refs {
            let name = definition_name(reference).unwrap();
            assert!(dest.definitions.contains_key(name), "dangling {}", reference);
        }
    }

    #[test]
    fn test_merge_ignore_path_conflicts_keeps_dest() {
        let mut dest = dest_doc();
        let mut source = dest_doc();
        source
            .paths
            .paths
            .get_mut("/pets")
            .unwrap()
            .get
            .as_mut()
            .unwrap()
            .operation_id = Some("shadowed".to_string());
        merge_ignore_path_conflicts(&mut dest, &source, MergeMode::RenameOnConflict).unwrap();
        let kept = dest.paths.paths["/pets"].get.as_ref().unwrap();
        assert!(kept.operation_id.is_none());
    }

    #[test]
    fn test_source_not_mutated_by_rename() {
        let mut dest = dest_doc();
        let source = source_doc();
        let before = source.clone();
        merge(&mut dest, &source, MergeMode::RenameOnConflict).unwrap();
        assert_eq!(source, before);
    }
}
