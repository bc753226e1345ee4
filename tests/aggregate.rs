//! End-to-end aggregation scenarios: merge with rename and ref rewrite,
//! pruning by path prefix, and aggregator idempotence.

use openapi_kit::walker::collect_refs;
use openapi_kit::{filter_by_path_prefixes, merge, merge_specs, MergeMode, Swagger};
use pretty_assertions::assert_eq;
use serde_json::json;

fn doc(raw: serde_json::Value) -> Swagger {
    Swagger::from_json_value(raw).unwrap()
}

#[test]
fn merge_rename_rewrite_scenario() {
    let mut dest = doc(json!({
        "swagger": "2.0",
        "definitions": {
            "Pet": {"type": "object", "properties": {"name": {"type": "string"}}}
        },
        "paths": {
            "/pets": {"get": {"responses": {"200": {
                "description": "ok", "schema": {"$ref": "#/definitions/Pet"}}}}}
        }
    }));
    let source = doc(json!({
        "swagger": "2.0",
        "definitions": {
            "Pet": {"type": "object", "properties": {"id": {"type": "integer"}}},
            "Order": {"type": "object"}
        },
        "paths": {
            "/orders": {"get": {"responses": {"200": {
                "description": "ok", "schema": {"$ref": "#/definitions/Pet"}}}}}
        }
    }));

    merge(&mut dest, &source, MergeMode::RenameOnConflict).unwrap();

    let mut names: Vec<&String> = dest.definitions.keys().collect();
    names.sort();
    assert_eq!(names, vec!["Order", "Pet", "Pet_v2"]);

    let mut paths: Vec<&String> = dest.paths.paths.keys().collect();
    paths.sort();
    assert_eq!(paths, vec!["/orders", "/pets"]);

    // The source's own Pet kept its shape under the new name.
    assert!(dest.definitions["Pet_v2"].properties.contains_key("id"));
    assert!(dest.definitions["Pet"].properties.contains_key("name"));

    // The ref under /orders follows the rename.
    let rewritten = dest.paths.paths["/orders"]
        .get
        .as_ref()
        .unwrap()
        .responses
        .as_ref()
        .unwrap()
        .status_codes[&200]
        .schema
        .as_ref()
        .unwrap()
        .reference
        .clone();
    assert_eq!(rewritten.as_deref(), Some("#/definitions/Pet_v2"));

    // Every ref in the merged document resolves.
    let report = collect_refs(&dest);
    assert!(report.unresolved.is_empty());
}

#[test]
fn prune_scenario() {
    let spec = doc(json!({
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
    }));

    let pruned = filter_by_path_prefixes(&spec, ["/a"]);
    assert_eq!(
        pruned.paths.paths.keys().collect::<Vec<_>>(),
        vec!["/a"]
    );
    assert_eq!(
        pruned.definitions.keys().collect::<Vec<_>>(),
        vec!["A"]
    );
}

#[test]
fn merge_is_idempotent_for_equal_definitions() {
    let base = doc(json!({
        "swagger": "2.0",
        "definitions": {
            "Shared": {"type": "object", "properties": {"v": {"type": "integer"}}}
        },
        "paths": {}
    }));

    let mut dest = base.clone();
    merge(&mut dest, &base, MergeMode::RenameOnConflict).unwrap();
    // Structurally equal definitions are shared, not renamed.
    assert_eq!(dest.definitions.len(), 1);
    assert!(dest.definitions.contains_key("Shared"));
}

#[test]
fn merge_with_empty_is_identity() {
    let base = doc(json!({
        "swagger": "2.0",
        "definitions": {"D": {"type": "object"}},
        "paths": {
            "/d": {"get": {"responses": {"200": {"description": "ok"}}}}
        }
    }));
    let mut dest = base.clone();
    merge(&mut dest, &Swagger::default(), MergeMode::RenameOnConflict).unwrap();
    assert_eq!(dest, base);
}

#[test]
fn merge_specs_folds_many_sources() {
    let mut dest = doc(json!({"swagger": "2.0", "paths": {}}));
    let one = doc(json!({
        "swagger": "2.0",
        "definitions": {"A": {"type": "object"}},
        "paths": {"/a": {"get": {"responses": {"200": {"description": "ok"}}}}}
    }));
    let two = doc(json!({
        "swagger": "2.0",
        "definitions": {"B": {"type": "object"}},
        "paths": {"/b": {"get": {"responses": {"200": {"description": "ok"}}}}}
    }));
    merge_specs(&mut dest, [&one, &two]).unwrap();
    assert_eq!(dest.definitions.len(), 2);
    assert_eq!(dest.paths.paths.len(), 2);
}

#[test]
fn document_round_trip_preserves_extensions_and_order() {
    let raw = json!({
        "swagger": "2.0",
        "info": {"title": "RT", "version": "1", "x-meta": {"stage": "ga"}},
        "paths": {
            "/z": {"get": {"responses": {"200": {"description": "ok"}}},
                    "x-owner": "z-team"},
            "/a": {"get": {"responses": {"default": {"description": "any"}}}}
        },
        "definitions": {
            "Zed": {"type": "object", "x-stored": true},
            "Alpha": {"type": "string", "enum": ["x", "y"]}
        },
        "x-root": [1, 2, 3]
    });
    let parsed = Swagger::from_json_value(raw).unwrap();
    let emitted = parsed.to_json_value().unwrap();
    let reparsed = Swagger::from_json_value(emitted.clone()).unwrap();
    assert_eq!(parsed, reparsed);

    // Insertion order of paths and definitions survives.
    let paths: Vec<&String> = parsed.paths.paths.keys().collect();
    assert_eq!(paths, vec!["/z", "/a"]);
    let defs: Vec<&String> = parsed.definitions.keys().collect();
    assert_eq!(defs, vec!["Zed", "Alpha"]);
    assert_eq!(emitted["x-root"], json!([1, 2, 3]));
}
