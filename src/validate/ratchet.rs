#![deny(missing_docs)]

//! # Ratcheting Validation
//!
//! Update-time validation that keeps stored values writable: an error in
//! the new value is downgraded to a warning when the subtree it points
//! at is structurally unchanged from the old value.
//!
//! Correlation between old and new follows object keys by name and list
//! elements by index (atomic lists), by key tuple (map-lists), or by
//! value (set-lists). Ambiguous correlation (duplicate map-list keys)
//! disables ratcheting for that subtree. Composition findings
//! (`allOf`/`anyOf`/`oneOf`/`not`) are never downgraded: attributing
//! them to one subtree is not well-defined.

use crate::model::schema::{Schema, SchemaOrArray};
use crate::validate::equality::{
    correlate, find_correlated, list_semantics, property_schema, CorrelatedOld, Correlation,
    ListSemantics, SchemaContext,
};
use crate::validate::result::{Segment, ValidationOutcome};
use crate::validate::Validator;
use serde_json::Value as JsonValue;

/// Validates `new` and downgrades errors on unchanged subtrees.
pub(crate) fn validate_update(
    validator: &Validator,
    schema: &Schema,
    old: &JsonValue,
    new: &JsonValue,
) -> ValidationOutcome {
    let outcome = validator.validate(schema, new);
    if outcome.is_valid() {
        return outcome;
    }

    let ctx = validator.context();
    let mut ratcheted = ValidationOutcome {
        errors: Vec::new(),
        warnings: outcome.warnings,
        rule_compile_errors: outcome.rule_compile_errors,
    };

    for finding in outcome.errors {
        let keep = finding.code.is_composition()
            || !subtree_unchanged(ctx, Some(schema), old, new, &finding.segments);
        if keep {
            ratcheted.errors.push(finding);
        } else {
            ratcheted.warnings.push(finding);
        }
    }

    ratcheted
}

/// Walks `old` and `new` in lockstep down to `segments` and compares the
/// subtrees there. Returns false when the paths diverge, correlation is
/// ambiguous, or the subtrees differ.
fn subtree_unchanged<'a>(
    ctx: &'a SchemaContext<'a>,
    mut schema: Option<&'a Schema>,
    old: &JsonValue,
    new: &JsonValue,
    segments: &[Segment],
) -> bool {
    let mut old_cursor = Some(old);
    let mut new_cursor = Some(new);

    for segment in segments {
        schema = schema.and_then(|s| ctx.resolve(s));
        let (Some(old_here), Some(new_here)) = (old_cursor, new_cursor) else {
            // The path bottomed out early on one side; only matching
            // absence on both sides ratchets, handled after the loop.
            return false;
        };

        match segment {
            Segment::Key(key) => {
                let (JsonValue::Object(old_map), JsonValue::Object(new_map)) =
                    (old_here, new_here)
                else {
                    return false;
                };
                old_cursor = old_map.get(key);
                new_cursor = new_map.get(key);
                schema = schema.and_then(|s| property_schema(s, key));
            }
            Segment::Index(index) => {
                let (JsonValue::Array(old_items), JsonValue::Array(new_items)) =
                    (old_here, new_here)
                else {
                    return false;
                };
                let semantics = schema
                    .map(list_semantics)
                    .unwrap_or(ListSemantics::Atomic);
                let element = schema.and_then(|s| element_schema_at(s, *index));
                match find_correlated(ctx, element, &semantics, old_items, new_items, *index) {
                    CorrelatedOld::Found(old_item) => {
                        old_cursor = Some(old_item);
                        new_cursor = new_items.get(*index);
                    }
                    CorrelatedOld::Missing | CorrelatedOld::Ambiguous => return false,
                }
                schema = element;
            }
        }
    }

    match (old_cursor, new_cursor) {
        // Absent on both sides (e.g. a missing required property that
        // was already missing) is unchanged.
        (None, None) => true,
        (Some(old_sub), Some(new_sub)) => {
            correlate(ctx, schema, old_sub, new_sub) == Correlation::Equal
        }
        _ => false,
    }
}

fn element_schema_at(schema: &Schema, index: usize) -> Option<&Schema> {
    match &schema.items {
        Some(SchemaOrArray::Single(item)) => Some(item),
        Some(SchemaOrArray::Multiple(tuple)) => tuple.get(index),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::v2::Swagger;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schema(raw: serde_json::Value) -> Schema {
        serde_json::from_value(raw).unwrap()
    }

    fn ratchet_schema() -> Schema {
        schema(json!({
            "type": "object",
            "properties": {
                "x": {"type": "integer", "minimum": 10.0},
                "y": {"type": "string"}
            }
        }))
    }

    #[test]
    fn test_unchanged_invalid_subtree_downgrades() {
        let doc = Swagger::default();
        let validator = Validator::new(&doc);
        let s = ratchet_schema();

        let old = json!({"x": 5, "y": "a"});
        let new = json!({"x": 5, "y": "b"});
        let out = validator.validate_update(&s, &old, &new);
        assert!(out.errors.is_empty());
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].path, ".x");
    }

    #[test]
    fn test_changed_invalid_subtree_keeps_error() {
        let doc = Swagger::default();
        let validator = Validator::new(&doc);
        let s = ratchet_schema();

        let old = json!({"x": 5, "y": "a"});
        let new = json!({"x": 4, "y": "a"});
        let out = validator.validate_update(&s, &old, &new);
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].path, ".x");
    }

    #[test]
    fn test_identical_trees_never_error() {
        let doc = Swagger::default();
        let validator = Validator::new(&doc);
        let s = schema(json!({
            "type": "object",
            "required": ["missing"],
            "properties": {
                "x": {"type": "integer", "minimum": 10.0}
            },
            "additionalProperties": false
        }));
        let value = json!({"x": 1, "stray": true});
        let out = validator.validate_update(&s, &value, &value.clone());
        assert!(out.errors.is_empty());
        assert!(!out.warnings.is_empty());
    }

    #[test]
    fn test_map_list_correlation_survives_reorder() {
        let doc = Swagger::default();
        let validator = Validator::new(&doc);
        let s = schema(json!({
            "type": "array",
            "items": {
                "type": "object",
                "properties": {"id": {"type": "string"},
                                "val": {"type": "integer", "minimum": 1.0}}
            },
            "x-list-type": "map",
            "x-list-map-keys": ["id"]
        }));

        let old = json!([{"id": "a", "val": 0}, {"id": "b", "val": 2}]);
        let new = json!([{"id": "b", "val": 2}, {"id": "a", "val": 0}]);
        let out = validator.validate_update(&s, &old, &new);
        // "a" is still invalid but unchanged, found by key despite the
        // reorder.
        assert!(out.errors.is_empty());
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_duplicate_map_keys_disable_ratcheting() {
        let doc = Swagger::default();
        let validator = Validator::new(&doc);
        let s = schema(json!({
            "type": "array",
            "items": {
                "type": "object",
                "properties": {"id": {"type": "string"},
                                "val": {"type": "integer", "minimum": 1.0}}
            },
            "x-list-type": "map",
            "x-list-map-keys": ["id"]
        }));

        let old = json!([{"id": "a", "val": 0}, {"id": "a", "val": 0}]);
        let new = json!([{"id": "a", "val": 0}, {"id": "a", "val": 0}]);
        let out = validator.validate_update(&s, &old, &new);
        assert_eq!(out.errors.len(), 2);
    }

    #[test]
    fn test_composition_failures_never_ratchet() {
        let doc = Swagger::default();
        let validator = Validator::new(&doc);
        let s = schema(json!({
            "type": "object",
            "properties": {
                "v": {"anyOf": [{"type": "string"}, {"type": "integer"}]}
            }
        }));
        let value = json!({"v": true});
        let out = validator.validate_update(&s, &value, &value.clone());
        // The anyOf finding stays an error even though old == new.
        assert_eq!(out.errors.len(), 1);
    }

    #[test]
    fn test_ratchet_through_ref() {
        let doc = Swagger::from_json_value(json!({
            "swagger": "2.0",
            "definitions": {
                "Item": {
                    "type": "object",
                    "properties": {"n": {"type": "integer", "maximum": 5.0}}
                }
            }
        }))
        .unwrap();
        let validator = Validator::new(&doc);
        let s = schema(json!({
            "type": "object",
            "properties": {"item": {"$ref": "#/definitions/Item"}}
        }));
        let old = json!({"item": {"n": 9}});
        let new = json!({"item": {"n": 9}});
        let out = validator.validate_update(&s, &old, &new);
        assert!(out.errors.is_empty());
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].path, ".item.n");
    }
}
