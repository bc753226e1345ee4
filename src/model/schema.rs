#![deny(missing_docs)]

//! # Schema Objects
//!
//! The recursive OpenAPI schema model shared by Swagger 2.0 documents and
//! OpenAPI v3 components.
//!
//! Polymorphic JSON forms are modelled as tagged variants:
//! - `additionalProperties` / `additionalItems` are *schema-or-bool*.
//! - `items` is *schema-or-array-of-schemas*.
//! - `type` is one string or a list of strings.
//!
//! Schemas hold `$ref` strings rather than owning pointers; cyclic
//! definitions are representable because traversal goes through the
//! document's definition table by name.

use crate::model::extensions::Extensions;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Prefix of a local v2 definition reference.
pub const DEFINITIONS_REF_PREFIX: &str = "#/definitions/";

/// Prefix of a local v3 component-schema reference.
pub const COMPONENTS_SCHEMAS_REF_PREFIX: &str = "#/components/schemas/";

/// One JSON type name or a list of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringOrStrings {
    /// A single type name, e.g. `"object"`.
    Single(String),
    /// Several admitted type names.
    Multiple(Vec<String>),
}

impl StringOrStrings {
    /// Iterates over the contained type names.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match self {
            StringOrStrings::Single(s) => std::slice::from_ref(s),
            StringOrStrings::Multiple(v) => v.as_slice(),
        };
        slice.iter().map(String::as_str)
    }

    /// True when `name` is among the contained type names.
    pub fn contains(&self, name: &str) -> bool {
        self.iter().any(|t| t == name)
    }
}

impl From<&str> for StringOrStrings {
    fn from(value: &str) -> Self {
        StringOrStrings::Single(value.to_string())
    }
}

/// A schema or a boolean switch (`additionalProperties`, `additionalItems`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaOrBool {
    /// `true` allows arbitrary extra members, `false` rejects them.
    Bool(bool),
    /// Extra members must validate against this schema.
    Schema(Box<Schema>),
}

impl SchemaOrBool {
    /// Returns the schema alternative, if present.
    pub fn as_schema(&self) -> Option<&Schema> {
        match self {
            SchemaOrBool::Schema(s) => Some(s),
            SchemaOrBool::Bool(_) => None,
        }
    }

    /// True unless this is an explicit `false`.
    pub fn allows(&self) -> bool {
        !matches!(self, SchemaOrBool::Bool(false))
    }
}

/// A single schema or an ordered tuple of schemas (`items`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaOrArray {
    /// Every element validates against one schema.
    Single(Box<Schema>),
    /// Positional validation: element `i` validates against schema `i`.
    Multiple(Vec<Schema>),
}

impl SchemaOrArray {
    /// Returns the single-schema alternative, if present.
    pub fn as_single(&self) -> Option<&Schema> {
        match self {
            SchemaOrArray::Single(s) => Some(s),
            SchemaOrArray::Multiple(_) => None,
        }
    }
}

/// An OpenAPI / JSON-Schema object.
///
/// Every recognized field round-trips; everything else lands in
/// `extensions` when `x-`-prefixed and is dropped otherwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Local reference (`#/definitions/...` or `#/components/schemas/...`).
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// Short title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Longer description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Admitted JSON types.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<StringOrStrings>,

    /// Format registry key, e.g. `date-time` or `uuid`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Default value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<JsonValue>,

    /// Upper numeric bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,

    /// Whether `maximum` is exclusive.
    #[serde(rename = "exclusiveMaximum", skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<bool>,

    /// Lower numeric bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,

    /// Whether `minimum` is exclusive.
    #[serde(rename = "exclusiveMinimum", skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<bool>,

    /// Numeric values must be an integer multiple of this (strictly positive).
    #[serde(rename = "multipleOf", skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,

    /// Maximum string length, counted in code points.
    #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,

    /// Minimum string length, counted in code points.
    #[serde(rename = "minLength", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,

    /// Regex the string value must match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Maximum array cardinality.
    #[serde(rename = "maxItems", skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,

    /// Minimum array cardinality.
    #[serde(rename = "minItems", skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,

    /// Array elements must be pairwise structurally distinct.
    #[serde(rename = "uniqueItems", skip_serializing_if = "Option::is_none")]
    pub unique_items: Option<bool>,

    /// Admitted literal values.
    #[serde(
        rename = "enum",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub enum_values: Vec<JsonValue>,

    /// Maximum number of object properties.
    #[serde(rename = "maxProperties", skip_serializing_if = "Option::is_none")]
    pub max_properties: Option<u64>,

    /// Minimum number of object properties.
    #[serde(rename = "minProperties", skip_serializing_if = "Option::is_none")]
    pub min_properties: Option<u64>,

    /// Property names that must be present.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    /// Element schema, or a positional tuple of schemas.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<SchemaOrArray>,

    /// Validation of elements beyond a positional `items` tuple.
    #[serde(rename = "additionalItems", skip_serializing_if = "Option::is_none")]
    pub additional_items: Option<SchemaOrBool>,

    /// Value must satisfy every subschema.
    #[serde(rename = "allOf", default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<Schema>,

    /// Value must satisfy at least one subschema.
    #[serde(rename = "anyOf", default, skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<Schema>,

    /// Value must satisfy exactly one subschema.
    #[serde(rename = "oneOf", default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<Schema>,

    /// Value must not satisfy the subschema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<Schema>>,

    /// Named property schemas.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,

    /// Properties whose *names* match the regex key validate against the value.
    #[serde(
        rename = "patternProperties",
        default,
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub pattern_properties: IndexMap<String, Schema>,

    /// Validation of properties not covered by `properties`.
    #[serde(
        rename = "additionalProperties",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<SchemaOrBool>,

    /// v3: whether `null` is admitted alongside the declared type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,

    /// Vendor extensions (`x-...`).
    #[serde(flatten)]
    pub extensions: Extensions,
}

impl Schema {
    /// A schema admitting a single JSON type.
    pub fn of_type(type_name: &str) -> Self {
        Schema {
            schema_type: Some(type_name.into()),
            ..Schema::default()
        }
    }

    /// A bare `$ref` schema pointing at a v2 definition.
    pub fn definition_ref(name: &str) -> Self {
        Schema {
            reference: Some(format!("{}{}", DEFINITIONS_REF_PREFIX, name)),
            ..Schema::default()
        }
    }

    /// True when this schema is only a reference.
    pub fn is_ref(&self) -> bool {
        self.reference.is_some()
    }

    /// True when `type_name` is among the admitted types.
    pub fn admits_type(&self, type_name: &str) -> bool {
        match &self.schema_type {
            Some(types) => types.contains(type_name),
            None => false,
        }
    }
}

/// Extracts the definition name from a local v2 reference string.
///
/// Returns `None` for external or non-definition references.
pub fn definition_name(reference: &str) -> Option<&str> {
    let name = reference.strip_prefix(DEFINITIONS_REF_PREFIX)?;
    if name.is_empty() || name.contains('/') {
        None
    } else {
        Some(name)
    }
}

/// Extracts the `(kind, name)` pair from a local v3 component reference.
pub fn component_name(reference: &str) -> Option<(&str, &str)> {
    let rest = reference.strip_prefix("#/components/")?;
    let (kind, name) = rest.split_once('/')?;
    if kind.is_empty() || name.is_empty() || name.contains('/') {
        None
    } else {
        Some((kind, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_schema_round_trip_preserves_fields_and_extensions() {
        let raw = json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "minLength": 1},
                "age": {"type": "integer", "minimum": 0.0}
            },
            "required": ["name"],
            "additionalProperties": false,
            "x-origin": "core",
            "ignoredUnknownKey": 42
        });
        let schema: Schema = serde_json::from_value(raw).unwrap();
        assert!(schema.admits_type("object"));
        assert_eq!(schema.required, vec!["name".to_string()]);
        assert_eq!(
            schema.additional_properties,
            Some(SchemaOrBool::Bool(false))
        );
        assert_eq!(schema.extensions.get("x-origin"), Some(&json!("core")));

        let back = serde_json::to_value(&schema).unwrap();
        assert!(back.get("ignoredUnknownKey").is_none());
        assert_eq!(back["x-origin"], json!("core"));
        let again: Schema = serde_json::from_value(back).unwrap();
        assert_eq!(schema, again);
    }

    #[test]
    fn test_items_decodes_both_forms() {
        let single: Schema =
            serde_json::from_value(json!({"type": "array", "items": {"type": "string"}})).unwrap();
        assert!(matches!(single.items, Some(SchemaOrArray::Single(_))));

        let tuple: Schema = serde_json::from_value(json!({
            "type": "array",
            "items": [{"type": "string"}, {"type": "integer"}]
        }))
        .unwrap();
        match tuple.items {
            Some(SchemaOrArray::Multiple(ref schemas)) => assert_eq!(schemas.len(), 2),
            _ => panic!("expected tuple items"),
        }
    }

    #[test]
    fn test_additional_properties_schema_form() {
        let schema: Schema = serde_json::from_value(json!({
            "type": "object",
            "additionalProperties": {"type": "integer"}
        }))
        .unwrap();
        let extra = schema.additional_properties.unwrap();
        assert!(extra.allows());
        assert!(extra.as_schema().unwrap().admits_type("integer"));
    }

    #[test]
    fn test_type_list_form() {
        let schema: Schema =
            serde_json::from_value(json!({"type": ["string", "null"]})).unwrap();
        assert!(schema.admits_type("string"));
        assert!(schema.admits_type("null"));
        assert!(!schema.admits_type("object"));
    }

    #[test]
    fn test_definition_name_extraction() {
        assert_eq!(definition_name("#/definitions/Pet"), Some("Pet"));
        assert_eq!(definition_name("#/definitions/Pet/props"), None);
        assert_eq!(definition_name("#/components/schemas/Pet"), None);
        assert_eq!(definition_name("http://other.host/#/definitions/Pet"), None);
    }

    #[test]
    fn test_component_name_extraction() {
        assert_eq!(
            component_name("#/components/schemas/Pet"),
            Some(("schemas", "Pet"))
        );
        assert_eq!(
            component_name("#/components/responses/NotFound"),
            Some(("responses", "NotFound"))
        );
        assert_eq!(component_name("#/definitions/Pet"), None);
    }
}
