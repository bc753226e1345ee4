#![deny(missing_docs)]

//! # Schema-Aware Equality
//!
//! Deep equality over JSON values where list semantics come from vendor
//! extensions on the governing schema:
//!
//! - `x-list-type: map`: elements are keyed by the field tuple declared
//!   in `x-list-map-keys`; order is irrelevant.
//! - `x-list-type: set`: unordered equality of scalar elements.
//! - anything else: positional (atomic) equality.
//!
//! Maps compare key-wise. Duplicate keys in a map-list make correlation
//! ambiguous; ratcheting treats ambiguity as "not equal".

use crate::model::schema::{component_name, definition_name, Schema, SchemaOrArray};
use crate::model::v2::Swagger;
use crate::model::v3::OpenApi;
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use std::sync::OnceLock;

/// Vendor extension naming the list semantics.
pub const LIST_TYPE_EXT: &str = "x-list-type";

/// Vendor extension declaring the key fields of a map-list.
pub const LIST_MAP_KEYS_EXT: &str = "x-list-map-keys";

const MAX_REF_DEPTH: usize = 32;

/// Which local reference form the scope resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefStyle {
    /// `#/definitions/<name>` (v2).
    Definitions,
    /// `#/components/schemas/<name>` (v3).
    ComponentSchemas,
}

/// Resolution scope for local `$ref`s during validation.
#[derive(Debug, Clone, Copy)]
pub struct SchemaContext<'a> {
    /// The document's named-schema table.
    pub definitions: &'a IndexMap<String, Schema>,
    style: RefStyle,
}

fn empty_definitions() -> &'static IndexMap<String, Schema> {
    static EMPTY: OnceLock<IndexMap<String, Schema>> = OnceLock::new();
    EMPTY.get_or_init(IndexMap::new)
}

impl<'a> SchemaContext<'a> {
    /// Scope over a v2 document's definitions.
    pub fn of(doc: &'a Swagger) -> Self {
        SchemaContext {
            definitions: &doc.definitions,
            style: RefStyle::Definitions,
        }
    }

    /// Scope over a v3 document's component schemas.
    pub fn of_v3(doc: &'a OpenApi) -> Self {
        SchemaContext {
            definitions: doc
                .components
                .as_ref()
                .map(|components| &components.schemas)
                .unwrap_or_else(|| empty_definitions()),
            style: RefStyle::ComponentSchemas,
        }
    }

    /// A scope with no definitions.
    pub fn empty() -> SchemaContext<'static> {
        SchemaContext {
            definitions: empty_definitions(),
            style: RefStyle::Definitions,
        }
    }

    /// Extracts the local schema name a reference points at, in this
    /// scope's reference style.
    pub fn local_name<'r>(&self, reference: &'r str) -> Option<&'r str> {
        match self.style {
            RefStyle::Definitions => definition_name(reference),
            RefStyle::ComponentSchemas => match component_name(reference) {
                Some(("schemas", name)) => Some(name),
                _ => None,
            },
        }
    }

    /// Follows `$ref` chains to a concrete schema. Returns `None` when a
    /// reference is external, missing, or too deep.
    pub fn resolve<'s>(&'s self, schema: &'s Schema) -> Option<&'s Schema> {
        let mut current = schema;
        for _ in 0..MAX_REF_DEPTH {
            match &current.reference {
                None => return Some(current),
                Some(reference) => {
                    let name = self.local_name(reference)?;
                    current = self.definitions.get(name)?;
                }
            }
        }
        None
    }
}

/// Element-equality semantics of a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListSemantics {
    /// Positional equality.
    Atomic,
    /// Unordered equality of scalars.
    Set,
    /// Keyed by the declared field tuple, order-insensitive.
    Map(Vec<String>),
}

/// Reads the list semantics declared on a schema.
pub fn list_semantics(schema: &Schema) -> ListSemantics {
    match schema.extensions.get(LIST_TYPE_EXT).and_then(JsonValue::as_str) {
        Some("set") => ListSemantics::Set,
        Some("map") => {
            let keys: Vec<String> = schema
                .extensions
                .get(LIST_MAP_KEYS_EXT)
                .and_then(JsonValue::as_array)
                .map(|keys| {
                    keys.iter()
                        .filter_map(JsonValue::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            if keys.is_empty() {
                ListSemantics::Atomic
            } else {
                ListSemantics::Map(keys)
            }
        }
        _ => ListSemantics::Atomic,
    }
}

/// Result of correlating two subtrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correlation {
    /// Structurally equal under the governing semantics.
    Equal,
    /// Structurally different.
    Different,
    /// Correlation is not well-defined (e.g. duplicate map-list keys).
    Ambiguous,
}

/// Schema-aware deep equality.
pub fn deep_equal(
    ctx: &SchemaContext,
    schema: Option<&Schema>,
    a: &JsonValue,
    b: &JsonValue,
) -> bool {
    correlate(ctx, schema, a, b) == Correlation::Equal
}

/// Correlates two values under the governing schema's semantics.
pub fn correlate(
    ctx: &SchemaContext,
    schema: Option<&Schema>,
    a: &JsonValue,
    b: &JsonValue,
) -> Correlation {
    let schema = schema.and_then(|s| ctx.resolve(s));

    match (a, b) {
        (JsonValue::Array(left), JsonValue::Array(right)) => {
            let semantics = schema.map(list_semantics).unwrap_or(ListSemantics::Atomic);
            correlate_lists(ctx, schema, &semantics, left, right)
        }
        (JsonValue::Object(left), JsonValue::Object(right)) => {
            if left.len() != right.len() {
                return Correlation::Different;
            }
            let mut outcome = Correlation::Equal;
            for (key, left_value) in left {
                let Some(right_value) = right.get(key) else {
                    return Correlation::Different;
                };
                let property = schema.and_then(|s| property_schema(s, key));
                match correlate(ctx, property, left_value, right_value) {
                    Correlation::Equal => {}
                    Correlation::Ambiguous => outcome = Correlation::Ambiguous,
                    Correlation::Different => return Correlation::Different,
                }
            }
            outcome
        }
        (JsonValue::Number(left), JsonValue::Number(right)) => {
            if numbers_equal(left, right) {
                Correlation::Equal
            } else {
                Correlation::Different
            }
        }
        _ => {
            if a == b {
                Correlation::Equal
            } else {
                Correlation::Different
            }
        }
    }
}

fn correlate_lists(
    ctx: &SchemaContext,
    schema: Option<&Schema>,
    semantics: &ListSemantics,
    left: &[JsonValue],
    right: &[JsonValue],
) -> Correlation {
    if left.len() != right.len() {
        return Correlation::Different;
    }
    let element = schema.and_then(element_schema);

    match semantics {
        ListSemantics::Atomic => {
            let mut outcome = Correlation::Equal;
            for (index, left_value) in left.iter().enumerate() {
                match correlate(ctx, element, left_value, &right[index]) {
                    Correlation::Equal => {}
                    Correlation::Ambiguous => outcome = Correlation::Ambiguous,
                    Correlation::Different => return Correlation::Different,
                }
            }
            outcome
        }
        ListSemantics::Set => {
            let mut used = vec![false; right.len()];
            for left_value in left {
                let mut found = false;
                for (index, right_value) in right.iter().enumerate() {
                    if !used[index]
                        && correlate(ctx, element, left_value, right_value) == Correlation::Equal
                    {
                        used[index] = true;
                        found = true;
                        break;
                    }
                }
                if !found {
                    return Correlation::Different;
                }
            }
            Correlation::Equal
        }
        ListSemantics::Map(keys) => {
            let left_keyed = match key_elements(left, keys) {
                Some(map) => map,
                None => return Correlation::Ambiguous,
            };
            let right_keyed = match key_elements(right, keys) {
                Some(map) => map,
                None => return Correlation::Ambiguous,
            };
            if left_keyed.len() != right_keyed.len() {
                return Correlation::Different;
            }
            let mut outcome = Correlation::Equal;
            for (key, left_value) in left_keyed {
                let Some(&right_value) = right_keyed.get(&key) else {
                    return Correlation::Different;
                };
                match correlate(ctx, element, left_value, right_value) {
                    Correlation::Equal => {}
                    Correlation::Ambiguous => outcome = Correlation::Ambiguous,
                    Correlation::Different => return Correlation::Different,
                }
            }
            outcome
        }
    }
}

/// Extracts the declared key tuple of a map-list element, canonicalized
/// for use as a correlation key.
pub fn map_key_of(element: &JsonValue, keys: &[String]) -> String {
    let mut out = String::new();
    for key in keys {
        let value = element.get(key).cloned().unwrap_or(JsonValue::Null);
        out.push_str(&value.to_string());
        out.push('\u{1f}');
    }
    out
}

fn key_elements<'v>(
    items: &'v [JsonValue],
    keys: &[String],
) -> Option<IndexMap<String, &'v JsonValue>> {
    let mut out = IndexMap::new();
    for item in items {
        let key = map_key_of(item, keys);
        // Duplicate key tuples make correlation ambiguous.
        if out.insert(key, item).is_some() {
            return None;
        }
    }
    Some(out)
}

/// Where an old-list element correlated with a new-list element lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelatedOld<'a> {
    /// The correlated old element.
    Found(&'a JsonValue),
    /// No old counterpart.
    Missing,
    /// Duplicate keys make the lookup ambiguous.
    Ambiguous,
}

/// Finds the old-list element correlated with `new_item`, per the list
/// semantics: by index (atomic), by key tuple (map-list), or by value
/// (set-list).
pub fn find_correlated<'a>(
    ctx: &SchemaContext,
    element_schema: Option<&Schema>,
    semantics: &ListSemantics,
    old_items: &'a [JsonValue],
    new_items: &[JsonValue],
    new_index: usize,
) -> CorrelatedOld<'a> {
    let Some(new_item) = new_items.get(new_index) else {
        return CorrelatedOld::Missing;
    };
    match semantics {
        ListSemantics::Atomic => match old_items.get(new_index) {
            Some(item) => CorrelatedOld::Found(item),
            None => CorrelatedOld::Missing,
        },
        ListSemantics::Set => {
            for old_item in old_items {
                if correlate(ctx, element_schema, old_item, new_item) == Correlation::Equal {
                    return CorrelatedOld::Found(old_item);
                }
            }
            CorrelatedOld::Missing
        }
        ListSemantics::Map(keys) => {
            let wanted = map_key_of(new_item, keys);
            // A duplicate of the wanted key on either side is ambiguous.
            let new_duplicates = new_items
                .iter()
                .filter(|item| map_key_of(item, keys) == wanted)
                .count();
            if new_duplicates > 1 {
                return CorrelatedOld::Ambiguous;
            }
            let mut found = None;
            for old_item in old_items {
                if map_key_of(old_item, keys) == wanted {
                    if found.is_some() {
                        return CorrelatedOld::Ambiguous;
                    }
                    found = Some(old_item);
                }
            }
            match found {
                Some(item) => CorrelatedOld::Found(item),
                None => CorrelatedOld::Missing,
            }
        }
    }
}

/// The element schema of an array schema, when it is a single schema.
pub fn element_schema(schema: &Schema) -> Option<&Schema> {
    match &schema.items {
        Some(SchemaOrArray::Single(item)) => Some(item),
        _ => None,
    }
}

/// The schema governing a named property.
pub fn property_schema<'s>(schema: &'s Schema, key: &str) -> Option<&'s Schema> {
    schema.properties.get(key).or_else(|| {
        schema
            .additional_properties
            .as_ref()
            .and_then(|extra| extra.as_schema())
    })
}

/// Numeric equality after widening.
pub fn numbers_equal(a: &serde_json::Number, b: &serde_json::Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}
