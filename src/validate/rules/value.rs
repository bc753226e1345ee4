#![deny(missing_docs)]

//! # Schema-Aware Rule Values
//!
//! Adapts a runtime JSON value into the shape the rule evaluator works
//! on, carrying the list semantics declared on the governing schema.
//! Equality of a `x-list-type=map` list is set equality keyed by the
//! declared key-field tuple; a `x-list-type=set` list compares as an
//! unordered set; everything else is positional. Maps compare key-wise.
//!
//! The evaluator consumes lists and maps through the [`Lister`] and
//! [`Mapper`] contracts, keeping the equality semantics independent of
//! the expression language's own value model.

use crate::model::schema::Schema;
use crate::validate::equality::{
    element_schema, list_semantics, property_schema, ListSemantics, SchemaContext,
};
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// A value as seen by the rule evaluator.
#[derive(Debug, Clone)]
pub enum RuleValue {
    /// JSON null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Float.
    Float(f64),
    /// String.
    Str(String),
    /// List with schema-derived semantics.
    List(Arc<SchemaedList>),
    /// String-keyed map.
    Map(Arc<SchemaedMap>),
}

/// List access contract consumed by the evaluator.
pub trait Lister {
    /// Number of elements.
    fn len(&self) -> usize;
    /// True when the list has no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Element at `index`.
    fn item(&self, index: usize) -> Option<&RuleValue>;
    /// Declared element-equality semantics.
    fn semantics(&self) -> &ListSemantics;
}

/// Map access contract consumed by the evaluator.
pub trait Mapper {
    /// Number of entries.
    fn len(&self) -> usize;
    /// Value under `key`.
    fn get(&self, key: &str) -> Option<&RuleValue>;
    /// Keys in insertion order.
    fn keys(&self) -> Vec<&str>;
}

/// A list plus its declared semantics.
#[derive(Debug)]
pub struct SchemaedList {
    /// The adapted elements.
    pub items: Vec<RuleValue>,
    /// Declared element-equality semantics.
    pub semantics: ListSemantics,
}

impl Lister for SchemaedList {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn item(&self, index: usize) -> Option<&RuleValue> {
        self.items.get(index)
    }

    fn semantics(&self) -> &ListSemantics {
        &self.semantics
    }
}

/// A string-keyed map of adapted values.
#[derive(Debug)]
pub struct SchemaedMap {
    /// The adapted entries, insertion-ordered.
    pub entries: IndexMap<String, RuleValue>,
}

impl Mapper for SchemaedMap {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn get(&self, key: &str) -> Option<&RuleValue> {
        self.entries.get(key)
    }

    fn keys(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}

/// Adapts a JSON value under its governing schema.
pub fn adapt(ctx: &SchemaContext, schema: Option<&Schema>, value: &JsonValue) -> RuleValue {
    let schema = schema.and_then(|s| ctx.resolve(s));
    match value {
        JsonValue::Null => RuleValue::Null,
        JsonValue::Bool(b) => RuleValue::Bool(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => RuleValue::Int(i),
            None => RuleValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(s) => RuleValue::Str(s.clone()),
        JsonValue::Array(items) => {
            let semantics = schema.map(list_semantics).unwrap_or(ListSemantics::Atomic);
            let element = schema.and_then(element_schema);
            let items = items
                .iter()
                .map(|item| adapt(ctx, element, item))
                .collect();
            RuleValue::List(Arc::new(SchemaedList { items, semantics }))
        }
        JsonValue::Object(map) => {
            let entries = map
                .iter()
                .map(|(key, item)| {
                    let property = schema.and_then(|s| property_schema(s, key));
                    (key.clone(), adapt(ctx, property, item))
                })
                .collect();
            RuleValue::Map(Arc::new(SchemaedMap { entries }))
        }
    }
}

/// Semantic equality between rule values.
pub fn rule_values_equal(a: &RuleValue, b: &RuleValue) -> bool {
    match (a, b) {
        (RuleValue::Null, RuleValue::Null) => true,
        (RuleValue::Bool(x), RuleValue::Bool(y)) => x == y,
        (RuleValue::Int(x), RuleValue::Int(y)) => x == y,
        (RuleValue::Float(x), RuleValue::Float(y)) => x == y,
        (RuleValue::Int(x), RuleValue::Float(y)) | (RuleValue::Float(y), RuleValue::Int(x)) => {
            (*x as f64) == *y
        }
        (RuleValue::Str(x), RuleValue::Str(y)) => x == y,
        (RuleValue::List(x), RuleValue::List(y)) => listers_equal(x.as_ref(), y.as_ref()),
        (RuleValue::Map(x), RuleValue::Map(y)) => mappers_equal(x.as_ref(), y.as_ref()),
        _ => false,
    }
}

/// Equality through the [`Lister`] contract, honoring the left list's
/// declared semantics.
pub fn listers_equal(a: &dyn Lister, b: &dyn Lister) -> bool {
    if a.len() != b.len() {
        return false;
    }
    match a.semantics() {
        ListSemantics::Atomic => (0..a.len()).all(|i| match (a.item(i), b.item(i)) {
            (Some(x), Some(y)) => rule_values_equal(x, y),
            _ => false,
        }),
        ListSemantics::Set => {
            let mut used = vec![false; b.len()];
            'outer: for i in 0..a.len() {
                let Some(x) = a.item(i) else { return false };
                for (j, slot) in used.iter_mut().enumerate() {
                    if !*slot && b.item(j).is_some_and(|y| rule_values_equal(x, y)) {
                        *slot = true;
                        continue 'outer;
                    }
                }
                return false;
            }
            true
        }
        ListSemantics::Map(keys) => {
            let left = keyed_items(a, keys);
            let right = keyed_items(b, keys);
            match (left, right) {
                (Some(left), Some(right)) => {
                    left.len() == right.len()
                        && left.iter().all(|(key, x)| {
                            right
                                .get(key)
                                .is_some_and(|y| rule_values_equal(x, y))
                        })
                }
                // Duplicate keys: fall back to positional comparison.
                _ => (0..a.len()).all(|i| match (a.item(i), b.item(i)) {
                    (Some(x), Some(y)) => rule_values_equal(x, y),
                    _ => false,
                }),
            }
        }
    }
}

/// Equality through the [`Mapper`] contract: key-wise structural.
pub fn mappers_equal(a: &dyn Mapper, b: &dyn Mapper) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.keys().iter().all(|key| match (a.get(key), b.get(key)) {
        (Some(x), Some(y)) => rule_values_equal(x, y),
        _ => false,
    })
}

fn keyed_items<'v>(
    list: &'v dyn Lister,
    keys: &[String],
) -> Option<IndexMap<String, &'v RuleValue>> {
    let mut out = IndexMap::new();
    for i in 0..list.len() {
        let item = list.item(i)?;
        let RuleValue::Map(map) = item else {
            return None;
        };
        let mut key_repr = String::new();
        for key_field in keys {
            match map.get(key_field) {
                Some(value) => key_repr.push_str(&key_string(value)),
                None => key_repr.push_str("null"),
            }
            key_repr.push('\u{1f}');
        }
        if out.insert(key_repr, item).is_some() {
            return None;
        }
    }
    Some(out)
}

fn key_string(value: &RuleValue) -> String {
    match value {
        RuleValue::Null => "null".to_string(),
        RuleValue::Bool(b) => b.to_string(),
        RuleValue::Int(i) => i.to_string(),
        RuleValue::Float(f) => f.to_string(),
        RuleValue::Str(s) => format!("{:?}", s),
        RuleValue::List(_) | RuleValue::Map(_) => "<composite>".to_string(),
    }
}
