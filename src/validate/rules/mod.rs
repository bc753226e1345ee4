#![deny(missing_docs)]

//! # Expression Rules
//!
//! Inline validation rules attached to a schema through the
//! `x-validations` vendor extension. Each entry carries a rule source
//! string, an optional static message, and an optional message
//! expression evaluated against the same value.
//!
//! Rules compile once per validator; compile failures are collected and
//! reported, never aborting construction.

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod value;

pub use eval::CompiledRule;
pub use value::{adapt, rule_values_equal, Lister, Mapper, RuleValue};

use crate::model::schema::Schema;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Vendor extension carrying the rule list.
pub const VALIDATIONS_EXT: &str = "x-validations";

/// One rule object from `x-validations`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RuleSpec {
    /// Rule source expression; must evaluate to a boolean.
    pub rule: String,
    /// Static failure message.
    #[serde(default)]
    pub message: Option<String>,
    /// Expression producing a failure message, evaluated on the value.
    #[serde(rename = "messageExpression", default)]
    pub message_expression: Option<String>,
    /// Transition-rule flag carried through for callers that correlate
    /// old and new values themselves.
    #[serde(rename = "optionalOldSelf", default)]
    pub optional_old_self: Option<bool>,
}

/// Reads the rule list declared on a schema.
///
/// A malformed extension value is a compile-level problem: it is
/// returned as `Err` so the caller can collect it without aborting.
pub fn rules_of(schema: &Schema) -> Result<Vec<RuleSpec>, String> {
    let Some(raw) = schema.extensions.get(VALIDATIONS_EXT) else {
        return Ok(Vec::new());
    };
    serde_json::from_value(raw.clone())
        .map_err(|e| format!("malformed {} extension: {}", VALIDATIONS_EXT, e))
}

/// Cache of compiled rules, keyed by rule source.
///
/// Compiled rules live as long as the validator that owns the cache;
/// compile failures are memoized the same way successes are.
#[derive(Default)]
pub struct RuleCache {
    compiled: Mutex<HashMap<String, Result<Arc<CompiledRule>, String>>>,
}

impl RuleCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the compiled form of `source`, compiling at most once.
    pub fn get_or_compile(&self, source: &str) -> Result<Arc<CompiledRule>, String> {
        let mut compiled = self.compiled.lock();
        compiled
            .entry(source.to_string())
            .or_insert_with(|| CompiledRule::compile(source).map(Arc::new))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rules_of_parses_extension() {
        let schema: Schema = serde_json::from_value(json!({
            "type": "array",
            "x-validations": [
                {"rule": "self.all(e, e.val > 0)", "message": "vals must be positive"}
            ]
        }))
        .unwrap();
        let rules = rules_of(&schema).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].message.as_deref(), Some("vals must be positive"));
    }

    #[test]
    fn test_rules_of_malformed_extension() {
        let schema: Schema = serde_json::from_value(json!({
            "x-validations": {"rule": "not-a-list"}
        }))
        .unwrap();
        assert!(rules_of(&schema).is_err());
    }

    #[test]
    fn test_cache_memoizes_compile_failure() {
        let cache = RuleCache::new();
        let first = cache.get_or_compile("self ==");
        let second = cache.get_or_compile("self ==");
        assert!(first.is_err());
        assert_eq!(first.err(), second.err());
    }

    #[test]
    fn test_cache_returns_shared_rule() {
        let cache = RuleCache::new();
        let a = cache.get_or_compile("self > 0").unwrap();
        let b = cache.get_or_compile("self > 0").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
