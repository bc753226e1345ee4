#![deny(missing_docs)]

//! # Value Validation
//!
//! Recursive validation of JSON values against OpenAPI schemas.
//!
//! Validation is total: it collects every violation reachable without
//! type ambiguity, short-circuiting a subtree only when the value's
//! dynamic type matches no declared schema type. Numbers unify through a
//! widening ladder (int64 → float64 → decimal string) before bounds are
//! compared.
//!
//! - **result**: findings and outcomes.
//! - **formats**: the process-wide string-format registry.
//! - **equality**: list-type-aware structural equality.
//! - **rules**: inline expression rules (`x-validations`).
//! - **ratchet**: update-time error downgrading.

pub mod equality;
pub mod formats;
pub mod ratchet;
pub mod result;
pub mod rules;

pub use equality::{
    deep_equal, list_semantics, Correlation, ListSemantics, SchemaContext, LIST_MAP_KEYS_EXT,
    LIST_TYPE_EXT,
};
pub use formats::{global_formats, normalize_format_name, FormatRegistry};
pub use result::{path_string, Finding, FindingCode, Segment, ValidationOutcome};
pub use rules::{CompiledRule, RuleCache, RuleSpec, VALIDATIONS_EXT};

use crate::model::schema::{Schema, SchemaOrArray, SchemaOrBool};
use crate::model::v2::Swagger;
use parking_lot::Mutex;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

const MAX_REF_DEPTH: usize = 32;
const MULTIPLE_OF_EPSILON: f64 = 1e-9;

/// Validates JSON values against schemas resolved in one document.
///
/// Construction compiles every expression rule reachable from the
/// document's definitions; compile failures are collected, not fatal.
/// Compiled regexes and rules are cached for the validator's lifetime.
pub struct Validator<'a> {
    ctx: SchemaContext<'a>,
    patterns: Mutex<HashMap<String, Option<Arc<Regex>>>>,
    rules: RuleCache,
    rule_compile_errors: Vec<String>,
}

impl<'a> Validator<'a> {
    /// Builds a validator scoped to a v2 document's definitions.
    pub fn new(root: &'a Swagger) -> Self {
        Self::from_context(SchemaContext::of(root))
    }

    /// Builds a validator scoped to a v3 document's component schemas.
    pub fn new_v3(root: &'a crate::model::v3::OpenApi) -> Self {
        Self::from_context(SchemaContext::of_v3(root))
    }

    fn from_context(ctx: SchemaContext<'a>) -> Self {
        let rules = RuleCache::new();
        let mut rule_compile_errors = Vec::new();
        for schema in ctx.definitions.values() {
            compile_rules_recursively(schema, &rules, &mut rule_compile_errors);
        }
        if !rule_compile_errors.is_empty() {
            debug!(
                count = rule_compile_errors.len(),
                "expression rules failed to compile"
            );
        }
        Validator {
            ctx,
            patterns: Mutex::new(HashMap::new()),
            rules,
            rule_compile_errors,
        }
    }

    /// The resolution scope backing this validator.
    pub fn context(&self) -> &SchemaContext<'a> {
        &self.ctx
    }

    /// Rule compile failures found at construction.
    pub fn rule_compile_errors(&self) -> &[String] {
        &self.rule_compile_errors
    }

    /// Validates `value` against `schema`.
    pub fn validate(&self, schema: &Schema, value: &JsonValue) -> ValidationOutcome {
        let mut out = ValidationOutcome::new();
        out.rule_compile_errors = self.rule_compile_errors.clone();
        let mut segments = Vec::new();
        self.validate_inner(schema, value, &mut segments, &mut out);
        out
    }

    /// Validates an update from `old` to `new`, downgrading errors on
    /// unchanged subtrees to warnings.
    pub fn validate_update(
        &self,
        schema: &Schema,
        old: &JsonValue,
        new: &JsonValue,
    ) -> ValidationOutcome {
        ratchet::validate_update(self, schema, old, new)
    }

    fn validate_inner(
        &self,
        schema: &Schema,
        value: &JsonValue,
        segments: &mut Vec<Segment>,
        out: &mut ValidationOutcome,
    ) {
        // Resolve local $refs; unresolved references are reported and
        // terminate this subtree only.
        let mut schema = schema;
        let mut depth = 0usize;
        while let Some(reference) = &schema.reference {
            let resolved = self
                .ctx
                .local_name(reference)
                .and_then(|name| self.ctx.definitions.get(name));
            match resolved {
                Some(next) => {
                    schema = next;
                    depth += 1;
                    if depth > MAX_REF_DEPTH {
                        out.error(
                            segments,
                            FindingCode::RefUnresolved,
                            format!("reference chain through '{}' is too deep", reference),
                        );
                        return;
                    }
                }
                None => {
                    out.error(
                        segments,
                        FindingCode::RefUnresolved,
                        format!("reference '{}' does not resolve", reference),
                    );
                    return;
                }
            }
        }

        if !type_admits(schema, value) {
            out.error(
                segments,
                FindingCode::TypeMismatch,
                format!(
                    "value of type {} is not admitted by the schema",
                    value_kind(value)
                ),
            );
            return;
        }

        self.check_enum(schema, value, segments, out);

        match value {
            JsonValue::Number(_) => self.check_numeric(schema, value, segments, out),
            JsonValue::String(text) => {
                if treat_as_number(schema, text) {
                    self.check_numeric(schema, value, segments, out);
                } else {
                    self.check_string(schema, text, segments, out);
                }
            }
            JsonValue::Array(items) => self.check_array(schema, items, segments, out),
            JsonValue::Object(map) => self.check_object(schema, map, segments, out),
            JsonValue::Null | JsonValue::Bool(_) => {}
        }

        self.check_composition(schema, value, segments, out);
        self.check_rules(schema, value, segments, out);
    }

    fn check_enum(
        &self,
        schema: &Schema,
        value: &JsonValue,
        segments: &[Segment],
        out: &mut ValidationOutcome,
    ) {
        if schema.enum_values.is_empty() {
            return;
        }
        let admitted = schema
            .enum_values
            .iter()
            .any(|candidate| deep_equal(&self.ctx, None, candidate, value));
        if !admitted {
            out.error(
                segments,
                FindingCode::Enum,
                "value is not among the admitted enum values",
            );
        }
    }

    fn check_numeric(
        &self,
        schema: &Schema,
        value: &JsonValue,
        segments: &[Segment],
        out: &mut ValidationOutcome,
    ) {
        let Some(number) = numeric_value(value) else {
            return;
        };

        if let Some(minimum) = schema.minimum {
            let exclusive = schema.exclusive_minimum.unwrap_or(false);
            let violated = if exclusive {
                number.float <= minimum
            } else {
                number.float < minimum
            };
            if violated {
                out.error(
                    segments,
                    FindingCode::Minimum,
                    format!(
                        "{} is less than {}minimum {}",
                        number.float,
                        if exclusive { "exclusive " } else { "" },
                        minimum
                    ),
                );
            }
        }

        if let Some(maximum) = schema.maximum {
            let exclusive = schema.exclusive_maximum.unwrap_or(false);
            let violated = if exclusive {
                number.float >= maximum
            } else {
                number.float > maximum
            };
            if violated {
                out.error(
                    segments,
                    FindingCode::Maximum,
                    format!(
                        "{} is greater than {}maximum {}",
                        number.float,
                        if exclusive { "exclusive " } else { "" },
                        maximum
                    ),
                );
            }
        }

        if let Some(multiple_of) = schema.multiple_of {
            // A non-positive multipleOf is a schema defect; the value
            // check only applies to strictly positive divisors.
            if multiple_of > 0.0 && !is_multiple_of(&number, multiple_of) {
                out.error(
                    segments,
                    FindingCode::MultipleOf,
                    format!("{} is not a multiple of {}", number.float, multiple_of),
                );
            }
        }

        // Integer formats bound the representable range.
        match schema.format.as_deref() {
            Some("int32") => {
                let in_range = number.float >= f64::from(i32::MIN)
                    && number.float <= f64::from(i32::MAX)
                    && number.float.fract() == 0.0;
                if !in_range {
                    out.error(
                        segments,
                        FindingCode::Format,
                        format!("{} does not fit in int32", number.float),
                    );
                }
            }
            Some("int64") => {
                let integral = number.int.is_some()
                    || (number.float.fract() == 0.0 && number.float.abs() < 9.224e18);
                if !integral {
                    out.error(
                        segments,
                        FindingCode::Format,
                        format!("{} does not fit in int64", number.float),
                    );
                }
            }
            _ => {}
        }
    }

    fn check_string(
        &self,
        schema: &Schema,
        text: &str,
        segments: &[Segment],
        out: &mut ValidationOutcome,
    ) {
        let length = text.chars().count() as u64;
        if let Some(min_length) = schema.min_length {
            if length < min_length {
                out.error(
                    segments,
                    FindingCode::MinLength,
                    format!("string is shorter than minLength {}", min_length),
                );
            }
        }
        if let Some(max_length) = schema.max_length {
            if length > max_length {
                out.error(
                    segments,
                    FindingCode::MaxLength,
                    format!("string is longer than maxLength {}", max_length),
                );
            }
        }

        if let Some(pattern) = &schema.pattern {
            match self.compiled_pattern(pattern, segments, out) {
                Some(regex) => {
                    if !regex.is_match(text) {
                        out.error(
                            segments,
                            FindingCode::Pattern,
                            format!("string does not match pattern '{}'", pattern),
                        );
                    }
                }
                None => {}
            }
        }

        if let Some(format) = &schema.format {
            // Unknown formats are accepted silently.
            if let Some(predicate) = global_formats().lookup(format) {
                if !predicate(text) {
                    out.error(
                        segments,
                        FindingCode::Format,
                        format!("string is not a valid {}", format),
                    );
                }
            }
        }
    }

    fn check_array(
        &self,
        schema: &Schema,
        items: &[JsonValue],
        segments: &mut Vec<Segment>,
        out: &mut ValidationOutcome,
    ) {
        let count = items.len() as u64;
        if let Some(min_items) = schema.min_items {
            if count < min_items {
                out.error(
                    segments,
                    FindingCode::MinItems,
                    format!("array has fewer than minItems {}", min_items),
                );
            }
        }
        if let Some(max_items) = schema.max_items {
            if count > max_items {
                out.error(
                    segments,
                    FindingCode::MaxItems,
                    format!("array has more than maxItems {}", max_items),
                );
            }
        }

        if schema.unique_items == Some(true) {
            'outer: for i in 0..items.len() {
                for j in (i + 1)..items.len() {
                    if deep_equal(&self.ctx, None, &items[i], &items[j]) {
                        out.error(
                            segments,
                            FindingCode::UniqueItems,
                            format!("items {} and {} are equal", i, j),
                        );
                        break 'outer;
                    }
                }
            }
        }

        match &schema.items {
            Some(SchemaOrArray::Single(element)) => {
                for (index, item) in items.iter().enumerate() {
                    segments.push(Segment::Index(index));
                    self.validate_inner(element, item, segments, out);
                    segments.pop();
                }
            }
            Some(SchemaOrArray::Multiple(tuple)) => {
                for (index, item) in items.iter().enumerate() {
                    segments.push(Segment::Index(index));
                    if let Some(positional) = tuple.get(index) {
                        self.validate_inner(positional, item, segments, out);
                    } else {
                        match &schema.additional_items {
                            Some(SchemaOrBool::Bool(false)) => {
                                out.error(
                                    segments,
                                    FindingCode::AdditionalItems,
                                    "surplus item beyond the declared tuple",
                                );
                            }
                            Some(SchemaOrBool::Schema(extra)) => {
                                self.validate_inner(extra, item, segments, out);
                            }
                            Some(SchemaOrBool::Bool(true)) | None => {}
                        }
                    }
                    segments.pop();
                }
            }
            None => {}
        }
    }

    fn check_object(
        &self,
        schema: &Schema,
        map: &serde_json::Map<String, JsonValue>,
        segments: &mut Vec<Segment>,
        out: &mut ValidationOutcome,
    ) {
        for required in &schema.required {
            if !map.contains_key(required) {
                segments.push(Segment::Key(required.clone()));
                out.error(
                    segments,
                    FindingCode::Required,
                    format!("required property '{}' is missing", required),
                );
                segments.pop();
            }
        }

        let count = map.len() as u64;
        if let Some(min_properties) = schema.min_properties {
            if count < min_properties {
                out.error(
                    segments,
                    FindingCode::MinProperties,
                    format!("object has fewer than minProperties {}", min_properties),
                );
            }
        }
        if let Some(max_properties) = schema.max_properties {
            if count > max_properties {
                out.error(
                    segments,
                    FindingCode::MaxProperties,
                    format!("object has more than maxProperties {}", max_properties),
                );
            }
        }

        for (key, item) in map {
            segments.push(Segment::Key(key.clone()));

            let declared = schema.properties.get(key);
            if let Some(property) = declared {
                self.validate_inner(property, item, segments, out);
            }

            let mut pattern_matched = false;
            for (pattern, property) in &schema.pattern_properties {
                if let Some(regex) = self.compiled_pattern(pattern, segments, out) {
                    if regex.is_match(key) {
                        pattern_matched = true;
                        self.validate_inner(property, item, segments, out);
                    }
                }
            }

            if declared.is_none() && !pattern_matched {
                match &schema.additional_properties {
                    Some(SchemaOrBool::Bool(false)) => {
                        out.error(
                            segments,
                            FindingCode::AdditionalProperties,
                            format!("property '{}' is not declared", key),
                        );
                    }
                    Some(SchemaOrBool::Schema(extra)) => {
                        self.validate_inner(extra, item, segments, out);
                    }
                    Some(SchemaOrBool::Bool(true)) | None => {}
                }
            }

            segments.pop();
        }
    }

    fn check_composition(
        &self,
        schema: &Schema,
        value: &JsonValue,
        segments: &mut Vec<Segment>,
        out: &mut ValidationOutcome,
    ) {
        for sub in &schema.all_of {
            self.validate_inner(sub, value, segments, out);
        }

        if !schema.any_of.is_empty() {
            let passed = schema.any_of.iter().any(|sub| {
                let mut scratch = ValidationOutcome::new();
                self.validate_inner(sub, value, segments, &mut scratch);
                scratch.is_valid()
            });
            if !passed {
                out.error(
                    segments,
                    FindingCode::AnyOf,
                    "value matches none of the anyOf schemas",
                );
            }
        }

        if !schema.one_of.is_empty() {
            let passing = schema
                .one_of
                .iter()
                .filter(|sub| {
                    let mut scratch = ValidationOutcome::new();
                    self.validate_inner(sub, value, segments, &mut scratch);
                    scratch.is_valid()
                })
                .count();
            if passing != 1 {
                out.error(
                    segments,
                    FindingCode::OneOf,
                    format!("value matches {} oneOf schemas instead of exactly one", passing),
                );
            }
        }

        if let Some(not) = &schema.not {
            let mut scratch = ValidationOutcome::new();
            self.validate_inner(not, value, segments, &mut scratch);
            if scratch.is_valid() {
                out.error(
                    segments,
                    FindingCode::Not,
                    "value matches the schema it must not match",
                );
            }
        }
    }

    fn check_rules(
        &self,
        schema: &Schema,
        value: &JsonValue,
        segments: &[Segment],
        out: &mut ValidationOutcome,
    ) {
        let specs = match rules::rules_of(schema) {
            Ok(specs) => specs,
            Err(message) => {
                push_compile_error(out, message);
                return;
            }
        };

        for spec in specs {
            let compiled = match self.rules.get_or_compile(&spec.rule) {
                Ok(compiled) => compiled,
                Err(message) => {
                    push_compile_error(out, message);
                    continue;
                }
            };
            let adapted = rules::adapt(&self.ctx, Some(schema), value);
            match compiled.evaluate(adapted) {
                Ok(true) => {}
                Ok(false) => {
                    let message = self.rule_message(&spec, schema, value);
                    out.error(segments, FindingCode::Rule, message);
                }
                Err(error) => {
                    out.error(
                        segments,
                        FindingCode::Rule,
                        format!("rule '{}' failed to evaluate: {}", spec.rule, error),
                    );
                }
            }
        }
    }

    fn rule_message(&self, spec: &RuleSpec, schema: &Schema, value: &JsonValue) -> String {
        if let Some(expression) = &spec.message_expression {
            if let Ok(compiled) = self.rules.get_or_compile(expression) {
                let adapted = rules::adapt(&self.ctx, Some(schema), value);
                if let Ok(rules::RuleValue::Str(message)) = compiled.evaluate_value(adapted) {
                    return message;
                }
            }
        }
        spec.message
            .clone()
            .unwrap_or_else(|| format!("failed rule: {}", spec.rule))
    }

    /// Returns the cached regex for `pattern`. A compile failure is
    /// reported on first use and swallowed afterwards.
    fn compiled_pattern(
        &self,
        pattern: &str,
        segments: &[Segment],
        out: &mut ValidationOutcome,
    ) -> Option<Arc<Regex>> {
        let mut patterns = self.patterns.lock();
        if let Some(cached) = patterns.get(pattern) {
            return cached.clone();
        }
        match Regex::new(pattern) {
            Ok(regex) => {
                let regex = Arc::new(regex);
                patterns.insert(pattern.to_string(), Some(Arc::clone(&regex)));
                Some(regex)
            }
            Err(error) => {
                patterns.insert(pattern.to_string(), None);
                out.error(
                    segments,
                    FindingCode::PatternInvalid,
                    format!("pattern '{}' does not compile: {}", pattern, error),
                );
                None
            }
        }
    }
}

fn push_compile_error(out: &mut ValidationOutcome, message: String) {
    if !out.rule_compile_errors.contains(&message) {
        out.rule_compile_errors.push(message);
    }
}

fn compile_rules_recursively(schema: &Schema, cache: &RuleCache, errors: &mut Vec<String>) {
    match rules::rules_of(schema) {
        Ok(specs) => {
            for spec in specs {
                if let Err(message) = cache.get_or_compile(&spec.rule) {
                    if !errors.contains(&message) {
                        errors.push(message);
                    }
                }
            }
        }
        Err(message) => {
            if !errors.contains(&message) {
                errors.push(message);
            }
        }
    }

    for sub in schema
        .all_of
        .iter()
        .chain(&schema.any_of)
        .chain(&schema.one_of)
    {
        compile_rules_recursively(sub, cache, errors);
    }
    if let Some(not) = &schema.not {
        compile_rules_recursively(not, cache, errors);
    }
    match &schema.items {
        Some(SchemaOrArray::Single(item)) => compile_rules_recursively(item, cache, errors),
        Some(SchemaOrArray::Multiple(items)) => {
            for item in items {
                compile_rules_recursively(item, cache, errors);
            }
        }
        None => {}
    }
    for property in schema
        .properties
        .values()
        .chain(schema.pattern_properties.values())
    {
        compile_rules_recursively(property, cache, errors);
    }
    if let Some(SchemaOrBool::Schema(extra)) = &schema.additional_properties {
        compile_rules_recursively(extra, cache, errors);
    }
    if let Some(SchemaOrBool::Schema(extra)) = &schema.additional_items {
        compile_rules_recursively(extra, cache, errors);
    }
}

struct Num {
    float: f64,
    int: Option<i64>,
}

fn numeric_value(value: &JsonValue) -> Option<Num> {
    match value {
        JsonValue::Number(number) => Some(Num {
            float: number.as_f64()?,
            int: number.as_i64(),
        }),
        JsonValue::String(text) => {
            let float = text.parse::<f64>().ok()?;
            Some(Num {
                float,
                int: text.parse::<i64>().ok(),
            })
        }
        _ => None,
    }
}

fn is_multiple_of(number: &Num, multiple_of: f64) -> bool {
    if let Some(int) = number.int {
        if multiple_of.fract() == 0.0 && multiple_of.abs() <= i64::MAX as f64 {
            let divisor = multiple_of as i64;
            if divisor != 0 {
                return int % divisor == 0;
            }
        }
    }
    let quotient = number.float / multiple_of;
    (quotient - quotient.round()).abs() < MULTIPLE_OF_EPSILON
}

fn value_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(number) => {
            if number.as_i64().is_some() || number.as_u64().is_some() {
                "integer"
            } else {
                "number"
            }
        }
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Vendor extension admitting either an integer or a string regardless
/// of the declared type.
pub const INT_OR_STRING_EXT: &str = "x-int-or-string";

fn int_or_string(schema: &Schema) -> bool {
    schema
        .extensions
        .get(INT_OR_STRING_EXT)
        .and_then(JsonValue::as_bool)
        .unwrap_or(false)
}

fn type_admits(schema: &Schema, value: &JsonValue) -> bool {
    if int_or_string(schema)
        && matches!(value, JsonValue::Number(_) | JsonValue::String(_))
    {
        return true;
    }
    let Some(types) = &schema.schema_type else {
        return true;
    };
    match value {
        JsonValue::Null => types.contains("null") || schema.nullable == Some(true),
        JsonValue::Bool(_) => types.contains("boolean"),
        JsonValue::Number(number) => {
            if number.as_i64().is_some() || number.as_u64().is_some() {
                types.contains("integer") || types.contains("number")
            } else {
                types.contains("number")
            }
        }
        JsonValue::String(text) => {
            types.contains("string") || treat_as_number(schema, text)
        }
        JsonValue::Array(_) => types.contains("array"),
        JsonValue::Object(_) => types.contains("object"),
    }
}

/// Decimal strings ride the numeric ladder only when the schema admits a
/// numeric type and not a string.
fn treat_as_number(schema: &Schema, text: &str) -> bool {
    let Some(types) = &schema.schema_type else {
        return false;
    };
    if types.contains("string") {
        return false;
    }
    if !(types.contains("number") || types.contains("integer")) {
        return false;
    }
    text.parse::<f64>().is_ok_and(f64::is_finite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schema(raw: serde_json::Value) -> Schema {
        serde_json::from_value(raw).unwrap()
    }

    fn empty_doc() -> Swagger {
        Swagger::default()
    }

    #[test]
    fn test_type_mismatch_stops_subtree() {
        let doc = empty_doc();
        let validator = Validator::new(&doc);
        let s = schema(json!({"type": "object", "required": ["a"]}));
        let out = validator.validate(&s, &json!("not an object"));
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].code, FindingCode::TypeMismatch);
    }

    #[test]
    fn test_numeric_bounds_and_exclusivity() {
        let doc = empty_doc();
        let validator = Validator::new(&doc);
        let s = schema(json!({
            "type": "integer", "minimum": 10.0, "exclusiveMinimum": true,
            "maximum": 20.0
        }));
        assert!(!validator.validate(&s, &json!(10)).is_valid());
        assert!(validator.validate(&s, &json!(11)).is_valid());
        assert!(validator.validate(&s, &json!(20)).is_valid());
        assert!(!validator.validate(&s, &json!(21)).is_valid());
    }

    #[test]
    fn test_multiple_of() {
        let doc = empty_doc();
        let validator = Validator::new(&doc);
        let s = schema(json!({"type": "number", "multipleOf": 0.5}));
        assert!(validator.validate(&s, &json!(2.5)).is_valid());
        assert!(!validator.validate(&s, &json!(2.7)).is_valid());

        let ints = schema(json!({"type": "integer", "multipleOf": 3.0}));
        assert!(validator.validate(&ints, &json!(9)).is_valid());
        assert!(!validator.validate(&ints, &json!(10)).is_valid());
    }

    #[test]
    fn test_string_checks_count_code_points() {
        let doc = empty_doc();
        let validator = Validator::new(&doc);
        let s = schema(json!({"type": "string", "minLength": 3, "maxLength": 3}));
        // Three code points, nine UTF-8 bytes.
        assert!(validator.validate(&s, &json!("äöü")).is_valid());
        assert!(!validator.validate(&s, &json!("ab")).is_valid());
    }

    #[test]
    fn test_pattern_and_invalid_pattern() {
        let doc = empty_doc();
        let validator = Validator::new(&doc);
        let s = schema(json!({"type": "string", "pattern": "^[a-z]+$"}));
        assert!(validator.validate(&s, &json!("abc")).is_valid());
        assert!(!validator.validate(&s, &json!("Abc")).is_valid());

        let bad = schema(json!({"type": "string", "pattern": "("}));
        let out = validator.validate(&bad, &json!("x"));
        assert_eq!(out.errors[0].code, FindingCode::PatternInvalid);
        // Reported on first use only.
        let again = validator.validate(&bad, &json!("y"));
        assert!(again.errors.is_empty());
    }

    #[test]
    fn test_unknown_format_accepted_silently() {
        let doc = empty_doc();
        let validator = Validator::new(&doc);
        let s = schema(json!({"type": "string", "format": "no-such-format"}));
        assert!(validator.validate(&s, &json!("anything")).is_valid());

        let known = schema(json!({"type": "string", "format": "uuid"}));
        assert!(!validator.validate(&known, &json!("nope")).is_valid());
    }

    #[test]
    fn test_array_checks() {
        let doc = empty_doc();
        let validator = Validator::new(&doc);
        let s = schema(json!({
            "type": "array", "minItems": 1, "maxItems": 3,
            "uniqueItems": true,
            "items": {"type": "integer"}
        }));
        assert!(validator.validate(&s, &json!([1, 2])).is_valid());
        assert!(!validator.validate(&s, &json!([])).is_valid());
        assert!(!validator.validate(&s, &json!([1, 1])).is_valid());
        let out = validator.validate(&s, &json!([1, "x"]));
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].path, "[1]");
    }

    #[test]
    fn test_tuple_items_and_additional_items() {
        let doc = empty_doc();
        let validator = Validator::new(&doc);
        let s = schema(json!({
            "type": "array",
            "items": [{"type": "string"}, {"type": "integer"}],
            "additionalItems": false
        }));
        assert!(validator.validate(&s, &json!(["a", 1])).is_valid());
        let out = validator.validate(&s, &json!(["a", 1, true]));
        assert_eq!(out.errors[0].code, FindingCode::AdditionalItems);
    }

    #[test]
    fn test_object_checks_collect_everything() {
        let doc = empty_doc();
        let validator = Validator::new(&doc);
        let s = schema(json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": {"type": "string"},
                "age": {"type": "integer", "minimum": 0.0}
            },
            "additionalProperties": false
        }));
        let out = validator.validate(&s, &json!({"age": -1, "extra": true}));
        let codes: Vec<FindingCode> = out.errors.iter().map(|e| e.code).collect();
        assert!(codes.contains(&FindingCode::Required));
        assert!(codes.contains(&FindingCode::Minimum));
        assert!(codes.contains(&FindingCode::AdditionalProperties));
        assert_eq!(out.errors.len(), 3);
    }

    #[test]
    fn test_pattern_properties() {
        let doc = empty_doc();
        let validator = Validator::new(&doc);
        let s = schema(json!({
            "type": "object",
            "patternProperties": {
                "^num_": {"type": "integer"}
            },
            "additionalProperties": false
        }));
        assert!(validator.validate(&s, &json!({"num_a": 3})).is_valid());
        assert!(!validator.validate(&s, &json!({"num_a": "x"})).is_valid());
        assert!(!validator.validate(&s, &json!({"other": 3})).is_valid());
    }

    #[test]
    fn test_composition_operators() {
        let doc = empty_doc();
        let validator = Validator::new(&doc);
        let any = schema(json!({
            "anyOf": [{"type": "string"}, {"type": "integer"}]
        }));
        assert!(validator.validate(&any, &json!("x")).is_valid());
        assert!(validator.validate(&any, &json!(3)).is_valid());
        assert!(!validator.validate(&any, &json!(true)).is_valid());

        let one = schema(json!({
            "oneOf": [
                {"type": "integer", "minimum": 0.0},
                {"type": "integer", "maximum": 10.0}
            ]
        }));
        // 5 matches both arms: not exactly one.
        assert!(!validator.validate(&one, &json!(5)).is_valid());
        assert!(validator.validate(&one, &json!(-5)).is_valid());

        let not = schema(json!({"not": {"type": "string"}}));
        assert!(validator.validate(&not, &json!(1)).is_valid());
        assert!(!validator.validate(&not, &json!("s")).is_valid());
    }

    #[test]
    fn test_ref_resolution_and_unresolved_report() {
        let doc = Swagger::from_json_value(json!({
            "swagger": "2.0",
            "definitions": {
                "Positive": {"type": "integer", "minimum": 1.0}
            }
        }))
        .unwrap();
        let validator = Validator::new(&doc);
        let via_ref = Schema::definition_ref("Positive");
        assert!(validator.validate(&via_ref, &json!(5)).is_valid());
        assert!(!validator.validate(&via_ref, &json!(0)).is_valid());

        let dangling = Schema::definition_ref("Missing");
        let out = validator.validate(&dangling, &json!(5));
        assert_eq!(out.errors[0].code, FindingCode::RefUnresolved);
    }

    #[test]
    fn test_expression_rule_failure_and_message() {
        let doc = empty_doc();
        let validator = Validator::new(&doc);
        let s = schema(json!({
            "type": "object",
            "properties": {"replicas": {"type": "integer"}},
            "x-validations": [
                {"rule": "self.replicas <= 5", "message": "too many replicas"}
            ]
        }));
        let out = validator.validate(&s, &json!({"replicas": 9}));
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].code, FindingCode::Rule);
        assert_eq!(out.errors[0].message, "too many replicas");
        assert!(validator.validate(&s, &json!({"replicas": 3})).is_valid());
    }

    #[test]
    fn test_rule_compile_error_collected_not_fatal() {
        let doc = Swagger::from_json_value(json!({
            "swagger": "2.0",
            "definitions": {
                "Broken": {
                    "type": "object",
                    "x-validations": [{"rule": "self =="}]
                }
            }
        }))
        .unwrap();
        let validator = Validator::new(&doc);
        assert_eq!(validator.rule_compile_errors().len(), 1);
        // Validation still works.
        let out = validator.validate(&Schema::definition_ref("Broken"), &json!({}));
        assert!(!out.rule_compile_errors.is_empty());
        assert!(out.errors.is_empty());
    }

    #[test]
    fn test_decimal_string_rides_numeric_ladder() {
        let doc = empty_doc();
        let validator = Validator::new(&doc);
        let s = schema(json!({"type": "number", "minimum": 10.0}));
        assert!(validator.validate(&s, &json!("12.5")).is_valid());
        assert!(!validator.validate(&s, &json!("9.5")).is_valid());
        assert!(!validator.validate(&s, &json!("not a number")).is_valid());
    }

    #[test]
    fn test_int_or_string_extension() {
        let doc = empty_doc();
        let validator = Validator::new(&doc);
        let s = schema(json!({"type": "integer", "x-int-or-string": true}));
        assert!(validator.validate(&s, &json!(8080)).is_valid());
        assert!(validator.validate(&s, &json!("http")).is_valid());
        assert!(!validator.validate(&s, &json!(true)).is_valid());
    }

    #[test]
    fn test_integer_format_bounds() {
        let doc = empty_doc();
        let validator = Validator::new(&doc);
        let s = schema(json!({"type": "integer", "format": "int32"}));
        assert!(validator.validate(&s, &json!(2_147_483_647i64)).is_valid());
        let out = validator.validate(&s, &json!(2_147_483_648i64));
        assert_eq!(out.errors[0].code, FindingCode::Format);
    }

    #[test]
    fn test_v3_component_resolution() {
        let doc: crate::model::v3::OpenApi = serde_json::from_value(json!({
            "openapi": "3.0.0",
            "info": {"title": "T", "version": "1"},
            "paths": {},
            "components": {
                "schemas": {
                    "Replicas": {"type": "integer", "minimum": 0.0}
                }
            }
        }))
        .unwrap();
        let validator = Validator::new_v3(&doc);
        let via_ref: Schema = serde_json::from_value(json!({
            "$ref": "#/components/schemas/Replicas"
        }))
        .unwrap();
        assert!(validator.validate(&via_ref, &json!(3)).is_valid());
        assert!(!validator.validate(&via_ref, &json!(-1)).is_valid());
    }

    #[test]
    fn test_null_admission() {
        let doc = empty_doc();
        let validator = Validator::new(&doc);
        let plain = schema(json!({"type": "string"}));
        assert!(!validator.validate(&plain, &json!(null)).is_valid());
        let nullable = schema(json!({"type": "string", "nullable": true}));
        assert!(validator.validate(&nullable, &json!(null)).is_valid());
        let union = schema(json!({"type": ["string", "null"]}));
        assert!(validator.validate(&union, &json!(null)).is_valid());
    }
}
