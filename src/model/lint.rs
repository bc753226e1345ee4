#![deny(missing_docs)]

//! # Document Linting
//!
//! Structural checks over a parsed Swagger document, run before a
//! document is aggregated or served.
//!
//! Checks include:
//! - Version marker and required `info` fields.
//! - Tag-name uniqueness.
//! - Operation-id uniqueness across the document.
//! - Path-template parameters declared by a matching `in: path`
//!   parameter, which must be required.
//! - At most one body parameter per operation, and body parameters
//!   carry a schema.
//! - Operations declare at least one response.
//! - Security requirements reference declared security schemes.
//! - Every local `$ref` resolves.

use crate::model::v2::{Operation, Parameter, PathItem, Swagger};
use crate::validate::Validator;
use crate::walker::collect_refs;
use std::collections::HashSet;
use std::fmt;

/// One structural problem found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintIssue {
    /// Where the problem sits, e.g. `paths./pets.get`.
    pub location: String,
    /// What is wrong.
    pub message: String,
}

impl LintIssue {
    fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        LintIssue {
            location: location.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for LintIssue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Lints a document, collecting every structural problem found.
pub fn lint_document(doc: &Swagger) -> Vec<LintIssue> {
    let mut issues = Vec::new();
    check_version(doc, &mut issues);
    check_info(doc, &mut issues);
    check_tags_unique(doc, &mut issues);
    check_operations(doc, &mut issues);
    check_security(doc, &mut issues);
    check_refs(doc, &mut issues);
    check_defaults(doc, &mut issues);
    issues
}

fn check_version(doc: &Swagger, issues: &mut Vec<LintIssue>) {
    if !doc.swagger.is_empty() && doc.swagger != "2.0" {
        issues.push(LintIssue::new(
            "swagger",
            format!("version marker '{}' is not '2.0'", doc.swagger),
        ));
    }
}

fn check_info(doc: &Swagger, issues: &mut Vec<LintIssue>) {
    let Some(info) = &doc.info else {
        issues.push(LintIssue::new("info", "document is missing 'info'"));
        return;
    };
    if info.title.trim().is_empty() {
        issues.push(LintIssue::new("info.title", "must be a non-empty string"));
    }
    if info.version.trim().is_empty() {
        issues.push(LintIssue::new("info.version", "must be a non-empty string"));
    }
}

fn check_tags_unique(doc: &Swagger, issues: &mut Vec<LintIssue>) {
    let mut seen = HashSet::new();
    for tag in &doc.tags {
        if !seen.insert(tag.name.clone()) {
            issues.push(LintIssue::new(
                "tags",
                format!("duplicate tag name '{}'", tag.name),
            ));
        }
    }
}

fn check_operations(doc: &Swagger, issues: &mut Vec<LintIssue>) {
    let mut operation_ids = HashSet::new();
    for (pattern, item) in &doc.paths.paths {
        check_path_item(pattern, item, &mut operation_ids, issues);
    }
}

fn check_path_item(
    pattern: &str,
    item: &PathItem,
    operation_ids: &mut HashSet<String>,
    issues: &mut Vec<LintIssue>,
) {
    let template_params = template_parameters(pattern);

    for (method, operation) in item.operations() {
        let location = format!("paths.{}.{}", pattern, method);

        if let Some(operation_id) = &operation.operation_id {
            if !operation_ids.insert(operation_id.clone()) {
                issues.push(LintIssue::new(
                    &location,
                    format!("duplicate operationId '{}'", operation_id),
                ));
            }
        }

        check_operation_responses(&location, operation, issues);
        check_operation_parameters(&location, operation, &item.parameters, issues);
        check_template_coverage(&location, operation, &item.parameters, &template_params, issues);
    }
}

fn check_operation_responses(location: &str, operation: &Operation, issues: &mut Vec<LintIssue>) {
    let empty = match &operation.responses {
        None => true,
        Some(responses) => responses.default.is_none() && responses.status_codes.is_empty(),
    };
    if empty {
        issues.push(LintIssue::new(
            location,
            "operation declares no responses",
        ));
    }
}

fn check_operation_parameters(
    location: &str,
    operation: &Operation,
    shared: &[Parameter],
    issues: &mut Vec<LintIssue>,
) {
    let mut body_count = 0usize;
    for parameter in operation.parameters.iter().chain(shared) {
        if parameter.reference.is_some() {
            continue;
        }
        if parameter.location == "body" {
            body_count += 1;
            if parameter.schema.is_none() {
                issues.push(LintIssue::new(
                    location,
                    format!("body parameter '{}' has no schema", parameter.name),
                ));
            }
        }
        if parameter.location == "path" && parameter.required != Some(true) {
            issues.push(LintIssue::new(
                location,
                format!("path parameter '{}' must be required", parameter.name),
            ));
        }
    }
    if body_count > 1 {
        issues.push(LintIssue::new(
            location,
            "operation declares more than one body parameter",
        ));
    }
}

fn check_template_coverage(
    location: &str,
    operation: &Operation,
    shared: &[Parameter],
    template_params: &[String],
    issues: &mut Vec<LintIssue>,
) {
    for wanted in template_params {
        let declared = operation
            .parameters
            .iter()
            .chain(shared)
            .any(|parameter| parameter.location == "path" && &parameter.name == wanted);
        if !declared {
            issues.push(LintIssue::new(
                location,
                format!("path template parameter '{{{}}}' is not declared", wanted),
            ));
        }
    }
}

/// Extracts `{name}` segments from a path template.
fn template_parameters(pattern: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = pattern;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}') else {
            break;
        };
        let name = &rest[open + 1..open + close];
        if !name.is_empty() {
            out.push(name.to_string());
        }
        rest = &rest[open + close + 1..];
    }
    out
}

fn check_security(doc: &Swagger, issues: &mut Vec<LintIssue>) {
    let declared: HashSet<&String> = doc.security_definitions.keys().collect();

    for requirement in &doc.security {
        for scheme in requirement.keys() {
            if !declared.contains(scheme) {
                issues.push(LintIssue::new(
                    "security",
                    format!("requirement references undeclared scheme '{}'", scheme),
                ));
            }
        }
    }

    for (pattern, item) in &doc.paths.paths {
        for (method, operation) in item.operations() {
            for requirement in &operation.security {
                for scheme in requirement.keys() {
                    if !declared.contains(scheme) {
                        issues.push(LintIssue::new(
                            format!("paths.{}.{}.security", pattern, method),
                            format!("requirement references undeclared scheme '{}'", scheme),
                        ));
                    }
                }
            }
        }
    }
}

fn check_refs(doc: &Swagger, issues: &mut Vec<LintIssue>) {
    let report = collect_refs(doc);
    for reference in report.unresolved {
        issues.push(LintIssue::new(
            "$ref",
            format!("reference '{}' does not resolve", reference),
        ));
    }
}

/// A declared `default` must validate against its own schema.
fn check_defaults(doc: &Swagger, issues: &mut Vec<LintIssue>) {
    let validator = Validator::new(doc);
    for (name, schema) in &doc.definitions {
        let Some(default) = &schema.default else {
            continue;
        };
        let outcome = validator.validate(schema, default);
        for finding in outcome.errors {
            issues.push(LintIssue::new(
                format!("definitions.{}.default{}", name, finding.path),
                format!("default value is invalid: {}", finding.message),
            ));
        }
    }
}
