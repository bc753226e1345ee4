#![deny(missing_docs)]

//! # Reference Walker
//!
//! Traverses every `$ref` site in a Swagger document and invokes a
//! callback on each one. The callback may rewrite the reference by
//! returning a replacement string.
//!
//! One mutating primitive serves both historical variants: the read-only
//! walk is the same traversal with an observational callback that never
//! returns a replacement.
//!
//! Local `#/definitions/<name>` references are chased depth-first into
//! the definition exactly once (a visited set breaks cycles) before the
//! callback sees the reference itself. Anything else (external refs,
//! `#/parameters/...`, `#/responses/...`) reaches the callback without
//! being traversed. Unresolvable local references are collected and
//! reported; traversal continues.

use crate::model::schema::{
    component_name, definition_name, Schema, SchemaOrArray, SchemaOrBool,
    COMPONENTS_SCHEMAS_REF_PREFIX, DEFINITIONS_REF_PREFIX,
};
use crate::model::v2::{Operation, Parameter, PathItem, Response, Swagger};
use crate::model::v3::OpenApi;
use indexmap::IndexMap;
use std::collections::HashSet;

/// Callback invoked on each visited reference.
pub trait RefVisitor {
    /// Returns `Some(replacement)` to rewrite the reference, `None` to keep it.
    fn visit(&mut self, reference: &str) -> Option<String>;
}

impl<F: FnMut(&str) -> Option<String>> RefVisitor for F {
    fn visit(&mut self, reference: &str) -> Option<String> {
        self(reference)
    }
}

/// Outcome of a walk: every reference seen, plus unresolved local ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalkReport {
    /// Every reference string passed to the callback, in visit order.
    pub refs: Vec<String>,
    /// Local definition references with no matching definition entry.
    pub unresolved: Vec<String>,
}

/// Walks every `$ref` in `doc`, applying `visitor` to each.
///
/// Container maps are written back even when only nested values change.
pub fn walk_refs(doc: &mut Swagger, visitor: &mut dyn RefVisitor) -> WalkReport {
    let mut walker = Walker::v2(visitor);
    walker.walk_document(doc, true);
    walker.report
}

/// Walks every `$ref` in a v3 document: component schemas, responses,
/// parameters, and every path item. Local refs are chased through
/// `#/components/schemas/`.
pub fn walk_refs_v3(doc: &mut OpenApi, visitor: &mut dyn RefVisitor) -> WalkReport {
    let mut walker = Walker::v3(visitor);
    walker.walk_v3_document(doc);
    walker.report
}

/// Walks only the references reachable from paths, root parameters, and
/// root responses; definitions are visited solely through ref chasing.
/// Used by pruning to compute the reachable-definition closure.
pub(crate) fn walk_reachable_refs(doc: &mut Swagger, visitor: &mut dyn RefVisitor) -> WalkReport {
    let mut walker = Walker::v2(visitor);
    walker.walk_document(doc, false);
    walker.report
}

/// Records every reference in `doc` without modifying it.
pub fn collect_refs(doc: &Swagger) -> WalkReport {
    let mut clone = doc.clone();
    walk_refs(&mut clone, &mut |_: &str| -> Option<String> { None })
}

/// Records every reference in a v3 document without modifying it.
pub fn collect_refs_v3(doc: &OpenApi) -> WalkReport {
    let mut clone = doc.clone();
    walk_refs_v3(&mut clone, &mut |_: &str| -> Option<String> { None })
}

fn component_schema_name(reference: &str) -> Option<&str> {
    match component_name(reference) {
        Some(("schemas", name)) => Some(name),
        _ => None,
    }
}

struct Walker<'a> {
    visitor: &'a mut dyn RefVisitor,
    visited: HashSet<String>,
    report: WalkReport,
    local_name: fn(&str) -> Option<&str>,
    ref_prefix: &'static str,
}

impl<'a> Walker<'a> {
    fn v2(visitor: &'a mut dyn RefVisitor) -> Self {
        Walker {
            visitor,
            visited: HashSet::new(),
            report: WalkReport::default(),
            local_name: definition_name,
            ref_prefix: DEFINITIONS_REF_PREFIX,
        }
    }

    fn v3(visitor: &'a mut dyn RefVisitor) -> Self {
        Walker {
            visitor,
            visited: HashSet::new(),
            report: WalkReport::default(),
            local_name: component_schema_name,
            ref_prefix: COMPONENTS_SCHEMAS_REF_PREFIX,
        }
    }

    fn walk_v3_document(&mut self, doc: &mut OpenApi) {
        let OpenApi {
            paths, components, ..
        } = doc;

        let mut no_components_schemas = IndexMap::new();
        match components {
            Some(components) => {
                let schemas = &mut components.schemas;
                for item in paths.paths.values_mut() {
                    self.walk_path_item(item, schemas);
                }
                for parameter in components.parameters.values_mut() {
                    self.walk_parameter(parameter, schemas);
                }
                for response in components.responses.values_mut() {
                    self.walk_response(response, schemas);
                }
                let names: Vec<String> = schemas.keys().cloned().collect();
                for name in names {
                    let key = format!("{}{}", self.ref_prefix, name);
                    if self.visited.insert(key) {
                        self.walk_definition(&name, schemas);
                    }
                }
            }
            None => {
                for item in paths.paths.values_mut() {
                    self.walk_path_item(item, &mut no_components_schemas);
                }
            }
        }
    }

    fn walk_document(&mut self, doc: &mut Swagger, sweep_definitions: bool) {
        let Swagger {
            paths,
            definitions,
            parameters,
            responses,
            ..
        } = doc;

        for item in paths.paths.values_mut() {
            self.walk_path_item(item, definitions);
        }

        for parameter in parameters.values_mut() {
            self.walk_parameter(parameter, definitions);
        }

        for response in responses.values_mut() {
            self.walk_response(response, definitions);
        }

        if !sweep_definitions {
            return;
        }

        // Definitions not reached through any path are still visited.
        let names: Vec<String> = definitions.keys().cloned().collect();
        for name in names {
            let key = format!("{}{}", self.ref_prefix, name);
            if self.visited.insert(key) {
                self.walk_definition(&name, definitions);
            }
        }
    }

    fn walk_path_item(&mut self, item: &mut PathItem, defs: &mut IndexMap<String, Schema>) {
        if let Some(reference) = item.reference.take() {
            item.reference = Some(self.apply(reference));
        }
        for parameter in &mut item.parameters {
            self.walk_parameter(parameter, defs);
        }
        for operation in item.operations_mut() {
            self.walk_operation(operation, defs);
        }
    }

    fn walk_operation(&mut self, operation: &mut Operation, defs: &mut IndexMap<String, Schema>) {
        for parameter in &mut operation.parameters {
            self.walk_parameter(parameter, defs);
        }
        if let Some(responses) = &mut operation.responses {
            if let Some(default) = &mut responses.default {
                self.walk_response(default, defs);
            }
            for response in responses.status_codes.values_mut() {
                self.walk_response(response, defs);
            }
        }
    }

    fn walk_parameter(&mut self, parameter: &mut Parameter, defs: &mut IndexMap<String, Schema>) {
        if let Some(reference) = parameter.reference.take() {
            parameter.reference = Some(self.apply(reference));
        }
        if let Some(schema) = &mut parameter.schema {
            self.walk_schema(schema, defs);
        }
        if let Some(items) = &mut parameter.items {
            self.walk_schema(items, defs);
        }
    }

    fn walk_response(&mut self, response: &mut Response, defs: &mut IndexMap<String, Schema>) {
        if let Some(reference) = response.reference.take() {
            response.reference = Some(self.apply(reference));
        }
        if let Some(schema) = &mut response.schema {
            self.walk_schema(schema, defs);
        }
        for header in response.headers.values_mut() {
            self.walk_schema(header, defs);
        }
    }

    fn walk_schema(&mut self, schema: &mut Schema, defs: &mut IndexMap<String, Schema>) {
        if let Some(reference) = schema.reference.take() {
            self.chase(&reference, defs);
            schema.reference = Some(self.apply(reference));
        }

        for sub in &mut schema.all_of {
            self.walk_schema(sub, defs);
        }
        for sub in &mut schema.any_of {
            self.walk_schema(sub, defs);
        }
        for sub in &mut schema.one_of {
            self.walk_schema(sub, defs);
        }
        if let Some(not) = &mut schema.not {
            self.walk_schema(not, defs);
        }

        match &mut schema.items {
            Some(SchemaOrArray::Single(item)) => self.walk_schema(item, defs),
            Some(SchemaOrArray::Multiple(items)) => {
                for item in items {
                    self.walk_schema(item, defs);
                }
            }
            None => {}
        }
        if let Some(SchemaOrBool::Schema(extra)) = &mut schema.additional_items {
            self.walk_schema(extra, defs);
        }

        for property in schema.properties.values_mut() {
            self.walk_schema(property, defs);
        }
        for property in schema.pattern_properties.values_mut() {
            self.walk_schema(property, defs);
        }
        if let Some(SchemaOrBool::Schema(extra)) = &mut schema.additional_properties {
            self.walk_schema(extra, defs);
        }
    }

    /// Chases a local definition reference depth-first, at most once.
    fn chase(&mut self, reference: &str, defs: &mut IndexMap<String, Schema>) {
        let Some(name) = (self.local_name)(reference) else {
            return;
        };
        if !self.visited.insert(reference.to_string()) {
            return;
        }
        let name = name.to_string();
        if defs.contains_key(&name) {
            self.walk_definition(&name, defs);
        } else {
            self.report.unresolved.push(reference.to_string());
        }
    }

    /// Walks one definition by temporarily taking it out of the map, so
    /// nested chases can borrow the map. The visited set prevents
    /// re-entry into the placeholder.
    fn walk_definition(&mut self, name: &str, defs: &mut IndexMap<String, Schema>) {
        let Some(slot) = defs.get_mut(name) else {
            return;
        };
        let mut taken = std::mem::take(slot);
        self.walk_schema(&mut taken, defs);
        if let Some(slot) = defs.get_mut(name) {
            *slot = taken;
        }
    }

    fn apply(&mut self, reference: String) -> String {
        self.report.refs.push(reference.clone());
        match self.visitor.visit(&reference) {
            Some(replacement) => replacement,
            None => reference,
        }
    }
}
