#![deny(missing_docs)]

//! # OpenAPI Document Model
//!
//! - **extensions**: vendor-extension (`x-`) capture and round-tripping.
//! - **schema**: the recursive schema object with polymorphic fields.
//! - **v2**: Swagger 2.0 documents.
//! - **v3**: OpenAPI v3 documents.
//! - **lint**: structural checks over a parsed document.

pub mod extensions;
pub mod lint;
pub mod schema;
pub mod v2;
pub mod v3;

pub use extensions::Extensions;
pub use lint::{lint_document, LintIssue};
pub use schema::{
    component_name, definition_name, Schema, SchemaOrArray, SchemaOrBool, StringOrStrings,
    COMPONENTS_SCHEMAS_REF_PREFIX, DEFINITIONS_REF_PREFIX,
};
pub use v2::{
    Contact, ExternalDocs, Info, License, Operation, Parameter, PathItem, Paths, Response,
    Responses, SecurityScheme, Swagger, Tag,
};
pub use v3::{Components, OpenApi, SecuritySchemeV3, Server, ServerVariable};
