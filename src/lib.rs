#![deny(missing_docs)]

//! # OpenAPI Kit
//!
//! OpenAPI toolkit for a cluster control plane: an in-memory document
//! model for OpenAPI v2 (Swagger) and v3, aggregation of partial
//! documents with conflict renaming, an HTTP serving layer backed by a
//! dependency-tracked cache graph, and a schema validator with
//! expression rules and update-time ratcheting.

/// Shared error types.
pub mod error;

/// OpenAPI v2/v3 document model and serialization.
pub mod model;

/// `$ref` traversal over documents.
pub mod walker;

/// Pruning and merging of documents.
pub mod aggregate;

/// Lazy, pull-based cache graph primitives.
pub mod cache;

/// HTTP serving with negotiation, ETags, and caching.
pub mod serve;

/// Schema validation, expression rules, and ratcheting.
pub mod validate;

pub use aggregate::{filter_by_path_prefixes, merge, merge_specs, MergeMode, PathPrefixTrie};
pub use cache::{CacheError, CacheResult, Merger, Node, Replaceable, Source, StaticSource,
    Transformer, Value};
pub use error::{AppError, AppResult};
pub use model::{
    lint_document, Extensions, LintIssue, OpenApi, Operation, Parameter, PathItem, Paths,
    Response, Responses, Schema, SchemaOrArray, SchemaOrBool, Swagger,
};
pub use serve::{
    compute_etag, IdentityProto, OpenApiService, OpenApiV3Service, ProtoEncoder, MIME_JSON,
    MIME_PB_V2,
};
pub use validate::{
    global_formats, FindingCode, FormatRegistry, SchemaContext, ValidationOutcome, Validator,
};
pub use walker::{collect_refs, collect_refs_v3, walk_refs, walk_refs_v3, RefVisitor, WalkReport};
