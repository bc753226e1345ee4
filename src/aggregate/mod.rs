#![deny(missing_docs)]

//! # Document Aggregation
//!
//! - **prune**: filter a document by allowed path prefixes plus the
//!   reachable-definition closure.
//! - **merge**: combine two documents, detecting definition conflicts and
//!   renaming on conflict with full `$ref` rewriting.

pub mod merge;
pub mod prune;

pub use merge::{merge, merge_ignore_path_conflicts, merge_specs, MergeMode};
pub use prune::{filter_by_path_prefixes, PathPrefixTrie};
