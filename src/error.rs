//! # Error Handling
//!
//! Provides the unified `AppError` enum used across the crate.

use derive_more::{Display, From};

/// The Global Error Enum.
///
/// We use `derive_more` for boilerplate.
/// Note: String errors default to `General`.
#[derive(Debug, Display, From)]
pub enum AppError {
    /// Wrapper for standard IO errors.
    #[display("IO Error: {_0}")]
    Io(std::io::Error),

    /// Structurally invalid JSON/YAML input.
    #[from(ignore)]
    #[display("Malformed Document: {_0}")]
    Malformed(String),

    /// Two documents define the same name with different content.
    #[from(ignore)]
    #[display("Merge Conflict: definition '{_0}' differs between documents")]
    MergeConflict(String),

    /// Two documents define the same path pattern.
    #[from(ignore)]
    #[display("Path Conflict: path '{_0}' defined in both documents")]
    PathConflict(String),

    /// A cache builder failed and no prior value exists.
    #[from(ignore)]
    #[display("Cache Build Failure: {_0}")]
    CacheBuild(String),

    /// An expression rule failed to compile.
    #[from(ignore)]
    #[display("Rule Compile Error: {_0}")]
    RuleCompile(String),

    /// Generic errors.
    #[display("General Error: {_0}")]
    General(String),
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for AppError {}

/// Helper type alias for Result using AppError.
pub type AppResult<T> = Result<T, AppError>;
