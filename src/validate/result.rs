#![deny(missing_docs)]

//! # Validation Results
//!
//! Findings carry a JSON-Pointer-like path, a code, and a message.
//! Outcomes are immutable-with-merge: subtree results are built
//! independently and folded together, which keeps parallel subtree
//! validation possible.

use serde::Serialize;
use std::fmt;

/// One step of a value path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Segment {
    /// An object property name.
    Key(String),
    /// A list index.
    Index(usize),
}

/// Renders segments as a dotted path, e.g. `.spec.containers[2].name`.
pub fn path_string(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Key(key) => {
                out.push('.');
                out.push_str(key);
            }
            Segment::Index(index) => {
                out.push('[');
                out.push_str(&index.to_string());
                out.push(']');
            }
        }
    }
    out
}

/// Classifies a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FindingCode {
    /// Value's dynamic type matches no declared schema type.
    TypeMismatch,
    /// A required property is absent.
    Required,
    /// Numeric value below `minimum`.
    Minimum,
    /// Numeric value above `maximum`.
    Maximum,
    /// Value is not an integer multiple of `multipleOf`.
    MultipleOf,
    /// String shorter than `minLength`.
    MinLength,
    /// String longer than `maxLength`.
    MaxLength,
    /// String fails the `pattern` regex.
    Pattern,
    /// The `pattern` regex itself failed to compile.
    PatternInvalid,
    /// String fails its registered format predicate.
    Format,
    /// Value not among the admitted `enum` literals.
    Enum,
    /// Array shorter than `minItems`.
    MinItems,
    /// Array longer than `maxItems`.
    MaxItems,
    /// Array elements are not pairwise distinct.
    UniqueItems,
    /// Surplus array element rejected by `additionalItems: false`.
    AdditionalItems,
    /// Fewer properties than `minProperties`.
    MinProperties,
    /// More properties than `maxProperties`.
    MaxProperties,
    /// Extra property rejected by `additionalProperties: false`.
    AdditionalProperties,
    /// An `allOf` subschema failed.
    AllOf,
    /// No `anyOf` subschema passed.
    AnyOf,
    /// Not exactly one `oneOf` subschema passed.
    OneOf,
    /// The `not` subschema passed.
    Not,
    /// A local `$ref` did not resolve.
    RefUnresolved,
    /// An expression rule evaluated to false or failed to evaluate.
    Rule,
}

impl FindingCode {
    /// True for composition-operator findings, which are never ratcheted.
    pub fn is_composition(self) -> bool {
        matches!(
            self,
            FindingCode::AllOf | FindingCode::AnyOf | FindingCode::OneOf | FindingCode::Not
        )
    }
}

/// A single error or warning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    /// Dotted path to the offending value.
    pub path: String,
    /// Structured path, used for old/new correlation.
    pub segments: Vec<Segment>,
    /// Finding class.
    pub code: FindingCode,
    /// Human-readable message.
    pub message: String,
}

impl Finding {
    /// Builds a finding at `segments`.
    pub fn new(segments: &[Segment], code: FindingCode, message: impl Into<String>) -> Self {
        Finding {
            path: path_string(segments),
            segments: segments.to_vec(),
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Errors and warnings accumulated over one validation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationOutcome {
    /// Hard violations.
    pub errors: Vec<Finding>,
    /// Downgraded or advisory findings.
    pub warnings: Vec<Finding>,
    /// Messages from expression rules that failed to compile.
    pub rule_compile_errors: Vec<String>,
}

impl ValidationOutcome {
    /// An empty outcome.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no errors were recorded.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Records an error finding.
    pub fn error(&mut self, segments: &[Segment], code: FindingCode, message: impl Into<String>) {
        self.errors.push(Finding::new(segments, code, message));
    }

    /// Records a warning finding.
    pub fn warning(&mut self, segments: &[Segment], code: FindingCode, message: impl Into<String>) {
        self.warnings.push(Finding::new(segments, code, message));
    }

    /// Folds `other` into `self` and returns the union.
    pub fn merge(mut self, other: ValidationOutcome) -> Self {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.rule_compile_errors.extend(other.rule_compile_errors);
        self
    }
}
