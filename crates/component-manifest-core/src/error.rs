//! Typed failures for each pipeline phase.
//!
//! Every phase either fully succeeds or returns one of these. Falling back
//! from the primary analyzer to the AST analyzer is not an error and has no
//! variant here.

use std::time::Duration;

/// The source could not be turned into [`ExtractedData`](crate::models::ExtractedData).
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// The AST analyzer could not parse the source.
    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    /// Parsing succeeded but a fact the pipeline depends on is missing.
    #[error("structural facts unobtainable for {component}: {reason}")]
    Unobtainable { component: String, reason: String },

    /// Caller input was unusable (empty name, empty source).
    #[error("invalid extraction input: {0}")]
    InvalidInput(String),
}

/// The generation stage produced no usable [`GeneratedMeta`](crate::models::GeneratedMeta).
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The completion provider returned an error.
    #[error("provider {provider} failed: {message}")]
    Provider { provider: String, message: String },

    /// The provider did not answer within the configured timeout.
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    /// The model answered but the payload is missing or malformed.
    #[error("invalid model output: {0}")]
    InvalidOutput(String),

    /// No extraction output exists to generate from.
    #[error("no extraction output available for {0}")]
    MissingExtraction(String),
}

/// Inputs to manifest assembly were absent or inconsistent.
#[derive(Debug, thiserror::Error)]
pub enum ManifestBuildError {
    #[error("missing required input: {0}")]
    MissingInput(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("inconsistent inputs: {0}")]
    Inconsistent(String),
}
