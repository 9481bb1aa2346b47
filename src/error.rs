//! Pipeline failure taxonomy.
//!
//! Every phase returns one of four kinds. Callers branch on
//! [`PipelineError::kind`] rather than inspecting messages.

use component_manifest_core::error::{ExtractionError, GenerationError, ManifestBuildError};
use component_manifest_core::store::StateStoreError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    ExtractionFailed,
    GenerationFailed,
    ManifestBuildFailed,
    StateStoreFailed,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("extraction failed: {0}")]
    ExtractionFailed(#[from] ExtractionError),

    #[error("generation failed: {0}")]
    GenerationFailed(#[from] GenerationError),

    #[error("manifest build failed: {0}")]
    ManifestBuildFailed(#[from] ManifestBuildError),

    #[error("state store failed: {0}")]
    StateStoreFailed(#[from] StateStoreError),
}

impl PipelineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::ExtractionFailed(_) => FailureKind::ExtractionFailed,
            PipelineError::GenerationFailed(_) => FailureKind::GenerationFailed,
            PipelineError::ManifestBuildFailed(_) => FailureKind::ManifestBuildFailed,
            PipelineError::StateStoreFailed(_) => FailureKind::StateStoreFailed,
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
