//! Generation stage with a deadline.
//!
//! Wraps [`generate_meta`] in `tokio::time::timeout`. A timed-out call is
//! dropped before anything is returned, so the caller never sees partial
//! output and nothing is checkpointed.

use std::time::Duration;

use chrono::Utc;
use component_manifest_core::error::GenerationError;
use component_manifest_core::generation::{generate_meta, CompletionProvider};
use component_manifest_core::models::{ComponentIdentity, ExtractedData, GenerationOutput};
use tracing::{info, warn};

pub async fn generate_with_timeout(
    provider: &dyn CompletionProvider,
    identity: &ComponentIdentity,
    data: &ExtractedData,
    timeout: Duration,
) -> Result<GenerationOutput, GenerationError> {
    let meta = match tokio::time::timeout(timeout, generate_meta(provider, identity, data)).await {
        Ok(result) => result?,
        Err(_) => {
            warn!(component = %identity.name, ?timeout, "generation timed out");
            return Err(GenerationError::Timeout(timeout));
        }
    };

    info!(
        component = %identity.name,
        provider = provider.provider_name(),
        model = provider.model_name(),
        "metadata generated"
    );

    Ok(GenerationOutput {
        meta,
        provider: provider.provider_name().to_string(),
        model: provider.model_name().to_string(),
        source_hash: data.source_hash.clone(),
        generated_at: Utc::now(),
    })
}
