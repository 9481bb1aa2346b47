//! Pipeline orchestrator.
//!
//! Runs the three phases of one component in strict order:
//!
//! ```text
//!  ExtractionInput ──extract──▶ ExtractionOutput ──generate──▶ GenerationOutput
//!                                     │                              │
//!                                     └────────────build─────────────┘
//!                                                   │
//!                                                   ▼
//!                                                Manifest
//! ```
//!
//! With a [`CheckpointStore`] attached, every successful phase is saved
//! before it is returned, and later invocations may resume from saved
//! phases ([`Pipeline::generate_from_checkpoint`],
//! [`Pipeline::build_from_checkpoints`], [`RunOptions::resume`]). A failed
//! phase writes nothing. Nothing is retried here; retry is the caller's
//! call, typically by re-running `generate_from_checkpoint`.
//!
//! Pipelines for different components may run concurrently. Two in-flight
//! runs for the same component are not coordinated.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use component_manifest_core::error::{GenerationError, ManifestBuildError};
use component_manifest_core::extract::{ExtractionInput, ExtractionOutput, HybridExtractor};
use component_manifest_core::generation::CompletionProvider;
use component_manifest_core::identity::source_hash;
use component_manifest_core::manifest::{build_manifest, BuildInput};
use component_manifest_core::models::{GenerationOutput, Manifest};
use tracing::{debug, info};
use uuid::Uuid;

use crate::checkpoint::{CheckpointStore, PhaseStatus};
use crate::config::Config;
use crate::error::PipelineResult;
use crate::generate::generate_with_timeout;
use crate::state_fs::FileStateStore;

/// Options for [`Pipeline::run`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Names the manifest may reference in `relatedComponents`.
    pub available_components: Option<Vec<String>>,
    /// Reuse extraction and generation checkpoints whose source hash
    /// matches the current input.
    pub resume: bool,
}

enum Resume {
    Reuse(ExtractionOutput),
    KeepIdentity(Uuid),
    Fresh,
}

pub struct Pipeline {
    extractor: HybridExtractor,
    provider: Arc<dyn CompletionProvider>,
    timeout: Duration,
    checkpoints: Option<CheckpointStore>,
}

impl Pipeline {
    pub fn new(
        extractor: HybridExtractor,
        provider: Arc<dyn CompletionProvider>,
        timeout: Duration,
    ) -> Self {
        Self {
            extractor,
            provider,
            timeout,
            checkpoints: None,
        }
    }

    pub fn with_checkpoints(mut self, store: CheckpointStore) -> Self {
        self.checkpoints = Some(store);
        self
    }

    /// Pipeline wired from config with a file-backed checkpoint store.
    pub fn from_config(config: &Config, provider: Arc<dyn CompletionProvider>) -> Self {
        let store = FileStateStore::from_config(config);
        Self::new(
            config.extractor(),
            provider,
            Duration::from_secs(config.generation.timeout_secs),
        )
        .with_checkpoints(CheckpointStore::new(Arc::new(store)))
    }

    pub fn checkpoints(&self) -> Option<&CheckpointStore> {
        self.checkpoints.as_ref()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Phases
    // ═══════════════════════════════════════════════════════════════════

    pub async fn extract(&self, input: &ExtractionInput) -> PipelineResult<ExtractionOutput> {
        let output = self.extractor.extract_component(input)?;
        if let Some(store) = &self.checkpoints {
            store.save_extraction(&output.identity.name, &output).await?;
        }
        info!(
            component = %output.identity.name,
            props = output.data.props.len(),
            method = output.data.extraction.method.as_str(),
            "extracted"
        );
        Ok(output)
    }

    pub async fn generate(&self, extraction: &ExtractionOutput) -> PipelineResult<GenerationOutput> {
        let output = generate_with_timeout(
            self.provider.as_ref(),
            &extraction.identity,
            &extraction.data,
            self.timeout,
        )
        .await?;
        if let Some(store) = &self.checkpoints {
            store
                .save_generation(&extraction.identity.name, &output)
                .await?;
        }
        Ok(output)
    }

    /// Generate from the saved extraction of `name`.
    pub async fn generate_from_checkpoint(&self, name: &str) -> PipelineResult<GenerationOutput> {
        let extraction = self.saved_extraction(name).await?.ok_or_else(|| {
            GenerationError::MissingExtraction(name.to_string())
        })?;
        self.generate(&extraction).await
    }

    pub async fn build(
        &self,
        extraction: &ExtractionOutput,
        generation: &GenerationOutput,
        available_components: Option<&[String]>,
    ) -> PipelineResult<Manifest> {
        if generation.source_hash != extraction.data.source_hash {
            return Err(ManifestBuildError::Inconsistent(format!(
                "metadata for {} was generated from a different source",
                extraction.identity.name
            ))
            .into());
        }

        let manifest = build_manifest(&BuildInput {
            identity: &extraction.identity,
            extracted: &extraction.data,
            meta: &generation.meta,
            source_hash: &extraction.data.source_hash,
            available_components,
            provider: &generation.provider,
            model: &generation.model,
            built_at: Utc::now(),
        })?;

        if let Some(store) = &self.checkpoints {
            store
                .save_manifest(&extraction.identity.name, &manifest)
                .await?;
        }
        info!(component = %manifest.component_name, "manifest built");
        Ok(manifest)
    }

    /// Build from the saved extraction and generation of `name`.
    pub async fn build_from_checkpoints(
        &self,
        name: &str,
        available_components: Option<&[String]>,
    ) -> PipelineResult<Manifest> {
        let extraction = self.saved_extraction(name).await?.ok_or_else(|| {
            ManifestBuildError::MissingInput(format!("extraction checkpoint for {}", name))
        })?;
        let generation = self.saved_generation(name).await?.ok_or_else(|| {
            ManifestBuildError::MissingInput(format!("generation checkpoint for {}", name))
        })?;
        self.build(&extraction, &generation, available_components)
            .await
    }

    /// Extract → Generate → Build.
    ///
    /// With `resume`, a saved extraction of the same source is reused, and a
    /// stale one still lends its identity so the component keeps its id.
    pub async fn run(&self, input: &ExtractionInput, options: &RunOptions) -> PipelineResult<Manifest> {
        let extraction = match self.resumable_extraction(input, options).await? {
            Resume::Reuse(saved) => saved,
            Resume::KeepIdentity(id) => {
                let mut input = input.clone();
                input.existing_id = Some(id);
                self.extract(&input).await?
            }
            Resume::Fresh => self.extract(input).await?,
        };

        let generation = match self.resumable_generation(&extraction, options).await? {
            Some(saved) => saved,
            None => self.generate(&extraction).await?,
        };

        self.build(
            &extraction,
            &generation,
            options.available_components.as_deref(),
        )
        .await
    }

    pub async fn status(&self, name: &str) -> PipelineResult<PhaseStatus> {
        match &self.checkpoints {
            Some(store) => Ok(store.status(name).await?),
            None => Ok(PhaseStatus {
                component: name.to_string(),
                ..PhaseStatus::default()
            }),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Checkpoint reads
    // ═══════════════════════════════════════════════════════════════════

    async fn saved_extraction(&self, name: &str) -> PipelineResult<Option<ExtractionOutput>> {
        match &self.checkpoints {
            Some(store) => Ok(store.get_extraction(name).await?.map(|c| c.data)),
            None => Ok(None),
        }
    }

    async fn saved_generation(&self, name: &str) -> PipelineResult<Option<GenerationOutput>> {
        match &self.checkpoints {
            Some(store) => Ok(store.get_generation(name).await?.map(|c| c.data)),
            None => Ok(None),
        }
    }

    async fn resumable_extraction(
        &self,
        input: &ExtractionInput,
        options: &RunOptions,
    ) -> PipelineResult<Resume> {
        if !options.resume {
            return Ok(Resume::Fresh);
        }
        let Some(saved) = self.saved_extraction(input.name.trim()).await? else {
            return Ok(Resume::Fresh);
        };
        if input.existing_id.is_some_and(|id| id != saved.identity.id) {
            return Ok(Resume::Fresh);
        }

        let hash = source_hash(&input.source_code, input.stories_code.as_deref());
        if saved.data.source_hash == hash {
            debug!(component = %input.name, "reusing extraction checkpoint");
            Ok(Resume::Reuse(saved))
        } else {
            debug!(component = %input.name, "source changed, re-extracting");
            Ok(Resume::KeepIdentity(saved.identity.id))
        }
    }

    async fn resumable_generation(
        &self,
        extraction: &ExtractionOutput,
        options: &RunOptions,
    ) -> PipelineResult<Option<GenerationOutput>> {
        if !options.resume {
            return Ok(None);
        }
        let saved = self
            .saved_generation(&extraction.identity.name)
            .await?
            .filter(|saved| saved.source_hash == extraction.data.source_hash);
        if saved.is_some() {
            debug!(component = %extraction.identity.name, "reusing generation checkpoint");
        }
        Ok(saved)
    }
}
