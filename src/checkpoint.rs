//! Typed checkpoints over any [`StateStore`].
//!
//! Each phase's output is wrapped in a [`Checkpoint`] envelope carrying
//! the component name, phase, and save time, and stored as pretty JSON.
//! A value that exists but does not decode is reported as
//! [`StateStoreError::Corrupt`]; a missing value is `Ok(None)`.

use std::sync::Arc;

use chrono::Utc;
use component_manifest_core::extract::ExtractionOutput;
use component_manifest_core::models::{GenerationOutput, Manifest};
use component_manifest_core::store::{state_key, Checkpoint, Phase, StateStore, StateStoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Phases present for one component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PhaseStatus {
    pub component: String,
    pub extraction: bool,
    pub generation: bool,
    pub manifest: bool,
}

#[derive(Clone)]
pub struct CheckpointStore {
    inner: Arc<dyn StateStore>,
}

impl CheckpointStore {
    pub fn new(inner: Arc<dyn StateStore>) -> Self {
        Self { inner }
    }

    pub async fn save_extraction(
        &self,
        name: &str,
        data: &ExtractionOutput,
    ) -> Result<(), StateStoreError> {
        self.save(name, Phase::Extraction, data).await
    }

    pub async fn get_extraction(
        &self,
        name: &str,
    ) -> Result<Option<Checkpoint<ExtractionOutput>>, StateStoreError> {
        self.load(name, Phase::Extraction).await
    }

    pub async fn save_generation(
        &self,
        name: &str,
        data: &GenerationOutput,
    ) -> Result<(), StateStoreError> {
        self.save(name, Phase::Generation, data).await
    }

    pub async fn get_generation(
        &self,
        name: &str,
    ) -> Result<Option<Checkpoint<GenerationOutput>>, StateStoreError> {
        self.load(name, Phase::Generation).await
    }

    pub async fn save_manifest(&self, name: &str, data: &Manifest) -> Result<(), StateStoreError> {
        self.save(name, Phase::Manifest, data).await
    }

    pub async fn get_manifest(
        &self,
        name: &str,
    ) -> Result<Option<Checkpoint<Manifest>>, StateStoreError> {
        self.load(name, Phase::Manifest).await
    }

    pub async fn delete(&self, name: &str) -> Result<(), StateStoreError> {
        self.inner.delete(name).await
    }

    pub async fn list(&self) -> Result<Vec<String>, StateStoreError> {
        self.inner.list().await
    }

    pub async fn status(&self, name: &str) -> Result<PhaseStatus, StateStoreError> {
        let mut status = PhaseStatus {
            component: state_key(name)?,
            ..PhaseStatus::default()
        };
        for phase in Phase::ALL {
            let present = self.inner.get(name, phase).await?.is_some();
            match phase {
                Phase::Extraction => status.extraction = present,
                Phase::Generation => status.generation = present,
                Phase::Manifest => status.manifest = present,
            }
        }
        Ok(status)
    }

    async fn save<T: Serialize>(
        &self,
        name: &str,
        phase: Phase,
        data: &T,
    ) -> Result<(), StateStoreError> {
        let checkpoint = Checkpoint {
            component_name: name.to_string(),
            phase,
            saved_at: Utc::now(),
            data,
        };
        let json =
            serde_json::to_string_pretty(&checkpoint).map_err(|e| StateStoreError::Encode {
                key: name.to_string(),
                phase,
                message: e.to_string(),
            })?;
        self.inner.set(name, phase, &json).await
    }

    async fn load<T: DeserializeOwned>(
        &self,
        name: &str,
        phase: Phase,
    ) -> Result<Option<Checkpoint<T>>, StateStoreError> {
        let Some(text) = self.inner.get(name, phase).await? else {
            return Ok(None);
        };
        let checkpoint: Checkpoint<T> =
            serde_json::from_str(&text).map_err(|e| StateStoreError::Corrupt {
                key: state_key(name).unwrap_or_else(|_| name.to_string()),
                phase,
                message: e.to_string(),
            })?;
        if checkpoint.phase != phase {
            return Err(StateStoreError::Corrupt {
                key: state_key(name)?,
                phase,
                message: format!("envelope records phase {}", checkpoint.phase),
            });
        }
        Ok(Some(checkpoint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use component_manifest_core::extract::{ExtractionInput, HybridExtractor};
    use component_manifest_core::store::memory::InMemoryStateStore;

    fn extraction() -> ExtractionOutput {
        HybridExtractor::default()
            .extract_component(&ExtractionInput {
                name: "Badge".into(),
                source_code: "export interface BadgeProps { tone?: \"info\" | \"warn\" }\nexport function Badge({ tone }: BadgeProps) { return <span /> }".into(),
                framework: "react".into(),
                ..Default::default()
            })
            .unwrap()
    }

    #[tokio::test]
    async fn test_round_trip_and_status() {
        let store = CheckpointStore::new(Arc::new(InMemoryStateStore::new()));
        let data = extraction();
        store.save_extraction("Badge", &data).await.unwrap();

        let loaded = store.get_extraction("Badge").await.unwrap().unwrap();
        assert_eq!(loaded.data, data);
        assert_eq!(loaded.phase, Phase::Extraction);

        let status = store.status("Badge").await.unwrap();
        assert!(status.extraction);
        assert!(!status.generation);
        assert!(!status.manifest);
    }

    #[tokio::test]
    async fn test_undecodable_value_is_corrupt() {
        let inner = Arc::new(InMemoryStateStore::new());
        inner
            .set("Badge", Phase::Extraction, "{ not json")
            .await
            .unwrap();
        let store = CheckpointStore::new(inner);
        assert!(matches!(
            store.get_extraction("Badge").await,
            Err(StateStoreError::Corrupt { .. })
        ));
        assert!(store.get_generation("Badge").await.unwrap().is_none());
    }
}
