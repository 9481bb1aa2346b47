//! In-memory [`StateStore`] for tests and embedding.
//!
//! Uses a `HashMap` behind `std::sync::RwLock`.

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use super::{state_key, Phase, StateStore, StateStoreError};

#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    entries: RwLock<HashMap<(String, Phase), String>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> StateStoreError {
        StateStoreError::Io {
            context: "in-memory state lock poisoned".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "poisoned lock"),
        }
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get(&self, component: &str, phase: Phase) -> Result<Option<String>, StateStoreError> {
        let key = state_key(component)?;
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        Ok(entries.get(&(key, phase)).cloned())
    }

    async fn set(&self, component: &str, phase: Phase, value: &str) -> Result<(), StateStoreError> {
        let key = state_key(component)?;
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        entries.insert((key, phase), value.to_string());
        Ok(())
    }

    async fn delete(&self, component: &str) -> Result<(), StateStoreError> {
        let key = state_key(component)?;
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        entries.retain(|(k, _), _| k != &key);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, StateStoreError> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        let keys: BTreeSet<&String> = entries.keys().map(|(k, _)| k).collect();
        Ok(keys.into_iter().cloned().collect())
    }
}
