//! Checkpoint storage abstraction.
//!
//! The [`StateStore`] trait is a small key-value interface over
//! per-phase pipeline state: one value per `(component, phase)`, each
//! independently overwritable. The pipeline talks only to this trait, so
//! a file-backed store, the in-memory store here, or a database can sit
//! behind it.
//!
//! Keys are normalized to kebab-case, so `AlertDialog` and
//! `alert-dialog` address the same state.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`get`](StateStore::get) | Read one phase; `Ok(None)` when absent |
//! | [`set`](StateStore::set) | Write one phase atomically |
//! | [`delete`](StateStore::delete) | Remove all phases of a component |
//! | [`list`](StateStore::list) | Distinct component keys present |

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::to_kebab_case;

/// The three pipeline phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Extraction,
    Generation,
    Manifest,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Extraction, Phase::Generation, Phase::Manifest];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Extraction => "extraction",
            Phase::Generation => "generation",
            Phase::Manifest => "manifest",
        }
    }

    /// File name suffix used by file-backed stores.
    pub fn file_suffix(&self) -> &'static str {
        match self {
            Phase::Extraction => ".extraction.json",
            Phase::Generation => ".generation.json",
            Phase::Manifest => ".manifest.json",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable snapshot of one phase's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint<T> {
    pub component_name: String,
    pub phase: Phase,
    pub saved_at: DateTime<Utc>,
    pub data: T,
}

#[derive(Debug, thiserror::Error)]
pub enum StateStoreError {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// A value exists but cannot be decoded. Never used for "not found".
    #[error("corrupt {phase} checkpoint for {key}: {message}")]
    Corrupt {
        key: String,
        phase: Phase,
        message: String,
    },

    #[error("failed to encode {phase} checkpoint for {key}: {message}")]
    Encode {
        key: String,
        phase: Phase,
        message: String,
    },

    #[error("invalid component key {0:?}")]
    InvalidKey(String),
}

/// Normalized store key for a component name.
pub fn state_key(component: &str) -> Result<String, StateStoreError> {
    let key = to_kebab_case(component);
    if key.is_empty() {
        return Err(StateStoreError::InvalidKey(component.to_string()));
    }
    Ok(key)
}

/// Key-value persistence of per-phase state.
///
/// Values are UTF-8 JSON documents. Implementations must be `Send + Sync`;
/// concurrent writes to the same `(component, phase)` are not coordinated.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, component: &str, phase: Phase) -> Result<Option<String>, StateStoreError>;

    async fn set(&self, component: &str, phase: Phase, value: &str) -> Result<(), StateStoreError>;

    /// Remove every phase stored for `component`. Absent state is not an error.
    async fn delete(&self, component: &str) -> Result<(), StateStoreError>;

    /// Distinct component keys with at least one phase stored, sorted.
    async fn list(&self) -> Result<Vec<String>, StateStoreError>;
}
