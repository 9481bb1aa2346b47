//! File-backed [`StateStore`].
//!
//! One UTF-8 JSON file per `(component, phase)` under a root directory:
//!
//! ```text
//! .ce-state/
//!   alert-dialog.extraction.json
//!   alert-dialog.generation.json
//!   alert-dialog.manifest.json
//!   button.extraction.json
//! ```
//!
//! Writes go to a temp file in the same directory, are fsynced, then
//! renamed over the target, and the directory is fsynced. A reader sees
//! either the previous file or the new one, never a partial write.

use std::collections::BTreeSet;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use component_manifest_core::store::{state_key, Phase, StateStore, StateStoreError};
use tracing::debug;

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct FileStateStore {
    root: PathBuf,
}

impl FileStateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted at [`Config::state_dir`].
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.state_dir())
    }

    pub fn path_for(&self, component: &str, phase: Phase) -> Result<PathBuf, StateStoreError> {
        let key = state_key(component)?;
        Ok(self.root.join(format!("{}{}", key, phase.file_suffix())))
    }
}

fn io_err(context: impl Into<String>, source: std::io::Error) -> StateStoreError {
    StateStoreError::Io {
        context: context.into(),
        source,
    }
}

/// Write `data` to `path` via temp file, fsync, and rename.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<(), StateStoreError> {
    let parent = path.parent().ok_or_else(|| {
        io_err(
            format!("resolve parent of {}", path.display()),
            std::io::Error::new(ErrorKind::InvalidInput, "path has no parent"),
        )
    })?;
    std::fs::create_dir_all(parent)
        .map_err(|e| io_err(format!("create {}", parent.display()), e))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".tmp-")
        .tempfile_in(parent)
        .map_err(|e| io_err("create temp file", e))?;
    tmp.write_all(data)
        .map_err(|e| io_err("write temp file", e))?;
    tmp.flush().map_err(|e| io_err("flush temp file", e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| io_err("fsync temp file", e))?;
    tmp.persist(path)
        .map_err(|e| io_err(format!("rename to {}", path.display()), e.error))?;

    fsync_dir(parent)
}

#[cfg(unix)]
fn fsync_dir(dir: &Path) -> Result<(), StateStoreError> {
    std::fs::File::open(dir)
        .and_then(|f| f.sync_all())
        .map_err(|e| io_err(format!("fsync {}", dir.display()), e))
}

#[cfg(not(unix))]
fn fsync_dir(_dir: &Path) -> Result<(), StateStoreError> {
    Ok(())
}

/// Component key of a checkpoint file name, if it is one.
fn key_of(file_name: &str) -> Option<&str> {
    if file_name.starts_with('.') {
        return None;
    }
    Phase::ALL
        .iter()
        .find_map(|p| file_name.strip_suffix(p.file_suffix()))
        .filter(|k| !k.is_empty())
}

/// Run blocking filesystem work off the async worker threads.
async fn blocking<T, F>(work: F) -> Result<T, StateStoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StateStoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| {
        io_err(
            "state store task panicked",
            std::io::Error::new(ErrorKind::Other, e),
        )
    })?
}

fn read_checkpoint(
    path: &Path,
    component: &str,
    phase: Phase,
) -> Result<Option<String>, StateStoreError> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            debug!(path = %path.display(), "checkpoint read");
            Ok(Some(text))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) if e.kind() == ErrorKind::InvalidData => Err(StateStoreError::Corrupt {
            key: state_key(component)?,
            phase,
            message: "file is not valid UTF-8".to_string(),
        }),
        Err(e) => Err(io_err(format!("read {}", path.display()), e)),
    }
}

fn remove_checkpoints(paths: &[PathBuf]) -> Result<(), StateStoreError> {
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), "checkpoint removed"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(io_err(format!("remove {}", path.display()), e)),
        }
    }
    Ok(())
}

fn list_keys(root: &Path) -> Result<Vec<String>, StateStoreError> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_err(format!("list {}", root.display()), e)),
    };

    let mut keys = BTreeSet::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_err(format!("list {}", root.display()), e))?;
        let name = entry.file_name();
        if let Some(key) = name.to_str().and_then(key_of) {
            keys.insert(key.to_string());
        }
    }
    Ok(keys.into_iter().collect())
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get(&self, component: &str, phase: Phase) -> Result<Option<String>, StateStoreError> {
        let path = self.path_for(component, phase)?;
        let component = component.to_string();
        blocking(move || read_checkpoint(&path, &component, phase)).await
    }

    async fn set(&self, component: &str, phase: Phase, value: &str) -> Result<(), StateStoreError> {
        let path = self.path_for(component, phase)?;
        let value = value.to_string();
        blocking(move || {
            atomic_write(&path, value.as_bytes())?;
            debug!(path = %path.display(), bytes = value.len(), "checkpoint written");
            Ok(())
        })
        .await
    }

    async fn delete(&self, component: &str) -> Result<(), StateStoreError> {
        let paths = Phase::ALL
            .iter()
            .map(|phase| self.path_for(component, *phase))
            .collect::<Result<Vec<_>, _>>()?;
        blocking(move || remove_checkpoints(&paths)).await
    }

    async fn list(&self) -> Result<Vec<String>, StateStoreError> {
        let root = self.root.clone();
        blocking(move || list_keys(&root)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_layout_uses_kebab_keys() {
        let tmp = TempDir::new().unwrap();
        let store = FileStateStore::new(tmp.path());
        store
            .set("AlertDialog", Phase::Generation, "{\"a\":1}")
            .await
            .unwrap();
        let expected = tmp.path().join("alert-dialog.generation.json");
        assert_eq!(std::fs::read_to_string(expected).unwrap(), "{\"a\":1}");
    }

    #[tokio::test]
    async fn test_missing_file_is_absent_not_error() {
        let tmp = TempDir::new().unwrap();
        let store = FileStateStore::new(tmp.path().join("not-created-yet"));
        assert!(store.get("Button", Phase::Manifest).await.unwrap().is_none());
        assert!(store.list().await.unwrap().is_empty());
        store.delete("Button").await.unwrap();
    }

    #[tokio::test]
    async fn test_overwrite_leaves_no_temp_files() {
        let tmp = TempDir::new().unwrap();
        let store = FileStateStore::new(tmp.path());
        store.set("Button", Phase::Extraction, "one").await.unwrap();
        store.set("Button", Phase::Extraction, "two").await.unwrap();
        assert_eq!(
            store.get("Button", Phase::Extraction).await.unwrap().as_deref(),
            Some("two")
        );
        let names: Vec<String> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["button.extraction.json"]);
    }

    #[tokio::test]
    async fn test_list_ignores_foreign_and_temp_files() {
        let tmp = TempDir::new().unwrap();
        let store = FileStateStore::new(tmp.path());
        store.set("Card", Phase::Manifest, "{}").await.unwrap();
        store.set("Button", Phase::Extraction, "{}").await.unwrap();
        store.set("Button", Phase::Generation, "{}").await.unwrap();
        std::fs::write(tmp.path().join(".tmp-abc123"), "x").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "x").unwrap();

        assert_eq!(store.list().await.unwrap(), vec!["button", "card"]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let store = FileStateStore::new(tmp.path());
        std::fs::write(tmp.path().join("button.extraction.json"), [0xff, 0xfe, 0x00]).unwrap();
        assert!(matches!(
            store.get("Button", Phase::Extraction).await,
            Err(StateStoreError::Corrupt { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_writes_from_spawned_tasks() {
        let tmp = TempDir::new().unwrap();
        let store = FileStateStore::new(tmp.path());
        let handles: Vec<_> = ["Alert", "Badge", "Card", "Dialog"]
            .into_iter()
            .map(|name| {
                let store = store.clone();
                tokio::spawn(async move { store.set(name, Phase::Manifest, name).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(
            store.list().await.unwrap(),
            vec!["alert", "badge", "card", "dialog"]
        );
        assert_eq!(
            store.get("Dialog", Phase::Manifest).await.unwrap().as_deref(),
            Some("Dialog")
        );
        store.delete("Dialog").await.unwrap();
        assert!(store.get("Dialog", Phase::Manifest).await.unwrap().is_none());
    }
}
