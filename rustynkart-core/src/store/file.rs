//! File-backed credential storage.
//!
//! Credentials are kept in a small JSON document:
//!
//! ```json
//! {
//!   "version": 1,
//!   "entries": {
//!     "authToken": { "value": "...", "saved_at": "2026-01-01T00:00:00Z" }
//!   }
//! }
//! ```
//!
//! The file is re-read on every lookup so that another process sharing the
//! same profile (a second CLI invocation, for example) is observed. Writes go
//! through a temporary file and a rename, so readers never see a partial
//! document. A file that no longer parses reads as an error, and the next
//! write or delete replaces it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{SecretStore, StoreError};
use crate::model::Credential;

/// File name used inside the data directory.
pub(crate) const STORE_FILE: &str = "session.json";

const STORE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct FileStoreData {
    /// Version of the store format (for future migrations).
    version: u32,

    entries: BTreeMap<String, StoredEntry>,
}

impl Default for FileStoreData {
    fn default() -> Self {
        Self {
            version: STORE_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    value: String,
    saved_at: DateTime<Utc>,
}

/// JSON-file credential store.
///
/// File I/O runs on the blocking thread pool.
pub struct FileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Arc<Mutex<()>>,
}

impl FileStore {
    /// Open a file store at `path`.
    ///
    /// Creates parent directories; the file itself is created on first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let parent = path.parent().ok_or(StoreError::DataDirUnavailable)?;
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }

        Ok(Self {
            path,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When the entry under `key` was last written, if present.
    pub fn saved_at(&self, key: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(load(&self.path)?.entries.get(key).map(|e| e.saved_at))
    }

    async fn run_blocking<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Path, &Mutex<()>) -> Result<T, StoreError> + Send + 'static,
    {
        let path = self.path.clone();
        let lock = Arc::clone(&self.write_lock);

        tokio::task::spawn_blocking(move || op(&path, &lock))
            .await
            .map_err(|e| StoreError::BackendError {
                message: format!("file store task failed: {}", e),
            })?
    }
}

fn load(path: &Path) -> Result<FileStoreData, StoreError> {
    if !path.exists() {
        return Ok(FileStoreData::default());
    }

    let contents = fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(FileStoreData::default());
    }
    Ok(serde_json::from_str(&contents)?)
}

/// Load the document for a write. An unparseable file is replaced by an
/// empty document; the flag reports whether that happened.
fn load_for_update(path: &Path) -> Result<(FileStoreData, bool), StoreError> {
    match load(path) {
        Ok(data) => Ok((data, false)),
        Err(StoreError::SerializationError(e)) => {
            tracing::warn!(path = ?path, "Store file is corrupt, resetting it: {}", e);
            Ok((FileStoreData::default(), true))
        }
        Err(e) => Err(e),
    }
}

fn persist(path: &Path, data: &FileStoreData) -> Result<(), StoreError> {
    let contents = serde_json::to_string_pretty(data)?;
    let tmp_path = path.with_extension("json.tmp");

    {
        let mut file = open_private(&tmp_path)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
    }

    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore").field("path", &self.path).finish()
    }
}

#[async_trait]
impl SecretStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Credential>, StoreError> {
        let key = key.to_string();
        self.run_blocking(move |path, _| {
            let mut data = load(path)?;
            Ok(data
                .entries
                .remove(&key)
                .and_then(|entry| Credential::new(entry.value)))
        })
        .await
    }

    async fn set(&self, key: &str, credential: &Credential) -> Result<(), StoreError> {
        let key = key.to_string();
        let credential = credential.clone();
        self.run_blocking(move |path, lock| {
            let _guard = lock.lock();

            let (mut data, _) = load_for_update(path)?;
            data.entries.insert(
                key,
                StoredEntry {
                    value: credential.expose().to_string(),
                    saved_at: Utc::now(),
                },
            );
            persist(path, &data)
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        self.run_blocking(move |path, lock| {
            let _guard = lock.lock();

            let (mut data, reset) = load_for_update(path)?;
            if data.entries.remove(&key).is_none() && !reset {
                return Ok(());
            }
            persist(path, &data)
        })
        .await
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}
