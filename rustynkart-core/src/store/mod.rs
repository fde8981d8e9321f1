//! Credential storage abstraction.
//!
//! This module provides:
//! - [`SecretStore`] - Trait for storage backends, with typed errors
//! - [`MemoryStore`] - In-memory implementation for tests and degraded mode
//! - [`FileStore`] - JSON file in the platform data directory
//! - [`KeyringStore`] - OS keyring implementation (with `keyring-store` feature)
//! - [`CredentialStore`] - The infallible single-key contract the session uses
//! - [`create_store`] - Helper to select a backend based on availability
//!
//! # Example
//!
//! ```rust,ignore
//! use rustynkart_core::store::{CredentialStore, MemoryStore};
//! use rustynkart_core::Credential;
//!
//! let store = CredentialStore::new(MemoryStore::new(), "authToken");
//! assert!(store.write(&Credential::new("tok123").unwrap()).await);
//! assert_eq!(store.read().await.unwrap().expose(), "tok123");
//! assert!(store.erase().await);
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::model::Credential;

mod file;
mod memory;
#[cfg(feature = "keyring-store")]
mod keyring;

pub use file::FileStore;
pub use memory::MemoryStore;
#[cfg(feature = "keyring-store")]
pub use keyring::KeyringStore;

/// Default key under which the credential is persisted.
pub const DEFAULT_STORAGE_KEY: &str = "authToken";

/// Error type for storage backend operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Access to the entry was denied.
    #[error("access denied to entry: {key}")]
    AccessDenied { key: String },

    /// The storage backend encountered an error.
    #[error("backend error: {message}")]
    BackendError { message: String },

    /// I/O error reading or writing a store file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The keyring backend is not available.
    #[error("keyring not available: {message}")]
    KeyringUnavailable { message: String },

    /// No usable directory for file storage.
    #[error("data directory not available")]
    DataDirUnavailable,
}

/// Abstraction over credential storage backends.
///
/// Backends report failures as [`StoreError`]; [`CredentialStore`] turns
/// them into the absent/`false` results the session layer works with.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Retrieve a credential by key.
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get(&self, key: &str) -> Result<Option<Credential>, StoreError>;

    /// Store a credential at the given key.
    ///
    /// Overwrites any existing value.
    async fn set(&self, key: &str, credential: &Credential) -> Result<(), StoreError>;

    /// Delete a credential by key.
    ///
    /// Returns `Ok(())` even if the key didn't exist.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}

#[async_trait]
impl<T: SecretStore + ?Sized> SecretStore for Box<T> {
    async fn get(&self, key: &str) -> Result<Option<Credential>, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, credential: &Credential) -> Result<(), StoreError> {
        (**self).set(key, credential).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key).await
    }

    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }
}

/// Durable single-credential store.
///
/// Wraps a [`SecretStore`] backend and a fixed key. None of its operations
/// return errors: reads degrade to `None` and mutations to `false`, with the
/// underlying failure logged.
pub struct CredentialStore<S: SecretStore> {
    backend: S,
    key: String,
}

impl<S: SecretStore> CredentialStore<S> {
    /// Create a credential store over `backend`, persisting under `key`.
    pub fn new(backend: S, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    /// The key the credential is persisted under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Access the underlying backend.
    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Read the persisted credential.
    ///
    /// Returns `None` when nothing is stored or the backend fails.
    pub async fn read(&self) -> Option<Credential> {
        match self.backend.get(&self.key).await {
            Ok(credential) => credential,
            Err(e) => {
                tracing::warn!(
                    backend = self.backend.backend_name(),
                    "Failed to read credential: {}",
                    e
                );
                None
            }
        }
    }

    /// Persist `credential`, replacing any previous value.
    ///
    /// Returns `false` if the backend rejected the write.
    pub async fn write(&self, credential: &Credential) -> bool {
        match self.backend.set(&self.key, credential).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    backend = self.backend.backend_name(),
                    "Failed to persist credential: {}",
                    e
                );
                false
            }
        }
    }

    /// Remove the persisted credential.
    ///
    /// Idempotent: returns `true` when nothing was stored.
    pub async fn erase(&self) -> bool {
        match self.backend.delete(&self.key).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    backend = self.backend.backend_name(),
                    "Failed to erase credential: {}",
                    e
                );
                false
            }
        }
    }
}

impl<S: SecretStore> fmt::Debug for CredentialStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("backend", &self.backend.backend_name())
            .field("key", &self.key)
            .finish()
    }
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// JSON file in the data directory.
    #[default]
    File,

    /// OS keyring.
    Keyring,

    /// Process memory only; nothing survives a restart.
    Memory,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Keyring => write!(f, "keyring"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "keyring" => Ok(Self::Keyring),
            "memory" => Ok(Self::Memory),
            other => Err(format!(
                "unknown store backend '{}', expected file, keyring or memory",
                other
            )),
        }
    }
}

/// Create a secret store with automatic backend fallback.
///
/// # Backend Selection Logic
///
/// - [`StoreBackend::Keyring`]: attempts a [`KeyringStore`] when the
///   `keyring-store` feature is enabled
/// - [`StoreBackend::File`]: attempts a [`FileStore`] under `data_dir`
/// - Either falls back to [`MemoryStore`] with a warning if unavailable
///
/// # Example
///
/// ```rust,ignore
/// use rustynkart_core::store::{create_store, StoreBackend};
///
/// let store = create_store(StoreBackend::File, &data_dir);
/// ```
pub fn create_store(backend: StoreBackend, data_dir: &Path) -> Box<dyn SecretStore> {
    match backend {
        StoreBackend::Keyring => {
            #[cfg(feature = "keyring-store")]
            match KeyringStore::try_new("rustynkart") {
                Ok(store) => {
                    tracing::info!("Using OS keyring for credential storage");
                    return Box::new(store);
                }
                Err(e) => {
                    tracing::warn!(
                        "Keyring unavailable ({}), falling back to memory store. \
                         The session will not persist across restarts.",
                        e
                    );
                }
            }

            #[cfg(not(feature = "keyring-store"))]
            tracing::warn!(
                "Keyring storage requested but keyring-store feature not enabled. \
                 Using memory store. The session will not persist across restarts."
            );
        }
        StoreBackend::File => match FileStore::open(data_dir.join(file::STORE_FILE)) {
            Ok(store) => {
                tracing::debug!(path = ?store.path(), "Using file credential storage");
                return Box::new(store);
            }
            Err(e) => {
                tracing::warn!(
                    "File store unavailable ({}), falling back to memory store. \
                     The session will not persist across restarts.",
                    e
                );
            }
        },
        StoreBackend::Memory => {}
    }

    tracing::debug!("Using in-memory credential storage");
    Box::new(MemoryStore::new())
}
