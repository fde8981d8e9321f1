//! OS keyring-backed credential storage implementation.

use async_trait::async_trait;
use keyring::Entry;

use super::{SecretStore, StoreError};
use crate::model::Credential;

/// OS keyring-backed credential store.
///
/// This store uses the platform's native keyring service:
/// - macOS: Keychain
/// - Linux: kernel keyutils (the login session keyring)
/// - Windows: Credential Manager
///
/// Entries are stored under the service `{service_name}/{key}`.
pub struct KeyringStore {
    service_name: String,
}

impl KeyringStore {
    /// Try to create a new keyring store.
    ///
    /// A value is written, read back through a separate entry handle and
    /// deleted. Backends that accept writes without keeping them (such as
    /// the in-process mock used when no platform store is compiled in) fail
    /// this check and are reported as unavailable.
    pub fn try_new(service_name: &str) -> Result<Self, StoreError> {
        let service = format!("{}/__availability__", service_name);
        let unavailable = |message: String| StoreError::KeyringUnavailable { message };

        let writer = Entry::new(&service, "availability_check")
            .map_err(|e| unavailable(format!("keyring backend not available: {}", e)))?;
        writer
            .set_password("ok")
            .map_err(|e| unavailable(format!("keyring rejected write: {}", e)))?;

        let read_back = Entry::new(&service, "availability_check")
            .and_then(|reader| reader.get_password());
        let _ = writer.delete_credential();

        match read_back {
            Ok(value) if value == "ok" => Ok(Self {
                service_name: service_name.to_string(),
            }),
            Ok(_) => Err(unavailable("keyring returned a different value".to_string())),
            Err(e) => Err(unavailable(format!("keyring did not keep the value: {}", e))),
        }
    }

    fn create_entry(&self, key: &str) -> Result<Entry, StoreError> {
        let service = format!("{}/{}", self.service_name, key);
        Entry::new(&service, "rustynkart").map_err(|e| StoreError::BackendError {
            message: format!("failed to create keyring entry: {}", e),
        })
    }
}

impl std::fmt::Debug for KeyringStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyringStore")
            .field("service_name", &self.service_name)
            .finish()
    }
}

#[async_trait]
impl SecretStore for KeyringStore {
    async fn get(&self, key: &str) -> Result<Option<Credential>, StoreError> {
        let entry = self.create_entry(key)?;

        match entry.get_password() {
            // An empty keyring entry is treated as no credential
            Ok(password) => Ok(Credential::new(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(keyring::Error::NoStorageAccess(_)) => Err(StoreError::AccessDenied {
                key: key.to_string(),
            }),
            Err(e) => Err(StoreError::BackendError {
                message: format!("keyring error: {}", e),
            }),
        }
    }

    async fn set(&self, key: &str, credential: &Credential) -> Result<(), StoreError> {
        let entry = self.create_entry(key)?;

        entry
            .set_password(credential.expose())
            .map_err(|e| StoreError::BackendError {
                message: format!("failed to set keyring password: {}", e),
            })
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let entry = self.create_entry(key)?;

        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StoreError::BackendError {
                message: format!("failed to delete keyring entry: {}", e),
            }),
        }
    }

    fn backend_name(&self) -> &'static str {
        "keyring"
    }
}
