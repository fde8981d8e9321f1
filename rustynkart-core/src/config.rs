//! Client configuration handling.
//!
//! Configuration is read from `client.toml` in the platform configuration
//! directory (`~/.config/rustynkart/client.toml` on Linux). A missing file
//! yields the defaults.
//!
//! ```toml
//! base_url = "https://rustynkart-backend.onrender.com"
//! store_backend = "file"
//! storage_key = "authToken"
//! log_level = "info"
//! ```

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::store::{StoreBackend, DEFAULT_STORAGE_KEY};

/// Backend the storefront talks to unless configured otherwise.
pub const DEFAULT_BASE_URL: &str = "https://rustynkart-backend.onrender.com";

const CONFIG_FILE: &str = "client.toml";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid base URL {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("storage key must not be empty")]
    EmptyStorageKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Root URL of the storefront backend.
    pub base_url: String,

    /// Where the credential is persisted.
    pub store_backend: StoreBackend,

    /// Key the credential is persisted under.
    pub storage_key: String,

    /// Directory for the file store.
    pub data_dir: PathBuf,

    /// Logging level used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Path to the configuration file that was loaded.
    #[serde(skip)]
    pub config_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let data_dir = project_dirs()
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".rustynkart"));

        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            store_backend: StoreBackend::default(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            data_dir,
            log_level: "info".to_string(),
            config_path: PathBuf::new(),
        }
    }
}

impl ClientConfig {
    /// Parse and validate the base URL.
    ///
    /// A trailing slash is added so that relative paths join beneath it.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let mut raw = self.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw).map_err(|source| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            source,
        })
    }

    /// Check the configuration for values that cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base_url()?;
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::EmptyStorageKey);
        }
        Ok(())
    }
}

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    project_dirs()
        .map(|d| d.config_dir().join(CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from("rustynkart-client.toml"))
}

/// Load configuration from `path`, or the default location when `None`.
pub fn load_config(path: Option<&Path>) -> Result<ClientConfig, ConfigError> {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);

    let mut config = if config_path.exists() {
        let contents = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
            path: config_path.clone(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: config_path.clone(),
            source,
        })?
    } else {
        ClientConfig::default()
    };

    config.config_path = config_path;
    config.validate()?;

    Ok(config)
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "rustynkart", "rustynkart")
}
