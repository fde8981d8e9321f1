//! Top-level error types for Rustynkart.

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::store::StoreError;

/// Top-level error type encompassing all Rustynkart errors.
#[derive(Debug, Error)]
pub enum RustynkartError {
    /// Error from credential storage operations.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Error talking to the backend.
    #[error("api error: {0}")]
    Api(#[from] ApiError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
