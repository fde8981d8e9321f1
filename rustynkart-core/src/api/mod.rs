//! HTTP plumbing between the storefront and its backend.
//!
//! This module provides the `Dispatcher`, the single place where requests
//! are built and where credentials are attached to and captured from
//! traffic, plus the `ApiError` taxonomy every consumer returns.

mod dispatcher;
mod error;

pub use dispatcher::{extract_credential, ApiResponse, Dispatcher, Payload, TOKEN_FIELD};
pub use error::ApiError;
