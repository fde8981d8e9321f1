//! Domain model types for the session layer.
//!
//! This module defines the core types shared by the store, the session
//! manager and the dispatcher:
//! - [`Credential`] - The opaque bearer credential issued by the backend
//! - [`CredentialSource`] - Where an observed credential came from
//! - [`SessionState`] - Whether the client currently holds a credential

use reqwest::header::{HeaderValue, InvalidHeaderValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Authorization scheme prefix, including the separating space.
pub const BEARER_PREFIX: &str = "Bearer ";

/// An opaque bearer credential.
///
/// The value is never parsed; expiry and claims are the server's concern.
/// Debug and Display implementations show `[REDACTED]`, and the backing
/// memory is zeroed when the credential is dropped.
///
/// # Examples
///
/// ```
/// use rustynkart_core::Credential;
///
/// assert!(Credential::new("").is_none());
/// let credential = Credential::new("tok123").unwrap();
/// assert_eq!(credential.expose(), "tok123");
/// ```
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credential(String);

impl Credential {
    /// Create a credential, rejecting empty values.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Extract a credential from an `Authorization` header value.
    ///
    /// Only `Bearer `-prefixed values are accepted.
    pub fn from_bearer(header: &str) -> Option<Self> {
        header.strip_prefix(BEARER_PREFIX).and_then(Self::new)
    }

    /// Expose the credential value.
    ///
    /// Use sparingly and never log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Build the `Authorization: Bearer <credential>` header value.
    ///
    /// The returned value is marked sensitive so transports skip it when
    /// formatting headers.
    pub fn bearer_header(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut value = HeaderValue::from_str(&format!("{}{}", BEARER_PREFIX, self.0))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential([REDACTED])")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

/// Origin of an observed credential.
///
/// When a single response carries both a body field and a header, the body
/// wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    /// The `token` field of a JSON response body.
    ResponseBody,

    /// A `Bearer` value in the response `Authorization` header.
    ResponseHeader,

    /// The persisted store, read at start-up.
    PersistedStore,
}

impl CredentialSource {
    /// Get the string representation of this source.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResponseBody => "response_body",
            Self::ResponseHeader => "response_header",
            Self::PersistedStore => "persisted_store",
        }
    }
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derived authentication state of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No credential is held.
    Anonymous,

    /// A non-empty credential is held.
    Authenticated,
}

impl SessionState {
    /// Derive the state from an optional credential.
    pub fn from_credential(credential: Option<&Credential>) -> Self {
        match credential {
            Some(_) => Self::Authenticated,
            None => Self::Anonymous,
        }
    }

    /// Whether this state carries a credential.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => write!(f, "anonymous"),
            Self::Authenticated => write!(f, "authenticated"),
        }
    }
}
