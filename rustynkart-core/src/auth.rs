//! Login, registration and logout flows.
//!
//! Credentials issued by these endpoints are captured by the dispatcher's
//! inbound hook; the flows here only decide what to do next (resolve the
//! user, report the outcome).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::{ApiError, ApiResponse, Dispatcher};
use crate::model::CredentialSource;
use crate::store::SecretStore;
use crate::user::{UserProfile, UserResolver};

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const REGISTRATION_PATH: &str = "/api/auth/registration";
pub const FEDERATED_LOGIN_PATH: &str = "/api/auth/googlelogin";
pub const LOGOUT_PATH: &str = "/api/auth/logout";
pub const AUTH_PROBE_PATH: &str = "/api/test-auth";

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RegistrationRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

/// Identity handed over by an external identity provider.
///
/// Only the display name and email are exchanged for a backend credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedIdentity {
    pub name: String,
    pub email: String,
}

/// Result of a login, registration or federated login.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    /// Where the credential came from; `None` if the backend sent none.
    pub credential_source: Option<CredentialSource>,

    /// The resolved user, when the lookup succeeded.
    pub user: Option<UserProfile>,
}

impl AuthOutcome {
    pub fn is_authenticated(&self) -> bool {
        self.credential_source.is_some()
    }
}

/// Result of probing the backend with the current credential.
#[derive(Debug, Clone, Serialize)]
pub struct AuthProbe {
    pub authenticated: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Whatever the probe endpoint returned.
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

/// Authentication flows against the storefront backend.
pub struct AuthClient<S: SecretStore = Box<dyn SecretStore>> {
    dispatcher: Arc<Dispatcher<S>>,
    users: Arc<UserResolver<S>>,
}

impl<S: SecretStore> AuthClient<S> {
    pub fn new(dispatcher: Arc<Dispatcher<S>>, users: Arc<UserResolver<S>>) -> Self {
        Self { dispatcher, users }
    }

    /// Sign in with email and password.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthOutcome, ApiError> {
        let response = self
            .dispatcher
            .post_json(LOGIN_PATH, &LoginRequest { email, password })
            .await?;
        Ok(self.complete("login", response).await)
    }

    /// Create an account; the backend signs the new user in.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthOutcome, ApiError> {
        if name.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(ApiError::InvalidRequest(
                "name, email and password are required".to_string(),
            ));
        }

        let response = self
            .dispatcher
            .post_json(
                REGISTRATION_PATH,
                &RegistrationRequest {
                    name,
                    email,
                    password,
                },
            )
            .await?;
        Ok(self.complete("registration", response).await)
    }

    /// Exchange an identity-provider result for a backend credential.
    pub async fn federated_login(
        &self,
        identity: &FederatedIdentity,
    ) -> Result<AuthOutcome, ApiError> {
        let response = self
            .dispatcher
            .post_json(FEDERATED_LOGIN_PATH, identity)
            .await?;
        Ok(self.complete("federated login", response).await)
    }

    /// Sign out.
    ///
    /// The server is told on a best-effort basis; the local session is
    /// cleared whatever it answers.
    pub async fn logout(&self) -> bool {
        if self.dispatcher.session().is_authenticated().await {
            if let Err(e) = self.dispatcher.get(LOGOUT_PATH).await {
                tracing::debug!("Server-side logout failed: {}", e);
            }
        }

        self.users.forget();
        self.dispatcher.session().clear_credential().await
    }

    /// Check whether the backend accepts the current credential.
    pub async fn probe(&self) -> AuthProbe {
        if !self.dispatcher.session().is_authenticated().await {
            return AuthProbe {
                authenticated: false,
                error: Some("No authentication token found".to_string()),
                details: serde_json::Value::Null,
            };
        }

        match self.dispatcher.get(AUTH_PROBE_PATH).await {
            Ok(response) => AuthProbe {
                authenticated: true,
                error: None,
                details: response.json().unwrap_or(serde_json::Value::Null),
            },
            Err(e) => AuthProbe {
                authenticated: false,
                error: Some(e.to_string()),
                details: serde_json::Value::Null,
            },
        }
    }

    async fn complete(&self, flow: &str, response: ApiResponse) -> AuthOutcome {
        let credential_source = response.credential_source();
        match credential_source {
            Some(source) => tracing::info!(%source, "Credential received from {}", flow),
            None => tracing::warn!("No credential received from {}", flow),
        }

        let user = match self.users.fetch_current_user().await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!("Signed in but could not resolve user: {}", e);
                None
            }
        };

        AuthOutcome {
            credential_source,
            user,
        }
    }
}
