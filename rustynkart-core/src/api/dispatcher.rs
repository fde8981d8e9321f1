//! Credential-aware request dispatcher.
//!
//! Every request sent through [`Dispatcher::send`] passes through exactly one
//! outbound hook and one inbound hook, in that order:
//!
//! 1. **outbound**: attach `Authorization: Bearer <credential>` when the
//!    session holds one, and set the JSON content type unless the body is
//!    multipart.
//! 2. transport
//! 3. **inbound**: on success, capture a credential from the `token` body
//!    field or, failing that, from a `Bearer` response header. On 401, drop
//!    the session. Every other failure passes through untouched.

use std::sync::Arc;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Method, Request, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use url::Url;

use super::ApiError;
use crate::model::{Credential, CredentialSource};
use crate::session::SessionManager;
use crate::store::SecretStore;

/// JSON body field carrying a server-issued credential.
pub const TOKEN_FIELD: &str = "token";

/// Outbound request body.
pub enum Payload {
    /// No body.
    Empty,

    /// A JSON document.
    Json(serde_json::Value),

    /// A multipart form; the transport picks the boundary content type.
    Multipart(reqwest::multipart::Form),
}

impl Payload {
    /// Serialize `body` into a JSON payload.
    pub fn json<B: Serialize + ?Sized>(body: &B) -> Result<Self, ApiError> {
        serde_json::to_value(body)
            .map(Payload::Json)
            .map_err(|e| ApiError::InvalidRequest(format!("failed to encode body: {}", e)))
    }

    fn kind(&self) -> BodyKind {
        match self {
            Payload::Empty => BodyKind::Empty,
            Payload::Json(_) => BodyKind::Json,
            Payload::Multipart(_) => BodyKind::Multipart,
        }
    }
}

impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Payload::Empty => write!(f, "Empty"),
            Payload::Json(_) => write!(f, "Json(..)"),
            Payload::Multipart(_) => write!(f, "Multipart(..)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Empty,
    Json,
    Multipart,
}

/// A successful response, fully read.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    credential_source: Option<CredentialSource>,
}

impl ApiResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Where the inbound hook found a credential on this response, if it did.
    pub fn credential_source(&self) -> Option<CredentialSource> {
        self.credential_source
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ApiError::InvalidResponse(format!("failed to decode body: {}", e)))
    }

    /// The body as (lossy) UTF-8 text.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Shared HTTP entry point for the storefront.
///
/// Cloning the inner [`reqwest::Client`] is cheap; one dispatcher is meant
/// to be shared behind an [`Arc`] by every consumer.
pub struct Dispatcher<S: SecretStore = Box<dyn SecretStore>> {
    client: Client,
    base_url: Url,
    session: Arc<SessionManager<S>>,
}

impl<S: SecretStore> Dispatcher<S> {
    /// Create a dispatcher with the default client configuration.
    ///
    /// No request timeout is set; the transport default applies.
    pub fn new(base_url: Url, session: Arc<SessionManager<S>>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .default_headers(default_headers())
            .cookie_provider(Arc::clone(session.cookies()))
            .user_agent(concat!("rustynkart/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_client(client, base_url, session))
    }

    /// Create a dispatcher around an existing client.
    pub fn with_client(client: Client, mut base_url: Url, session: Arc<SessionManager<S>>) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Self {
            client,
            base_url,
            session,
        }
    }

    /// The session this dispatcher reads credentials from.
    pub fn session(&self) -> &Arc<SessionManager<S>> {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve `path` beneath the base URL, keeping any base path prefix.
    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        let relative = path.trim_start_matches('/');
        self.base_url.join(relative).map_err(|source| ApiError::InvalidUrl {
            path: path.to_string(),
            source,
        })
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.send(Method::GET, path, Payload::Empty).await
    }

    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, ApiError> {
        self.send(Method::POST, path, Payload::json(body)?).await
    }

    pub async fn post_multipart(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<ApiResponse, ApiError> {
        self.send(Method::POST, path, Payload::Multipart(form)).await
    }

    /// Send a request through the outbound and inbound hooks.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        payload: Payload,
    ) -> Result<ApiResponse, ApiError> {
        let url = self.url(path)?;
        let kind = payload.kind();

        let builder = self.client.request(method, url);
        let builder = match payload {
            Payload::Empty => builder,
            Payload::Json(value) => builder.body(serde_json::to_vec(&value).map_err(|e| {
                ApiError::InvalidRequest(format!("failed to encode body: {}", e))
            })?),
            Payload::Multipart(form) => builder.multipart(form),
        };
        let mut request = builder.build()?;

        self.outbound(&mut request, kind).await;

        tracing::debug!(
            method = %request.method(),
            path = request.url().path(),
            authenticated = request.headers().contains_key(header::AUTHORIZATION),
            "Dispatching request"
        );

        let response = self.client.execute(request).await?;
        self.inbound(response).await
    }

    async fn outbound(&self, request: &mut Request, kind: BodyKind) {
        let headers = request.headers_mut();

        match self.session.outbound_authorization().await {
            Some(value) => {
                headers.insert(header::AUTHORIZATION, value);
            }
            None => {
                headers.remove(header::AUTHORIZATION);
            }
        }

        match kind {
            BodyKind::Json => {
                headers.insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
            }
            // The multipart encoder already set the boundary content type
            BodyKind::Multipart | BodyKind::Empty => {}
        }
    }

    async fn inbound(&self, response: Response) -> Result<ApiResponse, ApiError> {
        let status = response.status();
        let path = response.url().path().to_string();

        if !status.is_success() {
            match status {
                StatusCode::UNAUTHORIZED => self.session.invalidate().await,
                StatusCode::FORBIDDEN => {
                    tracing::debug!(%path, "Forbidden, permission denied")
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    tracing::debug!(%path, "Rate limited by server")
                }
                _ => tracing::debug!(%path, %status, "Request failed"),
            }

            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }

        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        let credential_source = match extract_credential(&headers, &body) {
            Some((credential, source)) => {
                self.session.observe(credential, source).await;
                Some(source)
            }
            None => None,
        };

        Ok(ApiResponse {
            status,
            headers,
            body,
            credential_source,
        })
    }
}

impl<S: SecretStore> std::fmt::Debug for Dispatcher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
        "X-Requested-With",
        HeaderValue::from_static("XMLHttpRequest"),
    );
    headers
}

/// Find a server-issued credential on a successful response.
///
/// A non-empty string `token` field in a JSON object body wins over a
/// `Bearer` value in the `Authorization` header.
pub fn extract_credential(
    headers: &HeaderMap,
    body: &[u8],
) -> Option<(Credential, CredentialSource)> {
    let from_body = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get(TOKEN_FIELD)
                .and_then(|token| token.as_str())
                .and_then(Credential::new)
        });
    if let Some(credential) = from_body {
        return Some((credential, CredentialSource::ResponseBody));
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(Credential::from_bearer)
        .map(|credential| (credential, CredentialSource::ResponseHeader))
}
