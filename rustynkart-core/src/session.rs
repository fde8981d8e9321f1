//! Session lifecycle management.
//!
//! [`SessionManager`] is the single owner of the client's notion of the
//! current credential. It mirrors the credential into two places:
//!
//! - the durable [`CredentialStore`], which is authoritative and re-read on
//!   every query so that changes made by another process are observed, and
//! - the in-memory default `Authorization` header, which the dispatcher
//!   injects into outbound requests.
//!
//! When the store rejects a write the session runs in degraded mode: the
//! credential is kept in memory only and counts as current until it is
//! cleared, replaced by a persisted one, or the process exits.
//!
//! # State Machine
//!
//! ```text
//!                 save / observe
//!   Anonymous ------------------> Authenticated --+
//!       ^                              |          | observe (value replaced)
//!       +------------------------------+  <-------+
//!            clear / invalidate (401)
//! ```
//!
//! Transitions are published on a [`watch`] channel, see
//! [`SessionManager::subscribe`].

use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::header::HeaderValue;
use tokio::sync::watch;

use crate::cookies::SessionCookies;
use crate::model::{Credential, CredentialSource, SessionState};
use crate::store::{CredentialStore, SecretStore};

/// Owns the credential lifecycle for one client.
///
/// # Type Parameters
///
/// * `S` - The storage backend; defaults to a boxed trait object so that the
///   backend can be picked at runtime with [`create_store`](crate::store::create_store).
pub struct SessionManager<S: SecretStore = Box<dyn SecretStore>> {
    store: CredentialStore<S>,
    /// Credential the store refused to keep.
    unpersisted: RwLock<Option<Credential>>,
    default_header: RwLock<Option<HeaderValue>>,
    cookies: Arc<SessionCookies>,
    state_tx: watch::Sender<SessionState>,
}

impl<S: SecretStore> SessionManager<S> {
    /// Create a session manager persisting under `key` in `backend`.
    pub fn new(backend: S, key: impl Into<String>) -> Self {
        Self::from_store(CredentialStore::new(backend, key))
    }

    /// Create a session manager over an existing credential store.
    pub fn from_store(store: CredentialStore<S>) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Anonymous);
        Self {
            store,
            unpersisted: RwLock::new(None),
            default_header: RwLock::new(None),
            cookies: Arc::new(SessionCookies::new()),
            state_tx,
        }
    }

    /// Access the underlying credential store.
    pub fn store(&self) -> &CredentialStore<S> {
        &self.store
    }

    /// Prime the session from the persisted store.
    ///
    /// Call once at application start. If a credential was left behind by a
    /// previous run it becomes the default header and the session starts
    /// out authenticated.
    pub async fn initialize(&self) -> SessionState {
        match self.store.read().await {
            Some(credential) => {
                if self.set_default_header(&credential) {
                    tracing::info!(
                        source = %CredentialSource::PersistedStore,
                        "Restored persisted session"
                    );
                } else {
                    tracing::warn!("Persisted credential cannot be sent as a header, ignoring it");
                }
            }
            None => {
                tracing::debug!("No persisted credential found");
                self.remove_default_header();
            }
        }

        let state = self.state().await;
        self.publish(state);
        state
    }

    /// Save a credential obtained by a login flow.
    ///
    /// `None` and empty values are rejected without touching any state.
    /// Otherwise the credential is persisted and becomes the default header.
    ///
    /// Returns `true` only if persistence succeeded. When the store rejects
    /// the write the credential is held in memory instead, so the rest of
    /// this process keeps an authenticated session that will not survive a
    /// restart.
    pub async fn save_credential(&self, value: Option<&str>) -> bool {
        match value.and_then(Credential::new) {
            Some(credential) => self.apply(credential, None).await,
            None => {
                tracing::debug!("Refusing to save empty credential");
                false
            }
        }
    }

    /// Record a credential observed on a server response.
    ///
    /// Same semantics as [`save_credential`](Self::save_credential); the
    /// newest observation always overwrites the previous one.
    pub async fn observe(&self, credential: Credential, source: CredentialSource) -> bool {
        self.apply(credential, Some(source)).await
    }

    /// Forget the credential.
    ///
    /// Erases the persisted value and removes the default header. Always
    /// returns `true`; an erase failure is logged by the store.
    pub async fn clear_credential(&self) -> bool {
        self.store.erase().await;
        self.forget_unpersisted();
        self.remove_default_header();
        self.cookies.expire_credentials();
        tracing::info!("Session cleared");
        self.publish(SessionState::Anonymous);
        true
    }

    /// Drop the credential after the server rejected it.
    ///
    /// Called for every 401 response, regardless of which request produced
    /// it. Repeated calls are harmless.
    pub async fn invalidate(&self) {
        self.store.erase().await;
        self.forget_unpersisted();
        self.remove_default_header();
        self.cookies.expire_credentials();
        tracing::info!("Unauthorized response received, session invalidated");
        self.publish(SessionState::Anonymous);
    }

    /// The current credential, read from the store on every call.
    ///
    /// Falls back to the in-memory credential of a degraded session.
    pub async fn current_credential(&self) -> Option<Credential> {
        match self.store.read().await {
            Some(credential) => Some(credential),
            None => self.unpersisted.read().clone(),
        }
    }

    /// Whether a credential is currently held.
    pub async fn is_authenticated(&self) -> bool {
        self.current_credential().await.is_some()
    }

    /// The derived session state.
    pub async fn state(&self) -> SessionState {
        SessionState::from_credential(self.current_credential().await.as_ref())
    }

    /// The in-memory default `Authorization` header, if set.
    pub fn default_authorization(&self) -> Option<HeaderValue> {
        self.default_header.read().clone()
    }

    /// The `Authorization` header an outbound request should carry.
    ///
    /// Built from [`current_credential`](Self::current_credential), so a
    /// request is sent authenticated exactly when the session reports a
    /// credential.
    pub async fn outbound_authorization(&self) -> Option<HeaderValue> {
        let credential = self.current_credential().await?;
        match credential.bearer_header() {
            Ok(header) => Some(header),
            Err(e) => {
                tracing::warn!("Stored credential is not a valid header value: {}", e);
                None
            }
        }
    }

    /// Cookie jar for the HTTP client. Credential cookies are expired
    /// whenever the session is cleared or invalidated.
    pub fn cookies(&self) -> &Arc<SessionCookies> {
        &self.cookies
    }

    /// Subscribe to session state transitions.
    ///
    /// The receiver starts with the most recently published state.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    async fn apply(&self, credential: Credential, source: Option<CredentialSource>) -> bool {
        if !self.set_default_header(&credential) {
            tracing::warn!("Credential cannot be sent as a header, ignoring it");
            return false;
        }

        let persisted = self.store.write(&credential).await;
        if persisted {
            self.forget_unpersisted();
        } else {
            tracing::warn!("Credential not persisted, session will end with this process");
            *self.unpersisted.write() = Some(credential);
        }

        match source {
            Some(source) => tracing::debug!(%source, "Credential updated from response"),
            None => tracing::info!("Credential saved"),
        }

        self.publish(SessionState::Authenticated);
        persisted
    }

    fn set_default_header(&self, credential: &Credential) -> bool {
        match credential.bearer_header() {
            Ok(header) => {
                *self.default_header.write() = Some(header);
                true
            }
            Err(_) => false,
        }
    }

    fn forget_unpersisted(&self) {
        *self.unpersisted.write() = None;
    }

    fn remove_default_header(&self) {
        *self.default_header.write() = None;
    }

    fn publish(&self, state: SessionState) {
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                tracing::debug!(from = %current, to = %state, "Session state changed");
                *current = state;
                true
            }
        });
    }
}

impl<S: SecretStore> std::fmt::Debug for SessionManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("store", &self.store)
            .field("has_default_header", &self.default_header.read().is_some())
            .finish()
    }
}
