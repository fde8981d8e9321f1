//! Wiring of the session layer and its consumers.

use std::sync::Arc;

use crate::api::Dispatcher;
use crate::auth::AuthClient;
use crate::cart::CartClient;
use crate::catalog::Catalog;
use crate::config::ClientConfig;
use crate::error::RustynkartError;
use crate::model::SessionState;
use crate::session::SessionManager;
use crate::store::{create_store, SecretStore};
use crate::user::UserResolver;

/// Every component of the storefront client, sharing one session and one
/// dispatcher.
pub struct Storefront<S: SecretStore = Box<dyn SecretStore>> {
    pub session: Arc<SessionManager<S>>,
    pub dispatcher: Arc<Dispatcher<S>>,
    pub users: Arc<UserResolver<S>>,
    pub auth: AuthClient<S>,
    pub catalog: Catalog<S>,
    pub cart: CartClient<S>,
}

impl Storefront {
    /// Build a storefront from configuration, picking the store backend.
    pub fn from_config(config: &ClientConfig) -> Result<Self, RustynkartError> {
        config.validate()?;
        let backend = create_store(config.store_backend, &config.data_dir);
        let session = Arc::new(SessionManager::new(backend, config.storage_key.clone()));
        let dispatcher = Arc::new(Dispatcher::new(config.base_url()?, session)?);
        Ok(Self::from_dispatcher(dispatcher))
    }
}

impl<S: SecretStore> Storefront<S> {
    /// Build the consumers around an existing dispatcher.
    pub fn from_dispatcher(dispatcher: Arc<Dispatcher<S>>) -> Self {
        let session = Arc::clone(dispatcher.session());
        let users = Arc::new(UserResolver::new(Arc::clone(&dispatcher)));

        Self {
            auth: AuthClient::new(Arc::clone(&dispatcher), Arc::clone(&users)),
            catalog: Catalog::new(Arc::clone(&dispatcher)),
            cart: CartClient::new(Arc::clone(&dispatcher)),
            session,
            dispatcher,
            users,
        }
    }

    /// Restore any persisted session. Call once before using the client.
    pub async fn start(&self) -> SessionState {
        let state = self.session.initialize().await;
        tracing::info!(%state, "Storefront session initialized");
        state
    }
}
