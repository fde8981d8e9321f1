//! # Rustynkart Core
//!
//! Session and request plumbing for the Rustynkart storefront client.
//!
//! This crate provides:
//! - A durable single-credential store with memory, file and keyring backends
//! - A session manager that owns the credential lifecycle
//! - A request dispatcher that attaches the credential to every request and
//!   captures or invalidates it from every response
//! - A user resolver plus the storefront consumers (auth flows, catalog, cart)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rustynkart_core::{config::load_config, Storefront};
//!
//! async fn whoami() -> Result<(), rustynkart_core::RustynkartError> {
//!     let config = load_config(None)?;
//!     let storefront = Storefront::from_config(&config)?;
//!     storefront.start().await;
//!
//!     if let Some(user) = storefront.users.fetch_current_user().await? {
//!         println!("Signed in as {}", user.email);
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod cookies;
pub mod error;
pub mod model;
pub mod session;
pub mod store;
pub mod storefront;
pub mod user;

// Re-export commonly used types at crate root
pub use model::{
    Credential,
    CredentialSource,
    SessionState,
};

pub use store::{
    CredentialStore,
    SecretStore,
    StoreBackend,
    StoreError,
    MemoryStore,
    FileStore,
    create_store,
};

#[cfg(feature = "keyring-store")]
pub use store::KeyringStore;

pub use api::{
    ApiError,
    ApiResponse,
    Dispatcher,
    Payload,
};

pub use session::SessionManager;

pub use user::{
    UserProfile,
    UserResolver,
};

pub use auth::{
    AuthClient,
    AuthOutcome,
    AuthProbe,
    FederatedIdentity,
};

pub use cart::{
    Cart,
    CartClient,
};

pub use catalog::{
    Catalog,
    Product,
};

pub use config::{
    ClientConfig,
    ConfigError,
};

pub use cookies::SessionCookies;

pub use error::RustynkartError;

pub use storefront::Storefront;
