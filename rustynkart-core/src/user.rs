//! Authenticated identity lookup.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, Dispatcher};
use crate::store::SecretStore;

/// Endpoint returning the identity behind the current credential.
pub const CURRENT_USER_PATH: &str = "/api/user/getcurrentuser";

/// Identity returned by the backend for the current credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub email: String,

    /// Any further fields the backend sends, kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Resolves and caches the identity of the signed-in user.
pub struct UserResolver<S: SecretStore = Box<dyn SecretStore>> {
    dispatcher: Arc<Dispatcher<S>>,
    identity: RwLock<Option<UserProfile>>,
}

impl<S: SecretStore> UserResolver<S> {
    pub fn new(dispatcher: Arc<Dispatcher<S>>) -> Self {
        Self {
            dispatcher,
            identity: RwLock::new(None),
        }
    }

    /// The last resolved identity, if any.
    pub fn identity(&self) -> Option<UserProfile> {
        self.identity.read().clone()
    }

    /// Drop the cached identity.
    pub fn forget(&self) {
        *self.identity.write() = None;
    }

    /// Look up the user behind the current credential.
    ///
    /// - No credential: returns `Ok(None)` without touching the network.
    /// - 401: the session is cleared and `Err(ApiError::Unauthorized)` returned.
    /// - Any other failure: the session is kept, the error returned.
    ///
    /// The cached identity is absent after every outcome except success.
    pub async fn fetch_current_user(&self) -> Result<Option<UserProfile>, ApiError> {
        let session = self.dispatcher.session();

        if !session.is_authenticated().await {
            tracing::debug!("No credential available, skipping current user lookup");
            self.forget();
            return Ok(None);
        }

        let result = match self.dispatcher.get(CURRENT_USER_PATH).await {
            Ok(response) => response.json::<UserProfile>(),
            Err(e) => Err(e),
        };

        match result {
            Ok(user) => {
                tracing::debug!(user_id = %user.id, "Resolved current user");
                *self.identity.write() = Some(user.clone());
                Ok(Some(user))
            }
            Err(e) => {
                self.forget();
                if e.is_unauthorized() {
                    session.clear_credential().await;
                } else {
                    tracing::warn!("Current user lookup failed: {}", e);
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_profile_deserialize() {
        let json = serde_json::json!({
            "_id": "u1",
            "name": "Asha",
            "email": "asha@example.com",
            "cartData": {"p1": {"M": 2}}
        });

        let user: UserProfile = serde_json::from_value(json).unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.name, "Asha");
        assert!(user.extra.contains_key("cartData"));
    }

    #[test]
    fn test_user_profile_optional_fields() {
        let user: UserProfile = serde_json::from_str(r#"{"_id":"u2"}"#).unwrap();
        assert!(user.name.is_empty());
        assert!(user.email.is_empty());
    }
}
