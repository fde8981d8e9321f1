//! Integration tests for current-user resolution.

use std::sync::Arc;

use rustynkart_core::{
    store::DEFAULT_STORAGE_KEY, ApiError, Dispatcher, MemoryStore, SessionManager, UserResolver,
};
use serde_json::json;
use url::Url;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

const CURRENT_USER: &str = "/api/user/getcurrentuser";

fn setup(uri: &str) -> (Arc<SessionManager<MemoryStore>>, UserResolver<MemoryStore>) {
    let session = Arc::new(SessionManager::new(MemoryStore::new(), DEFAULT_STORAGE_KEY));
    let dispatcher = Dispatcher::new(Url::parse(uri).unwrap(), Arc::clone(&session)).unwrap();
    (session, UserResolver::new(Arc::new(dispatcher)))
}

#[tokio::test]
async fn test_no_credential_makes_no_request() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CURRENT_USER))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"_id": "u1"})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (_session, resolver) = setup(&mock_server.uri());

    assert_eq!(resolver.fetch_current_user().await.unwrap(), None);
    assert!(resolver.identity().is_none());
}

#[tokio::test]
async fn test_success_caches_identity() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CURRENT_USER))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "u1",
            "name": "Ada",
            "email": "ada@example.com",
            "cartData": {}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (session, resolver) = setup(&mock_server.uri());
    session.save_credential(Some("tok")).await;

    let user = resolver.fetch_current_user().await.unwrap().unwrap();
    assert_eq!(user.id, "u1");
    assert_eq!(user.email, "ada@example.com");
    assert!(user.extra.contains_key("cartData"));
    assert_eq!(resolver.identity(), Some(user));
}

#[tokio::test]
async fn test_unauthorized_clears_session_and_identity() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CURRENT_USER))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let (session, resolver) = setup(&mock_server.uri());
    session.save_credential(Some("expired")).await;

    let result = resolver.fetch_current_user().await;

    assert!(matches!(result, Err(ApiError::Unauthorized)));
    assert!(!session.is_authenticated().await);
    assert!(session.default_authorization().is_none());
    assert!(resolver.identity().is_none());
}

#[tokio::test]
async fn test_server_error_keeps_credential() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CURRENT_USER))
        .respond_with(ResponseTemplate::new(500).set_body_string("database down"))
        .mount(&mock_server)
        .await;

    let (session, resolver) = setup(&mock_server.uri());
    session.save_credential(Some("tok")).await;

    let result = resolver.fetch_current_user().await;

    assert!(matches!(result, Err(ApiError::Server { status: 500, .. })));
    assert!(session.is_authenticated().await);
    assert!(resolver.identity().is_none());
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CURRENT_USER))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&mock_server)
        .await;

    let (session, resolver) = setup(&mock_server.uri());
    session.save_credential(Some("tok")).await;

    let result = resolver.fetch_current_user().await;

    assert!(matches!(result, Err(ApiError::InvalidResponse(_))));
    assert!(session.is_authenticated().await);
}

#[tokio::test]
async fn test_identity_cleared_after_logout_then_fetch() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CURRENT_USER))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"_id": "u1"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (session, resolver) = setup(&mock_server.uri());
    session.save_credential(Some("tok")).await;
    resolver.fetch_current_user().await.unwrap();
    assert!(resolver.identity().is_some());

    session.clear_credential().await;

    assert_eq!(resolver.fetch_current_user().await.unwrap(), None);
    assert!(resolver.identity().is_none());
}

/// Backend that accepts reads but refuses to keep anything.
struct FullDisk;

#[async_trait::async_trait]
impl rustynkart_core::SecretStore for FullDisk {
    async fn get(
        &self,
        _key: &str,
    ) -> Result<Option<rustynkart_core::Credential>, rustynkart_core::StoreError> {
        Ok(None)
    }

    async fn set(
        &self,
        _key: &str,
        _credential: &rustynkart_core::Credential,
    ) -> Result<(), rustynkart_core::StoreError> {
        Err(rustynkart_core::StoreError::BackendError {
            message: "no space left on device".to_string(),
        })
    }

    async fn delete(&self, _key: &str) -> Result<(), rustynkart_core::StoreError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "full-disk"
    }
}

#[tokio::test]
async fn test_unpersisted_credential_still_resolves_user() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CURRENT_USER))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "u1",
            "name": "Ada",
            "email": "ada@example.com"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let session = Arc::new(SessionManager::new(FullDisk, DEFAULT_STORAGE_KEY));
    let dispatcher = Dispatcher::new(Url::parse(&mock_server.uri()).unwrap(), Arc::clone(&session))
        .unwrap();
    let resolver = UserResolver::new(Arc::new(dispatcher));
    let state = session.subscribe();

    assert!(!session.save_credential(Some("tok")).await);

    // Every view of the session agrees while the credential lives only in memory
    assert_eq!(*state.borrow(), session.state().await);
    assert!(session.is_authenticated().await);

    let user = resolver.fetch_current_user().await.unwrap().unwrap();
    assert_eq!(user.id, "u1");

    session.clear_credential().await;
    assert_eq!(*state.borrow(), session.state().await);
    assert!(!session.is_authenticated().await);
}
