//! Integration tests for session persistence between CLI invocations.
//!
//! Each test builds a fresh storefront from the same configuration to
//! stand in for separate runs of the binary.

use rustynkart_core::{config::ClientConfig, SessionState, StoreBackend, Storefront};
use serde_json::json;
use tempfile::TempDir;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn file_config(base_url: &str, temp: &TempDir) -> ClientConfig {
    ClientConfig {
        base_url: base_url.to_string(),
        store_backend: StoreBackend::File,
        data_dir: temp.path().to_path_buf(),
        ..ClientConfig::default()
    }
}

#[tokio::test]
async fn test_login_persists_for_next_run() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "saved-tok"})))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/user/getcurrentuser"))
        .and(header("authorization", "Bearer saved-tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"_id": "u1"})))
        .expect(2)
        .mount(&mock_server)
        .await;

    let temp = TempDir::new().unwrap();
    let config = file_config(&mock_server.uri(), &temp);

    let first = Storefront::from_config(&config).unwrap();
    assert_eq!(first.start().await, SessionState::Anonymous);
    first.auth.login("ada@example.com", "pw").await.unwrap();

    let second = Storefront::from_config(&config).unwrap();
    assert_eq!(second.start().await, SessionState::Authenticated);
    let user = second.users.fetch_current_user().await.unwrap().unwrap();
    assert_eq!(user.id, "u1");
}

#[tokio::test]
async fn test_rejected_session_is_gone_next_run() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user/getcurrentuser"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let temp = TempDir::new().unwrap();
    let config = file_config(&mock_server.uri(), &temp);

    let first = Storefront::from_config(&config).unwrap();
    first.session.save_credential(Some("expired")).await;
    assert!(first.users.fetch_current_user().await.is_err());

    let second = Storefront::from_config(&config).unwrap();
    assert_eq!(second.start().await, SessionState::Anonymous);
}

#[tokio::test]
async fn test_memory_backend_forgets_between_runs() {
    let mock_server = MockServer::start().await;
    let config = ClientConfig {
        base_url: mock_server.uri(),
        store_backend: StoreBackend::Memory,
        ..ClientConfig::default()
    };

    let first = Storefront::from_config(&config).unwrap();
    assert!(first.session.save_credential(Some("tok")).await);

    let second = Storefront::from_config(&config).unwrap();
    assert_eq!(second.start().await, SessionState::Anonymous);
}

#[tokio::test]
async fn test_logout_erases_persisted_session() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/logout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(&mock_server)
        .await;

    let temp = TempDir::new().unwrap();
    let config = file_config(&mock_server.uri(), &temp);

    let first = Storefront::from_config(&config).unwrap();
    first.session.save_credential(Some("tok")).await;
    assert!(first.auth.logout().await);

    let second = Storefront::from_config(&config).unwrap();
    assert_eq!(second.start().await, SessionState::Anonymous);
}
