//! Integration tests for the session lifecycle.
//!
//! These tests verify that the SessionManager correctly:
//! - Restores a credential left in the store by a previous run
//! - Saves and rejects credentials
//! - Clears the session idempotently
//! - Keeps a durable session across restarts with the file backend

use rustynkart_core::{
    store::DEFAULT_STORAGE_KEY, Credential, FileStore, MemoryStore, SessionManager, SessionState,
};
use tempfile::TempDir;

fn credential(value: &str) -> Credential {
    Credential::new(value).unwrap()
}

#[tokio::test]
async fn test_initialize_restores_stored_value() {
    for value in ["tokA", "a.b.c", "  padded  ", "ünïcode"] {
        let store = MemoryStore::with_entry(DEFAULT_STORAGE_KEY, credential(value));
        let session = SessionManager::new(store, DEFAULT_STORAGE_KEY);

        session.initialize().await;

        let current = session.current_credential().await.unwrap();
        assert_eq!(current.expose(), value);
    }
}

#[tokio::test]
async fn test_boot_with_stored_credential_is_authenticated() {
    let store = MemoryStore::with_entry(DEFAULT_STORAGE_KEY, credential("tokA"));
    let session = SessionManager::new(store, DEFAULT_STORAGE_KEY);

    let state = session.initialize().await;

    assert_eq!(state, SessionState::Authenticated);
    assert!(session.is_authenticated().await);
    assert_eq!(
        session.default_authorization().unwrap().to_str().unwrap(),
        "Bearer tokA"
    );
    assert_eq!(*session.subscribe().borrow(), SessionState::Authenticated);
}

#[tokio::test]
async fn test_boot_with_empty_store_is_anonymous() {
    let session = SessionManager::new(MemoryStore::new(), DEFAULT_STORAGE_KEY);

    assert_eq!(session.initialize().await, SessionState::Anonymous);
    assert!(session.default_authorization().is_none());
}

#[tokio::test]
async fn test_save_then_read_back() {
    let session = SessionManager::new(MemoryStore::new(), DEFAULT_STORAGE_KEY);

    for value in ["first", "second", "x"] {
        assert!(session.save_credential(Some(value)).await);
        assert_eq!(session.current_credential().await.unwrap().expose(), value);
    }
}

#[tokio::test]
async fn test_save_empty_or_missing_keeps_prior_state() {
    let session = SessionManager::new(MemoryStore::new(), DEFAULT_STORAGE_KEY);
    assert!(session.save_credential(Some("keep-me")).await);

    assert!(!session.save_credential(Some("")).await);
    assert!(!session.save_credential(None).await);

    assert_eq!(session.current_credential().await.unwrap().expose(), "keep-me");
    assert_eq!(
        session.default_authorization().unwrap().to_str().unwrap(),
        "Bearer keep-me"
    );
}

#[tokio::test]
async fn test_clear_is_idempotent() {
    let session = SessionManager::new(MemoryStore::new(), DEFAULT_STORAGE_KEY);
    session.save_credential(Some("tok")).await;

    assert!(session.clear_credential().await);
    assert!(!session.is_authenticated().await);

    assert!(session.clear_credential().await);
    assert!(!session.is_authenticated().await);
    assert!(session.default_authorization().is_none());
}

#[tokio::test]
async fn test_state_changes_are_published() {
    let session = SessionManager::new(MemoryStore::new(), DEFAULT_STORAGE_KEY);
    let mut rx = session.subscribe();
    assert_eq!(*rx.borrow_and_update(), SessionState::Anonymous);

    session.save_credential(Some("tok")).await;
    assert!(rx.has_changed().unwrap());
    assert_eq!(*rx.borrow_and_update(), SessionState::Authenticated);

    // Replacing one credential with another is not a transition
    session.save_credential(Some("tok2")).await;
    assert!(!rx.has_changed().unwrap());

    session.invalidate().await;
    assert_eq!(*rx.borrow_and_update(), SessionState::Anonymous);
}

#[tokio::test]
async fn test_file_store_survives_restart() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("session.json");

    {
        let session = SessionManager::new(FileStore::open(&path).unwrap(), DEFAULT_STORAGE_KEY);
        session.initialize().await;
        assert!(session.save_credential(Some("durable")).await);
    }

    let session = SessionManager::new(FileStore::open(&path).unwrap(), DEFAULT_STORAGE_KEY);
    assert_eq!(session.initialize().await, SessionState::Authenticated);
    assert_eq!(session.current_credential().await.unwrap().expose(), "durable");

    session.clear_credential().await;

    let session = SessionManager::new(FileStore::open(&path).unwrap(), DEFAULT_STORAGE_KEY);
    assert_eq!(session.initialize().await, SessionState::Anonymous);
}

#[tokio::test]
async fn test_custom_storage_key_is_isolated() {
    let store = MemoryStore::with_entry(DEFAULT_STORAGE_KEY, credential("other-app"));
    let session = SessionManager::new(store, "shopToken");

    assert_eq!(session.initialize().await, SessionState::Anonymous);
    assert_eq!(session.store().key(), "shopToken");
}

#[tokio::test]
async fn test_corrupt_store_file_is_replaced_on_save() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("session.json");
    std::fs::write(&path, "{truncated").unwrap();

    let session = SessionManager::new(FileStore::open(&path).unwrap(), DEFAULT_STORAGE_KEY);
    assert_eq!(session.initialize().await, SessionState::Anonymous);

    assert!(session.save_credential(Some("fresh")).await);
    assert_eq!(session.current_credential().await.unwrap().expose(), "fresh");

    let reopened = SessionManager::new(FileStore::open(&path).unwrap(), DEFAULT_STORAGE_KEY);
    assert_eq!(reopened.initialize().await, SessionState::Authenticated);
}

#[tokio::test]
async fn test_corrupt_store_file_does_not_block_logout() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("session.json");
    std::fs::write(&path, "not json at all").unwrap();

    let session = SessionManager::new(FileStore::open(&path).unwrap(), DEFAULT_STORAGE_KEY);

    assert!(session.store().erase().await);
    assert!(session.store().read().await.is_none());
}
