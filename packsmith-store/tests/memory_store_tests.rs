use packsmith_store::{ArtifactStore, MemoryArtifactStore, StoreError};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn put_then_exists() {
    let store = MemoryArtifactStore::new("https://cdn.example.com/");
    assert!(!store.exists("brand-abcdef.zip").await.unwrap());

    store
        .put("brand-abcdef.zip", b"zip".to_vec(), "application/zip")
        .await
        .unwrap();

    assert!(store.exists("brand-abcdef.zip").await.unwrap());
    assert_eq!(store.get("brand-abcdef.zip").await.unwrap(), b"zip".to_vec());
    assert_eq!(store.put_calls(), vec!["brand-abcdef.zip"]);
    assert_eq!(store.exists_calls(), 2);
}

#[tokio::test]
async fn primed_objects_exist_without_puts() {
    let store = MemoryArtifactStore::new("");
    store.insert("brand-123456.mcpack", vec![1]).await;
    assert!(store.exists("brand-123456.mcpack").await.unwrap());
    assert!(store.put_calls().is_empty());
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn failing_checks_are_errors_not_absence() {
    let store = MemoryArtifactStore::new("");
    store.fail_next_checks(2);

    let first = store.exists("x").await.unwrap_err();
    assert!(matches!(first, StoreError::Unavailable(_)));
    assert!(first.is_transient());
    assert!(store.exists("x").await.is_err());
    assert!(!store.exists("x").await.unwrap());
}

#[tokio::test]
async fn failing_puts_store_nothing() {
    let store = MemoryArtifactStore::new("");
    store.fail_puts(true);
    assert!(store.put("x", vec![1], "application/zip").await.is_err());
    assert!(store.is_empty().await);
    assert_eq!(store.put_calls(), vec!["x"]);

    store.fail_puts(false);
    store.put("x", vec![1], "application/zip").await.unwrap();
    assert!(store.exists("x").await.unwrap());
}

#[test]
fn provider_names() {
    let store = MemoryArtifactStore::new("root/");
    assert_eq!(store.provider_name(), "memory");
    assert_eq!(store.public_root(), "root/");
}

#[tokio::test]
async fn denied_checks_are_not_transient() {
    let store = MemoryArtifactStore::new("");
    store.deny_checks(true);

    let err = store.exists("x").await.unwrap_err();
    assert!(matches!(err, StoreError::Denied(_)));
    assert!(!err.is_transient());
    assert_eq!(store.exists_calls(), 1);

    store.deny_checks(false);
    assert!(!store.exists("x").await.unwrap());
}

#[test]
fn public_url_joins_root_and_name() {
    assert_eq!(
        MemoryArtifactStore::new("https://cdn.example.com/").public_url("brand-abcdef.zip"),
        "https://cdn.example.com/brand-abcdef.zip"
    );
    assert_eq!(
        MemoryArtifactStore::new("https://cdn.example.com").public_url("brand-abcdef.zip"),
        "https://cdn.example.com/brand-abcdef.zip"
    );
    assert_eq!(MemoryArtifactStore::new("").public_url("a.zip"), "a.zip");
}
