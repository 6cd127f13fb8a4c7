//! Source registry tests

use super::testing::{offline_client, StubSource};
use super::*;

#[test]
fn test_registry_tagged_registration() {
    let mut registry = SourceRegistry::new();
    assert!(registry.get("stub").is_none());

    registry.register(Arc::new(StubSource::new("leads")));
    assert!(registry.get("stub").is_some());
    assert_eq!(registry.names(), vec!["stub".to_string()]);
}

#[test]
fn test_registry_replaces_on_reregister() {
    let mut registry = SourceRegistry::new();
    registry.register(Arc::new(StubSource::new("leads")));
    registry.register(Arc::new(StubSource::new("contacts")));
    assert_eq!(registry.names().len(), 1);
}

#[tokio::test]
async fn test_ensure_table() {
    let source = StubSource::new("leads");
    let client = offline_client();

    assert!(ensure_table(&source, &client, "leads").await.is_ok());

    let err = ensure_table(&source, &client, "contacts").await.unwrap_err();
    assert!(matches!(err, Error::TableNotFound { table, .. } if table == "contacts"));
}
