//! Tenant fan-out tests

use super::*;
use crate::pagination::RawPage;
use crate::schema::{FieldDescriptor, FieldType};
use crate::source::testing::{offline_client, StubSource};
use crate::types::IngestionMode;
use pretty_assertions::assert_eq;
use serde_json::json;

fn schema() -> TableSchema {
    TableSchema::new(
        "reports",
        vec![
            FieldDescriptor::new("date", FieldType::Date).required(),
            FieldDescriptor::new("sessions", FieldType::Integer),
        ],
    )
}

fn scoped_spec() -> TableSpec {
    TableSpec::incremental(
        "reports",
        IngestionMode::Append,
        vec!["date".into()],
        "date",
    )
    .with_tenants("property_id", ["p-1", "p-2"])
}

fn coordinator() -> TenantFanoutCoordinator {
    TenantFanoutCoordinator::new(PaginatedFetcher::new(100, 4), DeleteTracker::new(100))
}

#[test]
fn test_scopes() {
    assert_eq!(scopes(&scoped_spec()).len(), 2);

    let unscoped = TableSpec::snapshot("users", vec!["id".into()]);
    assert_eq!(scopes(&unscoped), vec![None]);
}

#[test]
fn test_build_record_prefixes_tenant_and_tags_field() {
    let record = build_record(
        json!({"date": "2024-06-01", "sessions": "42"}),
        &scoped_spec(),
        &schema(),
        Some("p-1"),
    )
    .unwrap();

    // Shared natural key "2024-06-01" stays unique across tenants
    assert_eq!(record.key, vec!["p-1", "2024-06-01"]);
    assert_eq!(record.cursor.as_deref(), Some("2024-06-01"));
    assert_eq!(record.data["property_id"], json!("p-1"));
    // Coercion typed the all-string payload
    assert_eq!(record.data["sessions"], json!(42));
}

#[test]
fn test_build_record_missing_key_field_errors() {
    let err = build_record(json!({"sessions": "42"}), &scoped_spec(), &schema(), Some("p-1"))
        .unwrap_err();
    assert!(matches!(err, Error::SchemaValidation { .. }));
}

#[tokio::test]
async fn test_tenants_run_independently() {
    let source = StubSource::new("reports");
    source.push_page(
        Some("p-1"),
        Ok(RawPage::of(vec![json!({"date": "2024-06-01", "sessions": "10"})])),
    );
    source.push_page(
        Some("p-2"),
        Ok(RawPage::of(vec![json!({"date": "2024-06-02", "sessions": "20"})])),
    );
    let source: Arc<dyn Source> = Arc::new(source);

    let state = SyncState::new();
    let (runs, failures) = coordinator()
        .run(&source, &offline_client(), &scoped_spec(), &schema(), &state)
        .await;

    assert!(failures.is_empty());
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].tenant.as_deref(), Some("p-1"));
    assert_eq!(runs[0].new_cursor.as_deref(), Some("2024-06-01"));
    assert_eq!(runs[1].new_cursor.as_deref(), Some("2024-06-02"));

    // Same natural key in both tenants would still collide nowhere
    let keys: Vec<&Vec<String>> = runs.iter().flat_map(|r| &r.records).map(|r| &r.key).collect();
    assert_eq!(keys[0][0], "p-1");
    assert_eq!(keys[1][0], "p-2");
}

#[tokio::test]
async fn test_one_tenant_failure_never_blocks_the_others() {
    let source = StubSource::new("reports");
    source.push_page(Some("p-1"), Err(Error::permanent(400, "GET /reports", "bad property")));
    source.push_page(
        Some("p-2"),
        Ok(RawPage::of(vec![json!({"date": "2024-06-02", "sessions": "20"})])),
    );
    let source: Arc<dyn Source> = Arc::new(source);

    let state = SyncState::new();
    let (runs, failures) = coordinator()
        .run(&source, &offline_client(), &scoped_spec(), &schema(), &state)
        .await;

    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].tenant.as_deref(), Some("p-2"));
    assert_eq!(failures.len(), 1);
    assert!(matches!(
        &failures[0],
        Error::Tenant { tenant, .. } if tenant == "p-1"
    ));
}

#[tokio::test]
async fn test_cursor_expired_triggers_resync_from_floor() {
    let source = StubSource::new("events").with_mode(crate::pagination::PaginationMode::Offset);
    source.push_page(None, Err(Error::cursor_expired("events", "100", "too old")));
    source.push_page(
        None,
        Ok(RawPage::of(vec![json!({"id": "9", "seq": "250"})])),
    );
    let source: Arc<dyn Source> = Arc::new(source);

    let spec = TableSpec::incremental("events", IngestionMode::Cdc, vec!["id".into()], "seq")
        .with_floor("0");
    let schema = TableSchema::new(
        "events",
        vec![
            FieldDescriptor::new("id", FieldType::String).required(),
            FieldDescriptor::new("seq", FieldType::String),
        ],
    );

    let mut state = SyncState::new();
    state.advance("events", None, "100");

    let (runs, failures) = coordinator()
        .run(&source, &offline_client(), &spec, &schema, &state)
        .await;

    assert!(failures.is_empty());
    assert_eq!(runs.len(), 1);
    assert!(runs[0].resynced);
    assert_eq!(runs[0].new_cursor.as_deref(), Some("250"));
}

#[tokio::test]
async fn test_delete_pass_prefixes_tenant_keys() {
    let source = StubSource::new("messages").with_delete_support("messages");
    source.push_page(
        Some("org-a"),
        Ok(RawPage::of(vec![json!({"id": "1", "seq": "10"})])),
    );
    source.push_delete_page(
        Some("org-a"),
        Ok(RawPage::of(vec![json!({"id": "2", "seq": "11"})])),
    );
    let source: Arc<dyn Source> = Arc::new(source);

    let spec = TableSpec::incremental(
        "messages",
        IngestionMode::CdcWithDeletes,
        vec!["id".into()],
        "seq",
    )
    .with_tenants("org", ["org-a"]);
    let schema = TableSchema::new(
        "messages",
        vec![
            FieldDescriptor::new("id", FieldType::String).required(),
            FieldDescriptor::new("seq", FieldType::String),
        ],
    );

    let state = SyncState::new();
    let (runs, failures) = coordinator()
        .run(&source, &offline_client(), &spec, &schema, &state)
        .await;

    assert!(failures.is_empty());
    assert_eq!(
        runs[0].tombstones,
        vec![Tombstone::new(
            vec!["org-a".into(), "2".into()],
            Some("11".into())
        )]
    );
}

#[tokio::test]
async fn test_resynced_delete_run_flags_gap() {
    let source = StubSource::new("messages")
        .with_mode(crate::pagination::PaginationMode::Offset)
        .with_delete_support("messages");
    source.push_page(None, Err(Error::cursor_expired("messages", "5", "too old")));
    source.push_page(None, Ok(RawPage::of(vec![json!({"id": "1", "seq": "10"})])));
    let source: Arc<dyn Source> = Arc::new(source);

    let spec = TableSpec::incremental(
        "messages",
        IngestionMode::CdcWithDeletes,
        vec!["id".into()],
        "seq",
    );
    let schema = TableSchema::new(
        "messages",
        vec![
            FieldDescriptor::new("id", FieldType::String).required(),
            FieldDescriptor::new("seq", FieldType::String),
        ],
    );

    let mut state = SyncState::new();
    state.advance("messages", None, "5");

    let (runs, failures) = coordinator()
        .run(&source, &offline_client(), &spec, &schema, &state)
        .await;

    // The resync re-fetched the table but the matching delete history is
    // gone with the rejected cursor
    assert!(failures.is_empty());
    assert!(runs[0].resynced);
    assert!(runs[0].delete_gap);
    assert!(runs[0].tombstones.is_empty());
}

#[tokio::test]
async fn test_expired_delete_history_flags_gap() {
    let source = StubSource::new("messages").with_delete_support("messages");
    source.push_page(None, Ok(RawPage::of(vec![json!({"id": "1", "seq": "10"})])));
    source.push_delete_page(
        None,
        Err(Error::cursor_expired("messages", "5", "history expired")),
    );
    let source: Arc<dyn Source> = Arc::new(source);

    let spec = TableSpec::incremental(
        "messages",
        IngestionMode::CdcWithDeletes,
        vec!["id".into()],
        "seq",
    );
    let schema = TableSchema::new(
        "messages",
        vec![
            FieldDescriptor::new("id", FieldType::String).required(),
            FieldDescriptor::new("seq", FieldType::String),
        ],
    );

    let state = SyncState::new();
    let (runs, failures) = coordinator()
        .run(&source, &offline_client(), &spec, &schema, &state)
        .await;

    assert!(failures.is_empty());
    assert!(runs[0].delete_gap);
    assert!(runs[0].tombstones.is_empty());
    assert_eq!(runs[0].records.len(), 1);
}
