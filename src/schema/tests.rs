//! Schema cache and coercion tests

use super::*;
use crate::source::testing::{offline_client, StubSource};
use serde_json::json;

#[test]
fn test_coerce_field_types() {
    assert_eq!(FieldType::Integer.coerce(json!("42")), json!(42));
    assert_eq!(FieldType::Float.coerce(json!("3.5")), json!(3.5));
    assert_eq!(FieldType::Boolean.coerce(json!("true")), json!(true));
    assert_eq!(FieldType::String.coerce(json!(7)), json!("7"));
    // Null and already-typed values pass through
    assert_eq!(FieldType::Integer.coerce(json!(null)), json!(null));
    assert_eq!(FieldType::Integer.coerce(json!(42)), json!(42));
    // Garbage stays as-is rather than being dropped
    assert_eq!(FieldType::Integer.coerce(json!("n/a")), json!("n/a"));
}

#[test]
fn test_schema_coerce_record() {
    let schema = TableSchema::new(
        "report",
        vec![
            FieldDescriptor::new("sessions", FieldType::Integer),
            FieldDescriptor::new("bounce_rate", FieldType::Float),
            FieldDescriptor::new("date", FieldType::Date),
        ],
    );

    let typed = schema.coerce(json!({
        "sessions": "1042",
        "bounce_rate": "0.37",
        "date": "2024-06-01",
        "unknown_field": "kept"
    }));

    assert_eq!(typed["sessions"], json!(1042));
    assert_eq!(typed["bounce_rate"], json!(0.37));
    assert_eq!(typed["date"], json!("2024-06-01"));
    assert_eq!(typed["unknown_field"], json!("kept"));
}

#[test]
fn test_validate_missing_field_fails_fast() {
    let schema = TableSchema::new(
        "leads",
        vec![FieldDescriptor::new("id", FieldType::String)],
    );

    assert!(schema.validate(["id"]).is_ok());

    let err = schema.validate(["id", "Modified_Time"]).unwrap_err();
    assert!(matches!(
        err,
        crate::error::Error::SchemaValidation { table, .. } if table == "leads"
    ));
}

#[tokio::test]
async fn test_cache_fetches_once() {
    let source = StubSource::new("leads");
    let client = offline_client();
    let cache = SchemaCache::new();

    let first = cache.get(&source, &client, "leads").await.unwrap();
    let second = cache.get(&source, &client, "leads").await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.table, "leads");
    assert!(first.field("id").is_some());
}

#[tokio::test]
async fn test_cache_evict_forces_refetch() {
    let source = StubSource::new("leads");
    let client = offline_client();
    let cache = SchemaCache::new();

    let first = cache.get(&source, &client, "leads").await.unwrap();
    cache.evict("leads").await;
    let second = cache.get(&source, &client, "leads").await.unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
}
