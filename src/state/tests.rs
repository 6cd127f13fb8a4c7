//! Cursor store and resume-point tests

use super::*;
use crate::config::TableSpec;
use crate::types::IngestionMode;
use pretty_assertions::assert_eq;
use test_case::test_case;

fn cdc_spec() -> TableSpec {
    TableSpec::incremental("events", IngestionMode::Cdc, vec!["id".into()], "seq")
}

#[test]
fn test_advance_and_read_back() {
    let mut state = SyncState::new();
    assert!(state.cursor("events", None).is_none());

    state.advance("events", None, "100");
    assert_eq!(state.cursor("events", None), Some("100"));

    state.advance("events", None, "250");
    assert_eq!(state.cursor("events", None), Some("250"));
}

#[test]
fn test_advance_is_monotonic() {
    let mut state = SyncState::new();
    state.advance("events", None, "250");

    // A lower value never moves the cursor backwards
    let effective = state.advance("events", None, "100");
    assert_eq!(effective, "250");
    assert_eq!(state.cursor("events", None), Some("250"));
}

#[test]
fn test_tenants_keep_independent_cursors() {
    let mut state = SyncState::new();
    state.advance("events", Some("org-a"), "10");
    state.advance("events", Some("org-b"), "99");

    assert_eq!(state.cursor("events", Some("org-a")), Some("10"));
    assert_eq!(state.cursor("events", Some("org-b")), Some("99"));
    assert!(state.cursor("events", None).is_none());
}

#[test]
fn test_reset_discards_and_returns_cursor() {
    let mut state = SyncState::new();
    state.advance("events", None, "100");

    assert_eq!(state.reset("events", None), Some("100".to_string()));
    assert!(state.cursor("events", None).is_none());
    assert_eq!(state.reset("events", None), None);
}

#[test]
fn test_resume_snapshot_is_none() {
    let mut state = SyncState::new();
    state.advance("users", None, "100");

    let spec = TableSpec::snapshot("users", vec!["id".into()]);
    assert_eq!(state.resume_point(&spec, None), None);
}

#[test]
fn test_resume_first_run_uses_floor() {
    let state = SyncState::new();
    let spec = cdc_spec().with_floor("50");
    assert_eq!(state.resume_point(&spec, None), Some("50".to_string()));

    let spec = cdc_spec();
    assert_eq!(state.resume_point(&spec, None), None);
}

#[test]
fn test_resume_applies_lookback() {
    let mut state = SyncState::new();
    state.advance("events", None, "250");

    let spec = cdc_spec().with_lookback(10);
    assert_eq!(state.resume_point(&spec, None), Some("240".to_string()));
}

#[test]
fn test_resume_never_below_floors() {
    let mut state = SyncState::new();
    state.advance("events", None, "250");
    state.set_floor("events", None, "245");

    // Lookback would reach 240, but the resync floor wins
    let spec = cdc_spec().with_lookback(10);
    assert_eq!(state.resume_point(&spec, None), Some("245".to_string()));

    // A configured floor above both wins again
    let spec = cdc_spec().with_lookback(10).with_floor("248");
    assert_eq!(state.resume_point(&spec, None), Some("248".to_string()));
}

#[test_case("250", 10, "240" ; "numeric")]
#[test_case("2024-06-10", 3, "2024-06-07" ; "date subtracts days")]
#[test_case("opaque-token", 5, "opaque-token" ; "opaque unchanged")]
#[test_case("7", 100, "0" ; "numeric clamps at zero")]
fn test_subtract_lookback(cursor: &str, units: u64, expected: &str) {
    assert_eq!(subtract_lookback(cursor, units), expected);
}

#[test]
fn test_subtract_lookback_timestamp() {
    let out = subtract_lookback("2024-06-10T12:00:30+00:00", 30);
    assert_eq!(out, "2024-06-10T12:00:00+00:00");
}

#[test]
fn test_cursor_cmp_numeric_vs_lexicographic() {
    use std::cmp::Ordering;
    // Lexicographically "9" > "100"; numerically it is not
    assert_eq!(cursor_cmp("9", "100"), Ordering::Less);
    assert_eq!(cursor_cmp("2024-06-01", "2024-05-31"), Ordering::Greater);
    assert_eq!(cursor_max("9".to_string(), "100"), "100");
}

#[test]
fn test_state_round_trips_through_json() {
    let mut state = SyncState::new();
    state.advance("events", Some("org-a"), "10");
    state.set_floor("events", Some("org-a"), "5");

    let json = serde_json::to_string(&state).unwrap();
    let restored: SyncState = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.cursor("events", Some("org-a")), Some("10"));
    assert_eq!(
        restored.entry("events", Some("org-a")).unwrap().floor,
        Some("5".to_string())
    );
}
