#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;

use common::{file, reader_for, table_with_appends};
use lakescan_core::errors::ScanError;
use lakescan_core::logging_facility::test_capture::init_test_capture;
use lakescan_core::{
    log_op_end, log_op_error, log_op_start, ContinuousScanDriver, MemoryTable, StartingScanner,
    StartupPolicy,
};
use lakescan_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};

#[test]
fn test_log_op_start_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_start_unique_1";

    log_op_start!(op_name, startup_mode = "latest");

    let events = capture.events();
    let start = events
        .iter()
        .find(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_START))
        .expect("Should have start event");
    assert_eq!(start.field("startup_mode"), Some("latest"));
}

#[test]
fn test_log_op_end_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_end_unique_2";

    log_op_end!(op_name, duration_ms = 42, snapshot_id = 7);

    let events = capture.events();
    let end_events: Vec<_> = events
        .iter()
        .filter(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_END))
        .collect();

    assert_eq!(end_events.len(), 1, "Should have exactly one end event");
    assert_eq!(end_events[0].field("duration_ms"), Some("42"));
    assert_eq!(end_events[0].field("snapshot_id"), Some("7"));
}

#[test]
fn test_log_op_error_includes_code() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_3";

    let err = ScanError::SnapshotExpired {
        requested: 3,
        earliest: Some(5),
    };
    log_op_error!(op_name, err, duration_ms = 1);

    capture.assert_event_exists(op_name, EVENT_END_ERROR);
    let events = capture.events();
    let error_event = events
        .iter()
        .find(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_END_ERROR))
        .expect("Should have error event");
    assert_eq!(error_event.field("err.code"), Some("ERR_SNAPSHOT_EXPIRED"));
    assert_eq!(error_event.field("err.kind"), Some("SnapshotExpired"));
}

#[test]
fn test_not_ready_reason_logged_at_debug() {
    let capture = init_test_capture();
    let table = table_with_appends(&[&["a"]]);

    // a timestamp no snapshot can match, so the event is unique to this test
    let millis = -4_242;
    let scanner = StartingScanner::new(&StartupPolicy::FromTimestamp {
        millis,
        fallback_to_earliest: false,
    })
    .unwrap();
    scanner.get_plan(table.as_ref(), &mut reader_for(&table)).unwrap();

    let found = capture.count_events(|e| {
        e.level == tracing::Level::DEBUG
            && e.field("startup_mode") == Some("from-timestamp")
            && e.field("reason")
                .is_some_and(|r| r.contains(&millis.to_string()))
    });
    assert_eq!(found, 1);
}

#[test]
fn test_skipped_compaction_logged_at_debug() {
    let capture = init_test_capture();
    let table = Arc::new(MemoryTable::new());
    table.append(1, vec![file("skip-a"), file("skip-b")]).unwrap();
    let mut driver =
        ContinuousScanDriver::new(table.clone(), reader_for(&table), StartingScanner::Latest)
            .unwrap();
    driver.poll().unwrap();

    table.compact(2, vec![file("skip-ab")], &["skip-a", "skip-b"]).unwrap();
    driver.poll().unwrap();

    let skipped = capture.count_events(|e| {
        e.field("commit_kind") == Some("COMPACT") && e.field("follow_up") == Some("append")
    });
    assert!(skipped >= 1);
}

#[test]
#[should_panic(expected = "Expected event")]
fn test_test_capture_assert_event_exists_fails() {
    let capture = init_test_capture();
    capture.assert_event_exists("nonexistent_op_truly_unique_999", EVENT_START);
}
