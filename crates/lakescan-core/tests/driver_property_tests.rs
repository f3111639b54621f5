//! Property-based tests for continuous scan invariants.
//!
//! Random histories of commits, aborts and retention are interleaved with
//! polls; every emitted plan is checked against the table as it was at the
//! moment of emission.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use common::{file, reader_for};
use lakescan_core::{
    ContinuousScanDriver, FollowUpMode, MemoryTable, ScanError, SnapshotId, SnapshotStore,
    StartingScanner,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Append(u8),
    Compact,
    Overwrite,
    Abort,
    ExpireOldest,
    Poll,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (1u8..4).prop_map(Op::Append),
        1 => Just(Op::Compact),
        1 => Just(Op::Overwrite),
        1 => Just(Op::Abort),
        1 => Just(Op::ExpireOldest),
        3 => Just(Op::Poll),
    ]
}

fn arb_append_history() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![
            3 => (1u8..4).prop_map(Op::Append),
            1 => Just(Op::Abort),
            3 => Just(Op::Poll),
        ],
        1..40,
    )
}

/// Drives a `MemoryTable` while mirroring its live file names
struct History {
    table: Arc<MemoryTable>,
    live: Vec<String>,
    next_file: u32,
    clock: i64,
}

impl History {
    fn new() -> Self {
        Self {
            table: Arc::new(MemoryTable::new()),
            live: Vec::new(),
            next_file: 0,
            clock: 0,
        }
    }

    fn fresh_name(&mut self) -> String {
        self.next_file += 1;
        format!("f{:04}", self.next_file)
    }

    fn tick(&mut self) -> i64 {
        self.clock += 10;
        self.clock
    }

    /// Apply a table-changing op. Returns false for `Poll`.
    fn apply(&mut self, op: &Op) -> bool {
        match op {
            Op::Append(n) => {
                let names: Vec<String> = (0..*n).map(|_| self.fresh_name()).collect();
                let ts = self.tick();
                self.table
                    .append(ts, names.iter().map(|n| file(n)).collect())
                    .unwrap();
                self.live.extend(names);
            }
            Op::Compact if self.live.len() >= 2 => {
                let merged = self.fresh_name();
                let old: Vec<String> = self.live.drain(..2).collect();
                let retracted: Vec<&str> = old.iter().map(String::as_str).collect();
                let ts = self.tick();
                self.table
                    .compact(ts, vec![file(&merged)], &retracted)
                    .unwrap();
                self.live.push(merged);
            }
            Op::Overwrite if !self.live.is_empty() => {
                let replacement = self.fresh_name();
                let old = self.live.remove(0);
                let ts = self.tick();
                self.table
                    .overwrite(ts, vec![file(&replacement)], &[old.as_str()])
                    .unwrap();
                self.live.push(replacement);
            }
            Op::Abort => {
                self.table.abort_next_commit().unwrap();
            }
            Op::ExpireOldest => {
                let earliest = self.table.earliest_snapshot_id().unwrap();
                let latest = self.table.latest_snapshot_id().unwrap();
                if let (Some(earliest), Some(latest)) = (earliest, latest) {
                    if earliest < latest {
                        self.table.expire(earliest).unwrap();
                    }
                }
            }
            Op::Poll => return false,
            Op::Compact | Op::Overwrite => {}
        }
        true
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Emitted ids strictly increase, and every id skipped between two
    /// emissions is invisible in the store at the time of emission.
    #[test]
    fn prop_monotonic_and_no_skip(
        ops in prop::collection::vec(arb_op(), 1..60),
        delta in any::<bool>(),
    ) {
        let mut history = History::new();
        let mode = if delta { FollowUpMode::Delta } else { FollowUpMode::Append };
        let mut driver = ContinuousScanDriver::new(
            history.table.clone(),
            reader_for(&history.table),
            StartingScanner::Latest,
        )
        .unwrap()
        .with_follow_up(mode);

        let mut last: Option<SnapshotId> = None;
        for op in &ops {
            if history.apply(op) {
                continue;
            }
            let plan = match driver.poll() {
                Ok(plan) => plan,
                // the consumer fell behind retention; nothing was emitted
                Err(ScanError::SnapshotExpired { .. }) => break,
                Err(other) => return Err(TestCaseError::fail(format!("unexpected error {:?}", other))),
            };
            let Some(id) = plan.snapshot_id else { continue };

            if let Some(prev) = last {
                prop_assert!(id > prev, "emitted {} after {}", id, prev);
                for skipped in (prev + 1)..id {
                    prop_assert!(
                        !history.table.snapshot_exists(skipped).unwrap(),
                        "visible snapshot {} skipped between {} and {}",
                        skipped, prev, id
                    );
                }
            }
            prop_assert_eq!(driver.checkpoint(), Some(id));
            last = Some(id);
        }
    }

    /// Insert-only history: the seed plus every APPEND plan covers the final
    /// live set exactly once.
    #[test]
    fn prop_append_plans_cover_live_set_exactly_once(ops in arb_append_history()) {
        let mut history = History::new();
        let mut driver = ContinuousScanDriver::new(
            history.table.clone(),
            reader_for(&history.table),
            StartingScanner::Latest,
        )
        .unwrap();

        let mut seen: Vec<String> = Vec::new();
        let mut collect = |driver: &mut ContinuousScanDriver| -> bool {
            let plan = driver.poll().unwrap();
            for split in &plan.splits {
                seen.extend(split.added_files().map(|f| f.file_name.clone()));
            }
            plan.is_ready()
        };

        for op in &ops {
            if !history.apply(op) {
                collect(&mut driver);
            }
        }
        // drain whatever was committed after the last poll
        while collect(&mut driver) {}

        let unique: BTreeSet<&String> = seen.iter().collect();
        prop_assert_eq!(unique.len(), seen.len(), "a file was planned twice");
        let expected: BTreeSet<&String> = history.live.iter().collect();
        prop_assert_eq!(unique, expected);
    }
}
