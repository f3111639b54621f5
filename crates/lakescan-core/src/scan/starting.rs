//! Starting scanners: where a scan begins.
//!
//! One variant per [`StartupPolicy`]. A scanner either produces the first
//! plan or reports why nothing can be planned yet; "not ready" is a value,
//! never an error, so a caller can wait and try again.

use std::fmt;

use crate::errors::{Result, ScanError};
use crate::model::{ScanKind, ScanPlan, SnapshotId};
use crate::scan::SnapshotSplitReader;
use crate::store::{require_snapshot, SnapshotStore};

/// Startup semantics chosen once per scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupPolicy {
    /// Everything live at the earliest snapshot
    Full,
    /// Everything live at the latest compaction snapshot
    CompactedFull,
    Latest,
    FromSnapshot(SnapshotId),
    FromTimestamp {
        millis: i64,
        fallback_to_earliest: bool,
    },
    /// Changes over the half-open range `(from, to]`
    Incremental { from: SnapshotId, to: SnapshotId },
}

impl StartupPolicy {
    /// Mode name as written in `scan.mode`
    pub fn mode_name(&self) -> &'static str {
        match self {
            StartupPolicy::Full => "full",
            StartupPolicy::CompactedFull => "compacted-full",
            StartupPolicy::Latest => "latest",
            StartupPolicy::FromSnapshot(_) => "from-snapshot",
            StartupPolicy::FromTimestamp { .. } => "from-timestamp",
            StartupPolicy::Incremental { .. } => "incremental",
        }
    }

    /// Bounded policies cannot seed a continuous scan
    pub fn is_bounded(&self) -> bool {
        matches!(self, StartupPolicy::Incremental { .. })
    }
}

impl fmt::Display for StartupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mode_name())
    }
}

/// Why a scanner could not produce a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotReadyReason {
    /// The table has no visible snapshot
    NoSnapshot,
    /// Snapshots exist but no compaction has committed yet
    NoCompactedSnapshot,
    NoSnapshotAtOrBefore(i64),
}

impl fmt::Display for NotReadyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotReadyReason::NoSnapshot => f.write_str("table has no snapshot"),
            NotReadyReason::NoCompactedSnapshot => {
                f.write_str("table has snapshots but none from a compaction")
            }
            NotReadyReason::NoSnapshotAtOrBefore(millis) => {
                write!(f, "no snapshot committed at or before {}", millis)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartingOutcome {
    Ready(ScanPlan),
    NotReady(NotReadyReason),
}

impl StartingOutcome {
    /// Collapse into a plan, mapping "not ready" to [`ScanPlan::not_ready`]
    pub fn into_plan(self) -> ScanPlan {
        match self {
            StartingOutcome::Ready(plan) => plan,
            StartingOutcome::NotReady(_) => ScanPlan::not_ready(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, StartingOutcome::Ready(_))
    }
}

/// Validated starting scanner for one policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartingScanner {
    Full,
    CompactedFull,
    Latest,
    FromSnapshot {
        snapshot_id: SnapshotId,
    },
    FromTimestamp {
        millis: i64,
        fallback_to_earliest: bool,
    },
    Incremental {
        from: SnapshotId,
        to: SnapshotId,
    },
}

impl StartingScanner {
    /// # Errors
    ///
    /// `InvalidInput` for an incremental range whose start exceeds its end.
    pub fn new(policy: &StartupPolicy) -> Result<Self> {
        Ok(match *policy {
            StartupPolicy::Full => StartingScanner::Full,
            StartupPolicy::CompactedFull => StartingScanner::CompactedFull,
            StartupPolicy::Latest => StartingScanner::Latest,
            StartupPolicy::FromSnapshot(snapshot_id) => StartingScanner::FromSnapshot { snapshot_id },
            StartupPolicy::FromTimestamp {
                millis,
                fallback_to_earliest,
            } => StartingScanner::FromTimestamp {
                millis,
                fallback_to_earliest,
            },
            StartupPolicy::Incremental { from, to } => {
                if from > to {
                    return Err(ScanError::invalid_input(format!(
                        "incremental range start {} is after end {}",
                        from, to
                    )));
                }
                StartingScanner::Incremental { from, to }
            }
        })
    }

    pub fn mode_name(&self) -> &'static str {
        match self {
            StartingScanner::Full => "full",
            StartingScanner::CompactedFull => "compacted-full",
            StartingScanner::Latest => "latest",
            StartingScanner::FromSnapshot { .. } => "from-snapshot",
            StartingScanner::FromTimestamp { .. } => "from-timestamp",
            StartingScanner::Incremental { .. } => "incremental",
        }
    }

    /// Plan the first step of a scan.
    ///
    /// The reader keeps its filter; kind and snapshot are overwritten.
    ///
    /// # Errors
    ///
    /// - `SnapshotNotFound` / `SnapshotExpired` for an explicit id that is
    ///   not visible
    /// - anything the store or catalog reports
    pub fn get_plan(
        &self,
        store: &dyn SnapshotStore,
        reader: &mut SnapshotSplitReader,
    ) -> Result<StartingOutcome> {
        let outcome = match *self {
            StartingScanner::Full => match store.earliest_snapshot_id()? {
                Some(id) => full_at(reader, id)?,
                None => StartingOutcome::NotReady(NotReadyReason::NoSnapshot),
            },
            StartingScanner::CompactedFull => match store.latest_compacted_snapshot_id()? {
                Some(id) => full_at(reader, id)?,
                None if store.latest_snapshot_id()?.is_some() => {
                    StartingOutcome::NotReady(NotReadyReason::NoCompactedSnapshot)
                }
                None => StartingOutcome::NotReady(NotReadyReason::NoSnapshot),
            },
            StartingScanner::Latest => match store.latest_snapshot_id()? {
                Some(id) => full_at(reader, id)?,
                None => StartingOutcome::NotReady(NotReadyReason::NoSnapshot),
            },
            StartingScanner::FromSnapshot { snapshot_id } => {
                require_snapshot(store, snapshot_id)?;
                full_at(reader, snapshot_id)?
            }
            StartingScanner::FromTimestamp {
                millis,
                fallback_to_earliest,
            } => match store.snapshot_at_or_before(millis)? {
                Some(id) => full_at(reader, id)?,
                None if fallback_to_earliest => match store.earliest_snapshot_id()? {
                    Some(id) => {
                        tracing::debug!(
                            timestamp_millis = millis,
                            snapshot_id = id,
                            "no snapshot at or before timestamp, falling back to earliest"
                        );
                        full_at(reader, id)?
                    }
                    None => StartingOutcome::NotReady(NotReadyReason::NoSnapshot),
                },
                None => StartingOutcome::NotReady(NotReadyReason::NoSnapshotAtOrBefore(millis)),
            },
            StartingScanner::Incremental { from, to } => {
                require_snapshot(store, from)?;
                require_snapshot(store, to)?;
                if from == to {
                    StartingOutcome::Ready(ScanPlan::empty(to, ScanKind::Delta))
                } else {
                    let splits = reader
                        .with_kind(ScanKind::Delta)
                        .with_range(from, to)
                        .splits()?;
                    StartingOutcome::Ready(ScanPlan::new(to, ScanKind::Delta, splits))
                }
            }
        };

        if let StartingOutcome::NotReady(reason) = &outcome {
            tracing::debug!(
                startup_mode = self.mode_name(),
                reason = %reason,
                "starting scanner not ready"
            );
        }
        Ok(outcome)
    }
}

fn full_at(reader: &mut SnapshotSplitReader, id: SnapshotId) -> Result<StartingOutcome> {
    let splits = reader.with_kind(ScanKind::All).with_snapshot(id).splits()?;
    Ok(StartingOutcome::Ready(ScanPlan::new(id, ScanKind::All, splits)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DataFileMeta;
    use crate::store::MemoryTable;
    use std::sync::Arc;

    fn file(name: &str) -> DataFileMeta {
        DataFileMeta::new(name, "p=0", 0)
    }

    fn plan(scanner: StartingScanner, table: &Arc<MemoryTable>) -> Result<StartingOutcome> {
        let mut reader = SnapshotSplitReader::new(table.clone());
        scanner.get_plan(table.as_ref(), &mut reader)
    }

    #[test]
    fn test_reversed_incremental_range_is_rejected() {
        let err = StartingScanner::new(&StartupPolicy::Incremental { from: 5, to: 3 }).unwrap_err();
        assert!(matches!(err, ScanError::InvalidInput { .. }));
    }

    #[test]
    fn test_full_reads_earliest_snapshot() {
        let table = Arc::new(MemoryTable::new());
        table.append(1, vec![file("a")]).unwrap();
        table.append(2, vec![file("b")]).unwrap();

        match plan(StartingScanner::Full, &table).unwrap() {
            StartingOutcome::Ready(plan) => {
                assert_eq!(plan.snapshot_id, Some(1));
                assert_eq!(plan.kind, Some(ScanKind::All));
                assert_eq!(plan.file_count(), 1);
            }
            other => panic!("expected ready, got {:?}", other),
        }
    }

    #[test]
    fn test_compacted_full_distinguishes_empty_and_uncompacted() {
        let table = Arc::new(MemoryTable::new());
        assert_eq!(
            plan(StartingScanner::CompactedFull, &table).unwrap(),
            StartingOutcome::NotReady(NotReadyReason::NoSnapshot)
        );

        table.append(1, vec![file("a")]).unwrap();
        assert_eq!(
            plan(StartingScanner::CompactedFull, &table).unwrap(),
            StartingOutcome::NotReady(NotReadyReason::NoCompactedSnapshot)
        );
    }

    #[test]
    fn test_from_timestamp_fallback() {
        let table = Arc::new(MemoryTable::new());
        table.append(1_000, vec![file("a")]).unwrap();

        let strict = StartingScanner::FromTimestamp {
            millis: 500,
            fallback_to_earliest: false,
        };
        assert_eq!(
            plan(strict, &table).unwrap(),
            StartingOutcome::NotReady(NotReadyReason::NoSnapshotAtOrBefore(500))
        );

        let lenient = StartingScanner::FromTimestamp {
            millis: 500,
            fallback_to_earliest: true,
        };
        let outcome = plan(lenient, &table).unwrap();
        assert_eq!(outcome.into_plan().snapshot_id, Some(1));
    }

    #[test]
    fn test_incremental_same_endpoints_is_empty_delta() {
        let table = Arc::new(MemoryTable::new());
        table.append(1, vec![file("a")]).unwrap();

        let outcome = plan(StartingScanner::Incremental { from: 1, to: 1 }, &table).unwrap();
        assert_eq!(
            outcome,
            StartingOutcome::Ready(ScanPlan::empty(1, ScanKind::Delta))
        );
    }

    #[test]
    fn test_not_ready_collapses_to_sentinel() {
        let outcome = StartingOutcome::NotReady(NotReadyReason::NoSnapshot);
        assert!(!outcome.is_ready());
        assert_eq!(outcome.into_plan(), ScanPlan::not_ready());
    }
}
