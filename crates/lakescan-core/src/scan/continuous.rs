//! Continuous (streaming) scan driver.
//!
//! A driver seeds from a starting scanner, then follows the snapshot log one
//! snapshot per poll. Every emitted plan carries a snapshot id strictly
//! greater than the previous one, and every committed id between two
//! emitted ids is either emitted (possibly with no splits) or folded into a
//! diff because it was expired.
//!
//! The driver owns no threads. The caller decides how often to poll.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::errors::{Result, ScanError};
use crate::model::{CommitKind, ScanKind, ScanPlan, SnapshotId};
use crate::scan::{SnapshotSplitReader, StartingOutcome, StartingScanner};
use crate::store::SnapshotStore;

/// Cooperative cancellation flag shared between a driver and its owner
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How snapshots after the seed are planned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FollowUpMode {
    /// Insert-only consumers: plan APPEND commits, acknowledge the rest empty
    #[default]
    Append,
    /// Changelog consumers: plan APPEND and OVERWRITE commits as DELTA
    Delta,
}

impl FollowUpMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FollowUpMode::Append => "append",
            FollowUpMode::Delta => "delta",
        }
    }

    pub fn scan_kind(&self) -> ScanKind {
        match self {
            FollowUpMode::Append => ScanKind::Append,
            FollowUpMode::Delta => ScanKind::Delta,
        }
    }

    /// Whether a commit of this kind contributes splits. Compactions never
    /// change logical content, so both modes acknowledge them empty.
    pub fn plans(&self, commit_kind: CommitKind) -> bool {
        match (self, commit_kind) {
            (_, CommitKind::Compact) => false,
            (FollowUpMode::Append, CommitKind::Overwrite) => false,
            _ => true,
        }
    }
}

impl FromStr for FollowUpMode {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "append" => Ok(FollowUpMode::Append),
            "delta" => Ok(FollowUpMode::Delta),
            other => Err(ScanError::invalid_option(
                "scan.follow-up",
                format!("expected 'append' or 'delta', got '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// No starting snapshot chosen yet
    Seeding,
    /// `frontier` is the last emitted snapshot id
    Streaming { frontier: SnapshotId },
    Stopped,
}

pub struct ContinuousScanDriver {
    store: Arc<dyn SnapshotStore>,
    reader: SnapshotSplitReader,
    scanner: StartingScanner,
    follow_up: FollowUpMode,
    state: DriverState,
    cancel: CancelToken,
}

impl ContinuousScanDriver {
    /// # Errors
    ///
    /// `InvalidInput` when the scanner is bounded (incremental).
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        reader: SnapshotSplitReader,
        scanner: StartingScanner,
    ) -> Result<Self> {
        if let StartingScanner::Incremental { from, to } = scanner {
            return Err(ScanError::invalid_input(format!(
                "incremental range ({}, {}] is bounded and cannot drive a continuous scan",
                from, to
            )));
        }
        Ok(Self {
            store,
            reader,
            scanner,
            follow_up: FollowUpMode::default(),
            state: DriverState::Seeding,
            cancel: CancelToken::new(),
        })
    }

    /// Resume after `checkpoint`, the last snapshot id a previous driver
    /// emitted. No seed plan is produced.
    ///
    /// # Errors
    ///
    /// Same as [`ContinuousScanDriver::new`].
    pub fn restore(
        store: Arc<dyn SnapshotStore>,
        reader: SnapshotSplitReader,
        scanner: StartingScanner,
        checkpoint: SnapshotId,
    ) -> Result<Self> {
        let mut driver = Self::new(store, reader, scanner)?;
        driver.state = DriverState::Streaming {
            frontier: checkpoint,
        };
        Ok(driver)
    }

    pub fn with_follow_up(mut self, mode: FollowUpMode) -> Self {
        self.follow_up = mode;
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn follow_up(&self) -> FollowUpMode {
        self.follow_up
    }

    /// Last emitted snapshot id; persist it to restore later
    pub fn checkpoint(&self) -> Option<SnapshotId> {
        match self.state {
            DriverState::Streaming { frontier } => Some(frontier),
            DriverState::Seeding | DriverState::Stopped => None,
        }
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.state = DriverState::Stopped;
    }

    /// Plan the next step.
    ///
    /// Returns [`ScanPlan::not_ready`] when there is nothing new. On error
    /// the driver state is unchanged, so the same poll can be retried.
    ///
    /// # Errors
    ///
    /// - `Cancelled` once the token fires; the driver is stopped for good
    /// - `SnapshotExpired` when the snapshots after the frontier are gone
    /// - anything the store or catalog reports
    pub fn poll(&mut self) -> Result<ScanPlan> {
        self.ensure_running()?;
        match self.state {
            DriverState::Seeding => self.seed(),
            DriverState::Streaming { frontier } => self.advance(frontier),
            DriverState::Stopped => Err(ScanError::Cancelled),
        }
    }

    fn ensure_running(&mut self) -> Result<()> {
        if self.cancel.is_cancelled() {
            self.state = DriverState::Stopped;
        }
        if self.state == DriverState::Stopped {
            return Err(ScanError::Cancelled);
        }
        Ok(())
    }

    fn seed(&mut self) -> Result<ScanPlan> {
        let plan = match self.scanner.get_plan(self.store.as_ref(), &mut self.reader)? {
            StartingOutcome::NotReady(_) => return Ok(ScanPlan::not_ready()),
            StartingOutcome::Ready(plan) => plan,
        };
        let frontier = plan.snapshot_id.ok_or_else(|| ScanError::Internal {
            message: "starting scanner produced a ready plan without a snapshot".to_string(),
        })?;
        self.emit(frontier, plan)
    }

    fn advance(&mut self, frontier: SnapshotId) -> Result<ScanPlan> {
        let latest = match self.store.latest_snapshot_id()? {
            Some(latest) if latest > frontier => latest,
            _ => return Ok(ScanPlan::not_ready()),
        };

        let Some(next) = self.next_visible(frontier, latest)? else {
            return Ok(ScanPlan::not_ready());
        };

        let kind = self.follow_up.scan_kind();
        let plan = if self.expired_between(frontier, next)? {
            tracing::debug!(
                frontier,
                snapshot_id = next,
                scan_kind = %kind,
                "snapshots after frontier were expired, planning by diff"
            );
            let splits = self.reader.with_kind(kind).with_range(frontier, next).splits()?;
            ScanPlan::new(next, kind, splits)
        } else {
            let commit_kind = self.store.snapshot(next)?.commit_kind;
            if self.follow_up.plans(commit_kind) {
                let splits = self.reader.with_kind(kind).with_snapshot(next).splits()?;
                ScanPlan::new(next, kind, splits)
            } else {
                tracing::debug!(
                    snapshot_id = next,
                    commit_kind = %commit_kind,
                    follow_up = self.follow_up.as_str(),
                    "commit kind not planned by follow-up mode, emitting empty plan"
                );
                ScanPlan::empty(next, kind)
            }
        };
        self.emit(next, plan)
    }

    /// Smallest visible id in `(frontier, latest]`. Ids below the earliest
    /// visible snapshot are not probed.
    fn next_visible(&self, frontier: SnapshotId, latest: SnapshotId) -> Result<Option<SnapshotId>> {
        let start = match self.store.earliest_snapshot_id()? {
            Some(earliest) => earliest.max(frontier + 1),
            None => return Ok(None),
        };
        for id in start..=latest {
            if self.store.snapshot_exists(id)? {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    /// Whether any id strictly between `frontier` and `next` was committed
    /// and then expired. Ids that were never committed do not count.
    fn expired_between(&self, frontier: SnapshotId, next: SnapshotId) -> Result<bool> {
        for id in (frontier + 1)..next {
            if self.store.is_expired(id)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn emit(&mut self, frontier: SnapshotId, plan: ScanPlan) -> Result<ScanPlan> {
        // the plan is dropped, not emitted, if cancellation raced the query
        self.ensure_running()?;
        self.state = DriverState::Streaming { frontier };
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DataFileMeta;
    use crate::store::MemoryTable;

    fn file(name: &str) -> DataFileMeta {
        DataFileMeta::new(name, "p=0", 0)
    }

    fn driver(table: &Arc<MemoryTable>, scanner: StartingScanner) -> ContinuousScanDriver {
        let reader = SnapshotSplitReader::new(table.clone());
        ContinuousScanDriver::new(table.clone(), reader, scanner).unwrap()
    }

    #[test]
    fn test_follow_up_mode_plans() {
        assert!(FollowUpMode::Append.plans(CommitKind::Append));
        assert!(!FollowUpMode::Append.plans(CommitKind::Overwrite));
        assert!(!FollowUpMode::Append.plans(CommitKind::Compact));
        assert!(FollowUpMode::Delta.plans(CommitKind::Overwrite));
        assert!(!FollowUpMode::Delta.plans(CommitKind::Compact));
    }

    #[test]
    fn test_follow_up_mode_parse() {
        assert_eq!("Delta".parse::<FollowUpMode>().unwrap(), FollowUpMode::Delta);
        assert!(matches!(
            "changelog".parse::<FollowUpMode>().unwrap_err(),
            ScanError::InvalidOption { .. }
        ));
    }

    #[test]
    fn test_incremental_cannot_drive_continuous_scan() {
        let table = Arc::new(MemoryTable::new());
        let reader = SnapshotSplitReader::new(table.clone());
        let result = ContinuousScanDriver::new(
            table,
            reader,
            StartingScanner::Incremental { from: 1, to: 2 },
        );
        assert!(matches!(result, Err(ScanError::InvalidInput { .. })));
    }

    #[test]
    fn test_seeding_waits_for_first_snapshot() {
        let table = Arc::new(MemoryTable::new());
        let mut driver = driver(&table, StartingScanner::Latest);

        assert_eq!(driver.poll().unwrap(), ScanPlan::not_ready());
        assert_eq!(driver.state(), DriverState::Seeding);

        table.append(1, vec![file("a")]).unwrap();
        let seed = driver.poll().unwrap();
        assert_eq!(seed.snapshot_id, Some(1));
        assert_eq!(driver.checkpoint(), Some(1));
    }

    #[test]
    fn test_compaction_is_acknowledged_empty() {
        let table = Arc::new(MemoryTable::new());
        table.append(1, vec![file("a"), file("b")]).unwrap();
        let mut driver = driver(&table, StartingScanner::Latest);
        driver.poll().unwrap();

        table.compact(2, vec![file("ab")], &["a", "b"]).unwrap();
        let plan = driver.poll().unwrap();
        assert_eq!(plan, ScanPlan::empty(2, ScanKind::Append));
        assert_eq!(driver.checkpoint(), Some(2));
    }

    #[test]
    fn test_cancel_stops_driver_for_good() {
        let table = Arc::new(MemoryTable::new());
        table.append(1, vec![file("a")]).unwrap();
        let mut driver = driver(&table, StartingScanner::Latest);
        driver.poll().unwrap();

        driver.cancel_token().cancel();
        assert_eq!(driver.poll().unwrap_err(), ScanError::Cancelled);
        assert_eq!(driver.state(), DriverState::Stopped);

        table.append(2, vec![file("b")]).unwrap();
        assert_eq!(driver.poll().unwrap_err(), ScanError::Cancelled);
    }

    #[test]
    fn test_failed_poll_keeps_frontier() {
        let table = Arc::new(MemoryTable::new());
        table.append(1, vec![file("a")]).unwrap();
        let mut driver = driver(&table, StartingScanner::Latest);
        driver.poll().unwrap();

        table.append(2, vec![file("b")]).unwrap();
        table.fail_next_query("listing timed out").unwrap();
        assert!(matches!(
            driver.poll().unwrap_err(),
            ScanError::CatalogQuery { .. }
        ));
        assert_eq!(driver.checkpoint(), Some(1));

        assert_eq!(driver.poll().unwrap().snapshot_id, Some(2));
    }
}
