//! Batch planning and continuous scan construction.
//!
//! ## Logging Ownership
//!
//! The engine layer owns lifecycle logging for planning operations:
//! - `log_op_start!` at entry
//! - `log_op_end!` on success
//! - `log_op_error!` on failure
//!
//! Core planners below this layer use only `tracing::debug!()`.

use std::sync::Arc;
use std::time::Instant;

use lakescan_core::errors::ExError;
use lakescan_core::scan::{ContinuousScanDriver, SnapshotSplitReader, StartingScanner};
use lakescan_core::{
    log_op_end, log_op_error, log_op_start, FileCatalog, FollowUpMode, ScanFilter, ScanOptions,
    ScanPlan, SnapshotId, SnapshotStore, StartupPolicy,
};
use lakescan_core_types::{RequestContext, TraceId};

use crate::continuous::ContinuousScan;

/// Entry point for planning scans over one table.
///
/// Cheap to clone; the store and catalog are shared, never copied.
#[derive(Clone)]
pub struct ScanService {
    store: Arc<dyn SnapshotStore>,
    catalog: Arc<dyn FileCatalog>,
    filter: ScanFilter,
    follow_up: FollowUpMode,
    trace_id: Option<TraceId>,
}

impl ScanService {
    pub fn new(store: Arc<dyn SnapshotStore>, catalog: Arc<dyn FileCatalog>) -> Self {
        Self {
            store,
            catalog,
            filter: ScanFilter::default(),
            follow_up: FollowUpMode::default(),
            trace_id: None,
        }
    }

    /// Service configured from table options (filter and follow-up mode).
    /// The startup policy is resolved separately with
    /// [`ScanOptions::startup_policy`].
    pub fn from_options(
        store: Arc<dyn SnapshotStore>,
        catalog: Arc<dyn FileCatalog>,
        options: &ScanOptions,
    ) -> Self {
        Self::new(store, catalog)
            .with_filter(options.filter())
            .with_follow_up(options.follow_up)
    }

    pub fn with_filter(mut self, filter: ScanFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_follow_up(mut self, mode: FollowUpMode) -> Self {
        self.follow_up = mode;
        self
    }

    /// Attach the caller's trace id to every scan opened by this service
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    fn reader(&self) -> SnapshotSplitReader {
        let mut reader = SnapshotSplitReader::new(self.catalog.clone());
        reader.with_filter(self.filter.clone());
        reader
    }

    fn context(&self) -> RequestContext {
        let ctx = RequestContext::new();
        match &self.trace_id {
            Some(trace_id) => ctx.with_trace_id(trace_id.clone()),
            None => ctx,
        }
    }

    /// Plan a one-shot scan.
    ///
    /// Returns [`ScanPlan::not_ready`] when the policy has nothing to read
    /// yet (empty table, no compaction, timestamp before the first commit).
    ///
    /// # Errors
    ///
    /// - `ERR_SNAPSHOT_NOT_FOUND` / `ERR_SNAPSHOT_EXPIRED` for explicit ids
    /// - `ERR_INVALID_INPUT` for a reversed incremental range
    /// - `ERR_CATALOG_QUERY` when listing fails; the whole plan fails
    pub fn plan_batch(&self, policy: &StartupPolicy) -> Result<ScanPlan, ExError> {
        let ctx = self.context();
        log_op_start!(
            "plan_batch",
            scan_id = ctx.scan_id.as_str(),
            startup_mode = policy.mode_name()
        );
        let start = Instant::now();

        let result = StartingScanner::new(policy)
            .and_then(|scanner| scanner.get_plan(self.store.as_ref(), &mut self.reader()))
            .map(|outcome| outcome.into_plan());

        match result {
            Ok(plan) => {
                log_op_end!(
                    "plan_batch",
                    duration_ms = start.elapsed().as_millis() as u64,
                    scan_id = ctx.scan_id.as_str(),
                    snapshot_id = plan.snapshot_id,
                    split_count = plan.splits.len(),
                    file_count = plan.file_count()
                );
                Ok(plan)
            }
            Err(e) => {
                log_op_error!(
                    "plan_batch",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    scan_id = ctx.scan_id.as_str()
                );
                Err(ExError::from(e).with_op("plan_batch"))
            }
        }
    }

    /// Open a streaming scan. Nothing is planned until the first poll.
    ///
    /// # Errors
    ///
    /// `ERR_INVALID_INPUT` for bounded (incremental) policies.
    pub fn open_continuous(&self, policy: &StartupPolicy) -> Result<ContinuousScan, ExError> {
        self.build_continuous("open_continuous", policy, None)
    }

    /// Reopen a streaming scan after `checkpoint`, the last snapshot id a
    /// previous consumer emitted. The first poll plans the snapshot after it.
    ///
    /// # Errors
    ///
    /// `ERR_INVALID_INPUT` for bounded (incremental) policies.
    pub fn restore_continuous(
        &self,
        policy: &StartupPolicy,
        checkpoint: SnapshotId,
    ) -> Result<ContinuousScan, ExError> {
        self.build_continuous("restore_continuous", policy, Some(checkpoint))
    }

    fn build_continuous(
        &self,
        op: &'static str,
        policy: &StartupPolicy,
        checkpoint: Option<SnapshotId>,
    ) -> Result<ContinuousScan, ExError> {
        let ctx = self.context();
        log_op_start!(
            op,
            scan_id = ctx.scan_id.as_str(),
            startup_mode = policy.mode_name(),
            follow_up = self.follow_up.as_str(),
            frontier = checkpoint
        );
        let start = Instant::now();

        let result = StartingScanner::new(policy).and_then(|scanner| match checkpoint {
            Some(frontier) => {
                ContinuousScanDriver::restore(self.store.clone(), self.reader(), scanner, frontier)
            }
            None => ContinuousScanDriver::new(self.store.clone(), self.reader(), scanner),
        });

        match result {
            Ok(driver) => {
                log_op_end!(
                    op,
                    duration_ms = start.elapsed().as_millis() as u64,
                    scan_id = ctx.scan_id.as_str()
                );
                Ok(ContinuousScan::new(ctx, driver.with_follow_up(self.follow_up)))
            }
            Err(e) => {
                log_op_error!(
                    op,
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    scan_id = ctx.scan_id.as_str()
                );
                Err(ExError::from(e).with_op(op))
            }
        }
    }
}
