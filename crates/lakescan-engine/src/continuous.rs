use std::time::Instant;

use lakescan_core::errors::ExError;
use lakescan_core::scan::{CancelToken, ContinuousScanDriver, DriverState};
use lakescan_core::{log_op_end, log_op_error, log_op_start, ScanPlan, SnapshotId};
use lakescan_core_types::{RequestContext, ScanId};

/// Handle for one streaming consumer.
///
/// Poll it from a caller-owned loop; the handle never blocks or sleeps.
/// Cancellation may come from any thread through [`ContinuousScan::cancel_token`].
pub struct ContinuousScan {
    ctx: RequestContext,
    driver: ContinuousScanDriver,
}

impl ContinuousScan {
    pub(crate) fn new(ctx: RequestContext, driver: ContinuousScanDriver) -> Self {
        Self { ctx, driver }
    }

    pub fn scan_id(&self) -> &ScanId {
        &self.ctx.scan_id
    }

    pub fn context(&self) -> &RequestContext {
        &self.ctx
    }

    /// Plan the next step, or [`ScanPlan::not_ready`] when nothing new is
    /// committed.
    ///
    /// # Errors
    ///
    /// - `ERR_CANCELLED` after cancellation, on every later poll too
    /// - `ERR_SNAPSHOT_EXPIRED` when the consumer fell behind retention;
    ///   restart from `earliest_snapshot_id` or from a new policy
    /// - `ERR_CATALOG_QUERY` when listing fails; polling again retries
    ///
    /// The checkpoint does not move on error.
    pub fn poll(&mut self) -> Result<ScanPlan, ExError> {
        let frontier = self.driver.checkpoint();
        log_op_start!(
            "poll",
            scan_id = self.ctx.scan_id.as_str(),
            frontier = frontier
        );
        let start = Instant::now();

        match self.driver.poll() {
            Ok(plan) => {
                log_op_end!(
                    "poll",
                    duration_ms = start.elapsed().as_millis() as u64,
                    scan_id = self.ctx.scan_id.as_str(),
                    snapshot_id = plan.snapshot_id,
                    split_count = plan.splits.len(),
                    file_count = plan.file_count()
                );
                Ok(plan)
            }
            Err(e) => {
                log_op_error!(
                    "poll",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    scan_id = self.ctx.scan_id.as_str(),
                    frontier = frontier
                );
                Err(ExError::from(e).with_op("poll"))
            }
        }
    }

    /// Stop the scan; every later poll fails with `ERR_CANCELLED`
    pub fn cancel(&mut self) {
        self.driver.cancel();
        tracing::debug!(scan_id = self.ctx.scan_id.as_str(), "continuous scan cancelled");
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.driver.cancel_token()
    }

    /// Last emitted snapshot id, to persist for [`crate::ScanService::restore_continuous`]
    pub fn checkpoint(&self) -> Option<SnapshotId> {
        self.driver.checkpoint()
    }

    pub fn state(&self) -> DriverState {
        self.driver.state()
    }
}
