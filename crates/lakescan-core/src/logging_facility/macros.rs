//! Operation-boundary logging macros
//!
//! The engine brackets each public planning operation (`plan_batch`,
//! `open_continuous`, `restore_continuous`, `poll`) with one `start` event
//! and exactly one `end` or `end_error` event, all at INFO/ERROR with
//! `component`, `op` and `event` set. Extra fields such as `scan_id`,
//! `snapshot_id`, `frontier` or `split_count` ride along as ordinary
//! tracing fields. Core planners never use these macros; their decisions
//! (not-ready reasons, skipped commits, gap diffs) are `debug!` only.
//!
//! `log_op_error!` converts its error into [`crate::errors::ExError`] so that
//! `err.code` is the stable `ERR_*` code a caller would see.
//!
//! Callers must depend on `tracing` and `lakescan-core-types`.

/// Log the start of an operation
///
/// # Example
///
/// ```
/// # use lakescan_core::log_op_start;
/// log_op_start!("plan_batch");
/// log_op_start!("plan_batch", startup_mode = "latest");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = lakescan_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = lakescan_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// # Example
///
/// ```
/// # use lakescan_core::log_op_end;
/// log_op_end!("poll", duration_ms = 3, snapshot_id = Some(12_i64), split_count = 2_usize);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = lakescan_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = lakescan_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation error
///
/// Accepts anything convertible into `ExError` (including `ScanError`).
///
/// # Example
///
/// ```
/// # use lakescan_core::{log_op_error, errors::ScanError};
/// let err = ScanError::SnapshotNotFound { snapshot_id: 7 };
/// log_op_error!("plan_batch", err, duration_ms = 1);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = lakescan_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?ex_err.kind(),
            err.code = ex_err.code(),
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = lakescan_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?ex_err.kind(),
            err.code = ex_err.code(),
            $($field)*
        );
    }};
}
