//! Consumed interfaces: the snapshot log and the file catalog.
//!
//! Both are read-only from the planner's point of view and may be shared by
//! any number of concurrent scans. Every call is a point-in-time read; the
//! planner never caches answers across calls.
//!
//! ## Responsibilities
//!
//! - `SnapshotStore`: which snapshot ids exist, their metadata, and the
//!   well-known positions (earliest, latest, latest compacted)
//! - `FileCatalog`: which files a snapshot contributes for a scan kind
//!
//! ## Non-Responsibilities
//!
//! - Snapshot and manifest persistence (owned by the table format writer)

pub mod memory;

pub use memory::MemoryTable;

use crate::errors::{Result, ScanError};
use crate::model::{ScanKind, Snapshot, SnapshotId, Split};
use crate::scan::ScanFilter;

/// Append-only log of snapshot metadata
pub trait SnapshotStore: Send + Sync {
    fn latest_snapshot_id(&self) -> Result<Option<SnapshotId>>;

    fn earliest_snapshot_id(&self) -> Result<Option<SnapshotId>>;

    /// Latest snapshot produced by a compaction commit
    fn latest_compacted_snapshot_id(&self) -> Result<Option<SnapshotId>>;

    fn snapshot_exists(&self, id: SnapshotId) -> Result<bool>;

    /// Snapshot metadata.
    ///
    /// # Errors
    ///
    /// `SnapshotExpired` or `SnapshotNotFound` when `id` is not visible.
    fn snapshot(&self, id: SnapshotId) -> Result<Snapshot>;

    /// Latest snapshot whose commit timestamp is `<= timestamp_millis`.
    ///
    /// Stores must keep commit timestamps non-decreasing in id order; the
    /// answer is undefined otherwise.
    fn snapshot_at_or_before(&self, timestamp_millis: i64) -> Result<Option<SnapshotId>>;

    /// Whether `id` was committed and later removed by retention.
    ///
    /// Must be exact: an id that was never committed (an aborted commit) is
    /// not expired, even when it lies below the earliest visible snapshot.
    /// The continuous driver plans by diff only across expired ids.
    fn is_expired(&self, id: SnapshotId) -> Result<bool>;
}

/// Enumerates the splits a snapshot contributes for a scan kind
pub trait FileCatalog: Send + Sync {
    /// - `All`: every live file at `id`
    /// - `Append`: files added by commit `id` relative to `id - 1`
    /// - `Delta`: files added and retracted by commit `id`
    ///
    /// `filter` is evaluated by the catalog so that excluded partitions and
    /// buckets are never listed.
    ///
    /// # Errors
    ///
    /// `SnapshotExpired` when `id` has been removed by retention,
    /// `CatalogQuery` on listing failures.
    fn files_for(&self, id: SnapshotId, kind: ScanKind, filter: &ScanFilter) -> Result<Vec<Split>>;
}

/// Classify an id the store does not hold as expired or never committed
pub fn missing_snapshot_error(store: &dyn SnapshotStore, id: SnapshotId) -> Result<ScanError> {
    if store.is_expired(id)? {
        return Ok(ScanError::SnapshotExpired {
            requested: id,
            earliest: store.earliest_snapshot_id()?,
        });
    }
    Ok(ScanError::SnapshotNotFound { snapshot_id: id })
}

/// Ensure `id` is visible in the store.
///
/// # Errors
///
/// `SnapshotExpired` or `SnapshotNotFound` as classified by
/// [`missing_snapshot_error`].
pub fn require_snapshot(store: &dyn SnapshotStore, id: SnapshotId) -> Result<()> {
    if store.snapshot_exists(id)? {
        return Ok(());
    }
    Err(missing_snapshot_error(store, id)?)
}
