//! lakescan core - snapshot scan planning kernel
//!
//! This crate decides which snapshot(s) and which data files a read must
//! consume, given an append-only history of immutable table snapshots:
//! - Snapshot, split and plan models
//! - `SnapshotStore` / `FileCatalog` seams plus an in-memory table
//! - `SnapshotSplitReader` for ALL / APPEND / DELTA file classification
//! - Starting scanners, one per startup policy
//! - `ContinuousScanDriver` for streaming consumption
//! - Scan options parsing
//!
//! The crate performs no I/O of its own and starts no threads.

pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod options;
pub mod scan;
pub mod store;

// Re-export commonly used types
pub use errors::{ExError, ExErrorKind, Result, ScanError};
pub use model::{
    CommitKind, DataFileMeta, FileChange, FileEntry, ScanKind, ScanPlan, Snapshot, SnapshotId,
    Split,
};
pub use options::{ScanMode, ScanOptions};
pub use scan::{
    CancelToken, ContinuousScanDriver, DriverState, FollowUpMode, NotReadyReason, ScanFilter,
    SnapshotSplitReader, StartingOutcome, StartingScanner, StartupPolicy,
};
pub use store::{FileCatalog, MemoryTable, SnapshotStore};
