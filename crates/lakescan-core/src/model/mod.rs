//! Data model for scan planning
//!
//! All types are plain values: a `ScanPlan` holds no reference back into the
//! store and stays valid after the snapshot it names has been expired.

pub mod plan;
pub mod scan_kind;
pub mod snapshot;
pub mod split;

pub use plan::ScanPlan;
pub use scan_kind::ScanKind;
pub use snapshot::{CommitKind, Snapshot, SnapshotId};
pub use split::{DataFileMeta, FileChange, FileEntry, Split};
