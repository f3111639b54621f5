//! Scan planning: file classification, starting points and streaming.
//!
//! ```text
//! StartupPolicy -> StartingScanner -> SnapshotSplitReader -> FileCatalog
//!                        |                                        |
//!                  SnapshotStore <------ ContinuousScanDriver ----+
//! ```

pub mod continuous;
pub mod filter;
pub mod split_reader;
pub mod starting;

pub use continuous::{CancelToken, ContinuousScanDriver, DriverState, FollowUpMode};
pub use filter::{FilePredicate, ScanFilter};
pub use split_reader::SnapshotSplitReader;
pub use starting::{NotReadyReason, StartingOutcome, StartingScanner, StartupPolicy};
