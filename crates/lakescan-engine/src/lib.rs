//! lakescan engine - scan planning entry points
//!
//! Wires a `SnapshotStore` and a `FileCatalog` to the planners in
//! `lakescan-core` and owns operation-boundary logging and error
//! classification for callers.

pub mod continuous;
pub mod service;

pub use continuous::ContinuousScan;
pub use service::ScanService;
