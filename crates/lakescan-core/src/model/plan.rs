use crate::errors::Result;
use crate::model::{ScanKind, SnapshotId, Split};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Result of planning one scan step.
///
/// `snapshot_id == None` with no splits is the "nothing available yet"
/// sentinel. An empty table yields `Some(id)` with zero splits instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanPlan {
    pub snapshot_id: Option<SnapshotId>,
    /// Scan kind the splits were produced with; absent when not ready
    pub kind: Option<ScanKind>,
    pub splits: Vec<Split>,
}

impl ScanPlan {
    pub fn new(snapshot_id: SnapshotId, kind: ScanKind, splits: Vec<Split>) -> Self {
        Self {
            snapshot_id: Some(snapshot_id),
            kind: Some(kind),
            splits,
        }
    }

    /// Plan for a snapshot that is acknowledged but contributes no files
    /// (e.g. a compaction commit skipped by an append-only consumer).
    pub fn empty(snapshot_id: SnapshotId, kind: ScanKind) -> Self {
        Self::new(snapshot_id, kind, Vec::new())
    }

    /// The canonical NOT_READY value
    pub fn not_ready() -> Self {
        Self {
            snapshot_id: None,
            kind: None,
            splits: Vec::new(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.snapshot_id.is_some()
    }

    pub fn file_count(&self) -> usize {
        self.splits.iter().map(|s| s.entries.len()).sum()
    }

    /// SHA-256 over the canonical JSON of `(snapshot_id, splits)`.
    ///
    /// Two plans for the same snapshot against an unchanged store have the
    /// same digest; callers use it to verify replay after a restart.
    pub fn digest(&self) -> Result<String> {
        let canonical = serde_json::to_vec(&(self.snapshot_id, &self.splits))?;
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        Ok(hex::encode(hasher.finalize()))
    }
}
