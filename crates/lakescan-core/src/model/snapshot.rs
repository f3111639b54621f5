use serde::{Deserialize, Serialize};

/// Snapshot identifier. Ids increase monotonically with commit order and are
/// the only source of truth for "before" and "after"; timestamps are not.
pub type SnapshotId = i64;

/// Kind of commit that produced a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommitKind {
    /// New files added, nothing rewritten
    Append,
    /// Files rewritten without changing logical content
    Compact,
    /// Logical content replaced (adds and removes)
    Overwrite,
}

impl CommitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitKind::Append => "APPEND",
            CommitKind::Compact => "COMPACT",
            CommitKind::Overwrite => "OVERWRITE",
        }
    }
}

impl std::fmt::Display for CommitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable snapshot metadata.
///
/// Once an id is visible its content never changes; it can only disappear
/// entirely through expiration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    /// Commit time in milliseconds since the epoch
    pub timestamp_millis: i64,
    pub commit_kind: CommitKind,
    /// Opaque reference to the manifest listing live files at this snapshot
    pub manifest_ref: String,
}

impl Snapshot {
    pub fn new(id: SnapshotId, timestamp_millis: i64, commit_kind: CommitKind) -> Self {
        Self {
            id,
            timestamp_millis,
            commit_kind,
            manifest_ref: format!("manifest-list-{}", id),
        }
    }

    pub fn is_compaction(&self) -> bool {
        self.commit_kind == CommitKind::Compact
    }
}
