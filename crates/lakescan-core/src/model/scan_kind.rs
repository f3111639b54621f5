use serde::{Deserialize, Serialize};

/// Which subset of a snapshot's files a scan returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanKind {
    /// Every live file as of the snapshot
    All,
    /// Only files added since the previous snapshot
    Append,
    /// Added and retracted files, for change-log reconstruction
    Delta,
}

impl ScanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanKind::All => "ALL",
            ScanKind::Append => "APPEND",
            ScanKind::Delta => "DELTA",
        }
    }

    /// Whether this kind is relative to a predecessor snapshot
    pub fn is_incremental(&self) -> bool {
        !matches!(self, ScanKind::All)
    }
}

impl std::fmt::Display for ScanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
