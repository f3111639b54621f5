use serde::{Deserialize, Serialize};

/// Metadata of one physical data file. `file_name` is its identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataFileMeta {
    pub file_name: String,
    pub partition: String,
    pub bucket: u32,
    pub row_count: u64,
    pub file_size: u64,
}

impl DataFileMeta {
    pub fn new(file_name: impl Into<String>, partition: impl Into<String>, bucket: u32) -> Self {
        Self {
            file_name: file_name.into(),
            partition: partition.into(),
            bucket,
            row_count: 0,
            file_size: 0,
        }
    }

    pub fn with_stats(mut self, row_count: u64, file_size: u64) -> Self {
        self.row_count = row_count;
        self.file_size = file_size;
        self
    }
}

/// Whether a file enters or leaves the table in a change set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileChange {
    Add,
    Retract,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileEntry {
    pub change: FileChange,
    pub file: DataFileMeta,
}

impl FileEntry {
    pub fn added(file: DataFileMeta) -> Self {
        Self {
            change: FileChange::Add,
            file,
        }
    }

    pub fn retracted(file: DataFileMeta) -> Self {
        Self {
            change: FileChange::Retract,
            file,
        }
    }
}

/// One file group (partition + bucket) handed to a downstream reader.
///
/// Entry order is whatever the catalog produced; this subsystem never
/// reorders entries inside a split.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Split {
    pub partition: String,
    pub bucket: u32,
    pub entries: Vec<FileEntry>,
}

impl Split {
    pub fn new(partition: impl Into<String>, bucket: u32, entries: Vec<FileEntry>) -> Self {
        Self {
            partition: partition.into(),
            bucket,
            entries,
        }
    }

    /// Ordering key used for deterministic plans
    pub fn group_key(&self) -> (&str, u32) {
        (self.partition.as_str(), self.bucket)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn added_files(&self) -> impl Iterator<Item = &DataFileMeta> {
        self.entries
            .iter()
            .filter(|e| e.change == FileChange::Add)
            .map(|e| &e.file)
    }

    pub fn retracted_files(&self) -> impl Iterator<Item = &DataFileMeta> {
        self.entries
            .iter()
            .filter(|e| e.change == FileChange::Retract)
            .map(|e| &e.file)
    }

    pub fn row_count(&self) -> u64 {
        self.added_files().map(|f| f.row_count).sum()
    }
}
