use std::sync::{Arc, Mutex};

use lakescan_core::{
    DataFileMeta, FileCatalog, MemoryTable, Result, ScanFilter, ScanKind, SnapshotId,
    SnapshotSplitReader, Split,
};

/// File in the default partition and bucket
#[allow(dead_code)]
pub fn file(name: &str) -> DataFileMeta {
    DataFileMeta::new(name, "p=0", 0)
}

#[allow(dead_code)]
pub fn file_in(name: &str, partition: &str, bucket: u32) -> DataFileMeta {
    DataFileMeta::new(name, partition, bucket)
}

/// Table with one APPEND snapshot per batch, timestamps 100, 200, ...
#[allow(dead_code)]
pub fn table_with_appends(batches: &[&[&str]]) -> Arc<MemoryTable> {
    let table = Arc::new(MemoryTable::new());
    for (i, batch) in batches.iter().enumerate() {
        let files = batch.iter().map(|name| file(name)).collect();
        table.append((i as i64 + 1) * 100, files).unwrap();
    }
    table
}

#[allow(dead_code)]
pub fn reader_for(table: &Arc<MemoryTable>) -> SnapshotSplitReader {
    SnapshotSplitReader::new(table.clone())
}

/// Sorted file names of the given change across all splits
#[allow(dead_code)]
pub fn added_names(splits: &[Split]) -> Vec<String> {
    let mut names: Vec<String> = splits
        .iter()
        .flat_map(|s| s.added_files().map(|f| f.file_name.clone()))
        .collect();
    names.sort();
    names
}

#[allow(dead_code)]
pub fn retracted_names(splits: &[Split]) -> Vec<String> {
    let mut names: Vec<String> = splits
        .iter()
        .flat_map(|s| s.retracted_files().map(|f| f.file_name.clone()))
        .collect();
    names.sort();
    names
}

/// `files_for(b, ALL) \ files_for(a, ALL)` by file name
#[allow(dead_code)]
pub fn live_difference(table: &MemoryTable, a: SnapshotId, b: SnapshotId) -> Vec<String> {
    let filter = ScanFilter::default();
    let before = added_names(&table.files_for(a, ScanKind::All, &filter).unwrap());
    let after = added_names(&table.files_for(b, ScanKind::All, &filter).unwrap());
    after.into_iter().filter(|n| !before.contains(n)).collect()
}

/// Catalog wrapper recording every query it forwards
#[allow(dead_code)]
pub struct RecordingCatalog {
    inner: Arc<dyn FileCatalog>,
    pub calls: Mutex<Vec<(SnapshotId, ScanKind, ScanFilter)>>,
}

#[allow(dead_code)]
impl RecordingCatalog {
    pub fn new(inner: Arc<dyn FileCatalog>) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(SnapshotId, ScanKind, ScanFilter)> {
        self.calls.lock().unwrap().clone()
    }
}

impl FileCatalog for RecordingCatalog {
    fn files_for(&self, id: SnapshotId, kind: ScanKind, filter: &ScanFilter) -> Result<Vec<Split>> {
        self.calls.lock().unwrap().push((id, kind, filter.clone()));
        self.inner.files_for(id, kind, filter)
    }
}
