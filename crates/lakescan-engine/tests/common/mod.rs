use std::sync::Arc;

use lakescan_core::{DataFileMeta, MemoryTable, Split};
use lakescan_engine::ScanService;

#[allow(dead_code)]
pub fn file(name: &str) -> DataFileMeta {
    DataFileMeta::new(name, "p=0", 0)
}

/// A service over a fresh in-memory table, plus the table for writing
#[allow(dead_code)]
pub fn service() -> (ScanService, Arc<MemoryTable>) {
    let table = Arc::new(MemoryTable::new());
    (ScanService::new(table.clone(), table.clone()), table)
}

#[allow(dead_code)]
pub fn append_batches(table: &MemoryTable, batches: &[&[&str]]) {
    for batch in batches {
        let ts = table_clock(table);
        table
            .append(ts, batch.iter().map(|name| file(name)).collect())
            .unwrap();
    }
}

#[allow(dead_code)]
fn table_clock(table: &MemoryTable) -> i64 {
    use lakescan_core::SnapshotStore;
    (table.latest_snapshot_id().unwrap().unwrap_or(0) + 1) * 100
}

#[allow(dead_code)]
pub fn added_names(splits: &[Split]) -> Vec<String> {
    let mut names: Vec<String> = splits
        .iter()
        .flat_map(|s| s.added_files().map(|f| f.file_name.clone()))
        .collect();
    names.sort();
    names
}
