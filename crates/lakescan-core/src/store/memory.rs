use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::errors::{Result, ScanError};
use crate::model::{CommitKind, DataFileMeta, FileEntry, ScanKind, Snapshot, SnapshotId, Split};
use crate::scan::ScanFilter;
use crate::store::{FileCatalog, SnapshotStore};

#[derive(Debug, Clone)]
struct SnapshotRecord {
    snapshot: Snapshot,
    /// Live files at this snapshot keyed by file name
    live: BTreeMap<String, DataFileMeta>,
    added: Vec<DataFileMeta>,
    retracted: Vec<DataFileMeta>,
}

#[derive(Debug, Default)]
struct TableState {
    records: BTreeMap<SnapshotId, SnapshotRecord>,
    /// `(id, timestamp)` in id order, for timestamp lookups
    timeline: Vec<(SnapshotId, i64)>,
    expired: BTreeSet<SnapshotId>,
    /// Live files after the last commit, kept even when that snapshot expires
    live: BTreeMap<String, DataFileMeta>,
    last_id: SnapshotId,
    last_timestamp: Option<i64>,
}

impl TableState {
    fn earliest(&self) -> Option<SnapshotId> {
        self.records.keys().next().copied()
    }

    fn latest(&self) -> Option<SnapshotId> {
        self.records.keys().next_back().copied()
    }

    fn missing(&self, id: SnapshotId) -> ScanError {
        if self.expired.contains(&id) {
            ScanError::SnapshotExpired {
                requested: id,
                earliest: self.earliest(),
            }
        } else {
            ScanError::SnapshotNotFound { snapshot_id: id }
        }
    }

    fn apply_commit(
        &mut self,
        id: SnapshotId,
        kind: CommitKind,
        timestamp_millis: i64,
        added: Vec<DataFileMeta>,
        retracted: &[&str],
    ) -> Result<SnapshotId> {
        if let Some(last) = self.last_timestamp.filter(|last| timestamp_millis < *last) {
            return Err(ScanError::invalid_input(format!(
                "commit timestamp {} is before previous commit timestamp {}",
                timestamp_millis, last
            )));
        }

        let mut live = self.live.clone();

        let mut removed = Vec::with_capacity(retracted.len());
        for name in retracted {
            match live.remove(*name) {
                Some(file) => removed.push(file),
                None => {
                    return Err(ScanError::invalid_input(format!(
                        "cannot retract unknown file '{}'",
                        name
                    )))
                }
            }
        }

        for file in &added {
            if live.contains_key(&file.file_name) {
                return Err(ScanError::invalid_input(format!(
                    "file '{}' is already live",
                    file.file_name
                )));
            }
            live.insert(file.file_name.clone(), file.clone());
        }

        self.records.insert(
            id,
            SnapshotRecord {
                snapshot: Snapshot::new(id, timestamp_millis, kind),
                live: live.clone(),
                added,
                retracted: removed,
            },
        );
        self.timeline.push((id, timestamp_millis));
        self.live = live;
        self.last_id = id;
        self.last_timestamp = Some(timestamp_millis);
        Ok(id)
    }

    fn expire(&mut self, id: SnapshotId) -> bool {
        if self.records.remove(&id).is_none() {
            return false;
        }
        if let Ok(pos) = self.timeline.binary_search_by_key(&id, |(i, _)| *i) {
            self.timeline.remove(pos);
        }
        self.expired.insert(id);
        true
    }
}

/// In-memory table implementing both [`SnapshotStore`] and [`FileCatalog`].
///
/// Writers commit through `&self`; an interior `RwLock` lets any number of
/// scans read concurrently. Each query sees one consistent state.
#[derive(Debug, Default)]
pub struct MemoryTable {
    state: RwLock<TableState>,
    pending_failure: Mutex<Option<String>>,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, TableState>> {
        self.state.read().map_err(|_| ScanError::Internal {
            message: "memory table lock poisoned".to_string(),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, TableState>> {
        self.state.write().map_err(|_| ScanError::Internal {
            message: "memory table lock poisoned".to_string(),
        })
    }

    /// Commit a new snapshot with the next id.
    ///
    /// `retracted` names files that must currently be live.
    ///
    /// # Errors
    ///
    /// `InvalidInput` when retracting an unknown file, re-adding a live one,
    /// or committing with a timestamp before the previous commit's.
    pub fn commit(
        &self,
        kind: CommitKind,
        timestamp_millis: i64,
        added: Vec<DataFileMeta>,
        retracted: &[&str],
    ) -> Result<SnapshotId> {
        let mut state = self.write()?;
        let id = state.last_id + 1;
        state.apply_commit(id, kind, timestamp_millis, added, retracted)
    }

    /// Commit with an explicit id, leaving every id in between uncommitted.
    ///
    /// # Errors
    ///
    /// `InvalidInput` when `id` does not exceed the last used id.
    pub fn commit_with_id(
        &self,
        id: SnapshotId,
        kind: CommitKind,
        timestamp_millis: i64,
        added: Vec<DataFileMeta>,
        retracted: &[&str],
    ) -> Result<SnapshotId> {
        let mut state = self.write()?;
        if id <= state.last_id {
            return Err(ScanError::invalid_input(format!(
                "snapshot id {} is not after last id {}",
                id, state.last_id
            )));
        }
        state.apply_commit(id, kind, timestamp_millis, added, retracted)
    }

    pub fn append(&self, timestamp_millis: i64, added: Vec<DataFileMeta>) -> Result<SnapshotId> {
        self.commit(CommitKind::Append, timestamp_millis, added, &[])
    }

    /// Rewrite `retracted` into `added` without changing logical content
    pub fn compact(
        &self,
        timestamp_millis: i64,
        added: Vec<DataFileMeta>,
        retracted: &[&str],
    ) -> Result<SnapshotId> {
        self.commit(CommitKind::Compact, timestamp_millis, added, retracted)
    }

    pub fn overwrite(
        &self,
        timestamp_millis: i64,
        added: Vec<DataFileMeta>,
        retracted: &[&str],
    ) -> Result<SnapshotId> {
        self.commit(CommitKind::Overwrite, timestamp_millis, added, retracted)
    }

    /// Burn the next id as an aborted commit; it never becomes visible
    pub fn abort_next_commit(&self) -> Result<SnapshotId> {
        let mut state = self.write()?;
        state.last_id += 1;
        Ok(state.last_id)
    }

    /// Remove one snapshot. Returns whether it was visible.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for the latest snapshot; retention never removes it.
    pub fn expire(&self, id: SnapshotId) -> Result<bool> {
        let mut state = self.write()?;
        if state.latest() == Some(id) {
            return Err(ScanError::invalid_input(format!(
                "snapshot {} is the latest and cannot be expired",
                id
            )));
        }
        Ok(state.expire(id))
    }

    /// Retention: remove every snapshot with id `< id`, always keeping the
    /// latest. Returns the count.
    pub fn expire_before(&self, id: SnapshotId) -> Result<usize> {
        let mut state = self.write()?;
        let Some(latest) = state.latest() else {
            return Ok(0);
        };
        let doomed: Vec<SnapshotId> = state
            .records
            .range(..id.min(latest))
            .map(|(k, _)| *k)
            .collect();
        for snapshot_id in &doomed {
            state.expire(*snapshot_id);
        }
        Ok(doomed.len())
    }

    /// Make the next catalog query fail with `CatalogQuery`
    pub fn fail_next_query(&self, message: impl Into<String>) -> Result<()> {
        let mut pending = self.pending_failure.lock().map_err(|_| ScanError::Internal {
            message: "memory table failure lock poisoned".to_string(),
        })?;
        *pending = Some(message.into());
        Ok(())
    }

    fn take_pending_failure(&self) -> Result<Option<String>> {
        let mut pending = self.pending_failure.lock().map_err(|_| ScanError::Internal {
            message: "memory table failure lock poisoned".to_string(),
        })?;
        Ok(pending.take())
    }
}

/// Group entries into splits ordered by `(partition, bucket)`, keeping entry
/// order inside each group.
fn group_into_splits(entries: Vec<FileEntry>) -> Vec<Split> {
    let mut groups: BTreeMap<(String, u32), Vec<FileEntry>> = BTreeMap::new();
    for entry in entries {
        groups
            .entry((entry.file.partition.clone(), entry.file.bucket))
            .or_default()
            .push(entry);
    }
    groups
        .into_iter()
        .map(|((partition, bucket), entries)| Split::new(partition, bucket, entries))
        .collect()
}

impl SnapshotStore for MemoryTable {
    fn latest_snapshot_id(&self) -> Result<Option<SnapshotId>> {
        Ok(self.read()?.latest())
    }

    fn earliest_snapshot_id(&self) -> Result<Option<SnapshotId>> {
        Ok(self.read()?.earliest())
    }

    fn latest_compacted_snapshot_id(&self) -> Result<Option<SnapshotId>> {
        Ok(self
            .read()?
            .records
            .values()
            .rev()
            .find(|r| r.snapshot.is_compaction())
            .map(|r| r.snapshot.id))
    }

    fn snapshot_exists(&self, id: SnapshotId) -> Result<bool> {
        Ok(self.read()?.records.contains_key(&id))
    }

    fn snapshot(&self, id: SnapshotId) -> Result<Snapshot> {
        let state = self.read()?;
        state
            .records
            .get(&id)
            .map(|r| r.snapshot.clone())
            .ok_or_else(|| state.missing(id))
    }

    /// Binary search over the id-ordered timeline; commits keep timestamps
    /// non-decreasing.
    fn snapshot_at_or_before(&self, timestamp_millis: i64) -> Result<Option<SnapshotId>> {
        let state = self.read()?;
        let idx = state
            .timeline
            .partition_point(|(_, ts)| *ts <= timestamp_millis);
        Ok(idx.checked_sub(1).map(|i| state.timeline[i].0))
    }

    fn is_expired(&self, id: SnapshotId) -> Result<bool> {
        Ok(self.read()?.expired.contains(&id))
    }
}

impl FileCatalog for MemoryTable {
    fn files_for(&self, id: SnapshotId, kind: ScanKind, filter: &ScanFilter) -> Result<Vec<Split>> {
        if let Some(message) = self.take_pending_failure()? {
            return Err(ScanError::CatalogQuery { message });
        }

        let state = self.read()?;
        let record = state.records.get(&id).ok_or_else(|| state.missing(id))?;

        let entries: Vec<FileEntry> = match kind {
            ScanKind::All => record
                .live
                .values()
                .filter(|f| filter.matches(f))
                .cloned()
                .map(FileEntry::added)
                .collect(),
            ScanKind::Append => record
                .added
                .iter()
                .filter(|f| filter.matches(f))
                .cloned()
                .map(FileEntry::added)
                .collect(),
            ScanKind::Delta => record
                .added
                .iter()
                .filter(|f| filter.matches(f))
                .cloned()
                .map(FileEntry::added)
                .chain(
                    record
                        .retracted
                        .iter()
                        .filter(|f| filter.matches(f))
                        .cloned()
                        .map(FileEntry::retracted),
                )
                .collect(),
        };

        Ok(group_into_splits(entries))
    }
}
