use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::model::DataFileMeta;

/// Opaque per-file predicate supplied by the query layer
pub type FilePredicate = Arc<dyn Fn(&DataFileMeta) -> bool + Send + Sync>;

/// Filters pushed down into [`FileCatalog::files_for`](crate::store::FileCatalog::files_for).
///
/// Absent sets mean "no restriction". An empty set excludes everything.
#[derive(Clone, Default)]
pub struct ScanFilter {
    partitions: Option<BTreeSet<String>>,
    buckets: Option<BTreeSet<u32>>,
    predicate: Option<FilePredicate>,
}

impl ScanFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_partitions<I, S>(mut self, partitions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.partitions = Some(partitions.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_buckets<I>(mut self, buckets: I) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        self.buckets = Some(buckets.into_iter().collect());
        self
    }

    pub fn with_predicate(mut self, predicate: FilePredicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn partitions(&self) -> Option<&BTreeSet<String>> {
        self.partitions.as_ref()
    }

    pub fn buckets(&self) -> Option<&BTreeSet<u32>> {
        self.buckets.as_ref()
    }

    pub fn is_unrestricted(&self) -> bool {
        self.partitions.is_none() && self.buckets.is_none() && self.predicate.is_none()
    }

    /// Whether a file group can contain matching files at all.
    ///
    /// Catalogs call this before opening a group's manifest entries.
    pub fn matches_group(&self, partition: &str, bucket: u32) -> bool {
        let partition_ok = self
            .partitions
            .as_ref()
            .map_or(true, |p| p.contains(partition));
        let bucket_ok = self.buckets.as_ref().map_or(true, |b| b.contains(&bucket));
        partition_ok && bucket_ok
    }

    pub fn matches(&self, file: &DataFileMeta) -> bool {
        self.matches_group(&file.partition, file.bucket)
            && self.predicate.as_ref().map_or(true, |p| p(file))
    }
}

impl fmt::Debug for ScanFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanFilter")
            .field("partitions", &self.partitions)
            .field("buckets", &self.buckets)
            .field("predicate", &self.predicate.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_matches_everything() {
        let filter = ScanFilter::default();
        assert!(filter.is_unrestricted());
        assert!(filter.matches(&DataFileMeta::new("f", "p=1", 3)));
    }

    #[test]
    fn test_partition_and_bucket_restrictions_combine() {
        let filter = ScanFilter::new()
            .with_partitions(["p=1"])
            .with_buckets([0, 1]);
        assert!(filter.matches(&DataFileMeta::new("f", "p=1", 1)));
        assert!(!filter.matches(&DataFileMeta::new("f", "p=2", 1)));
        assert!(!filter.matches(&DataFileMeta::new("f", "p=1", 2)));
    }

    #[test]
    fn test_predicate_is_applied_per_file() {
        let filter =
            ScanFilter::new().with_predicate(Arc::new(|f: &DataFileMeta| f.row_count > 10));
        assert!(filter.matches(&DataFileMeta::new("big", "p", 0).with_stats(11, 1)));
        assert!(!filter.matches(&DataFileMeta::new("small", "p", 0).with_stats(3, 1)));
    }
}
