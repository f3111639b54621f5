//! Scan options
//!
//! Tables carry dynamic string options; a scan reads the subset below and
//! ignores everything else.
//!
//! | key | value |
//! |---|---|
//! | `scan.mode` | `default`, `full`, `compacted-full`, `latest`, `from-snapshot`, `from-timestamp`, `incremental` |
//! | `scan.snapshot-id` | snapshot id |
//! | `scan.timestamp-millis` | epoch millis |
//! | `scan.timestamp` | RFC 3339 timestamp |
//! | `scan.timestamp.fallback-to-earliest` | `true` / `false` |
//! | `incremental-between` | `"from,to"` |
//! | `scan.follow-up` | `append` / `delta` |
//! | `scan.partitions` | comma-separated partitions |
//! | `scan.buckets` | comma-separated bucket numbers |

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::DateTime;

use crate::errors::{Result, ScanError};
use crate::model::SnapshotId;
use crate::scan::{FollowUpMode, ScanFilter, StartupPolicy};

pub const SCAN_MODE: &str = "scan.mode";
pub const SCAN_SNAPSHOT_ID: &str = "scan.snapshot-id";
pub const SCAN_TIMESTAMP_MILLIS: &str = "scan.timestamp-millis";
pub const SCAN_TIMESTAMP: &str = "scan.timestamp";
pub const SCAN_TIMESTAMP_FALLBACK: &str = "scan.timestamp.fallback-to-earliest";
pub const INCREMENTAL_BETWEEN: &str = "incremental-between";
pub const SCAN_FOLLOW_UP: &str = "scan.follow-up";
pub const SCAN_PARTITIONS: &str = "scan.partitions";
pub const SCAN_BUCKETS: &str = "scan.buckets";

/// Value of `scan.mode`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    /// Pick from the other options: timestamp, then snapshot id, then latest
    #[default]
    Default,
    Full,
    CompactedFull,
    Latest,
    FromSnapshot,
    FromTimestamp,
    Incremental,
}

impl FromStr for ScanMode {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "default" => ScanMode::Default,
            "full" => ScanMode::Full,
            "compacted-full" => ScanMode::CompactedFull,
            "latest" => ScanMode::Latest,
            "from-snapshot" => ScanMode::FromSnapshot,
            "from-timestamp" => ScanMode::FromTimestamp,
            "incremental" => ScanMode::Incremental,
            other => {
                return Err(ScanError::invalid_option(
                    SCAN_MODE,
                    format!("unknown scan mode '{}'", other),
                ))
            }
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    pub mode: ScanMode,
    pub snapshot_id: Option<SnapshotId>,
    pub timestamp_millis: Option<i64>,
    pub fallback_to_earliest: bool,
    pub incremental_between: Option<(SnapshotId, SnapshotId)>,
    pub follow_up: FollowUpMode,
    pub partitions: Option<Vec<String>>,
    pub buckets: Option<Vec<u32>>,
}

impl ScanOptions {
    /// Parse from a table's dynamic options. Unrelated keys are ignored.
    ///
    /// # Errors
    ///
    /// `InvalidOption` naming the first key whose value cannot be parsed.
    pub fn from_map(options: &BTreeMap<String, String>) -> Result<Self> {
        let get = |key: &str| options.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let timestamp_millis = match (get(SCAN_TIMESTAMP_MILLIS), get(SCAN_TIMESTAMP)) {
            (Some(_), Some(_)) => {
                return Err(ScanError::invalid_option(
                    SCAN_TIMESTAMP,
                    format!("conflicts with {}", SCAN_TIMESTAMP_MILLIS),
                ))
            }
            (Some(millis), None) => Some(parse_number(SCAN_TIMESTAMP_MILLIS, millis)?),
            (None, Some(ts)) => Some(parse_rfc3339(ts)?),
            (None, None) => None,
        };

        Ok(Self {
            mode: get(SCAN_MODE).map(ScanMode::from_str).transpose()?.unwrap_or_default(),
            snapshot_id: get(SCAN_SNAPSHOT_ID)
                .map(|v| parse_number(SCAN_SNAPSHOT_ID, v))
                .transpose()?,
            timestamp_millis,
            fallback_to_earliest: get(SCAN_TIMESTAMP_FALLBACK)
                .map(|v| parse_bool(SCAN_TIMESTAMP_FALLBACK, v))
                .transpose()?
                .unwrap_or(false),
            incremental_between: get(INCREMENTAL_BETWEEN).map(parse_range).transpose()?,
            follow_up: get(SCAN_FOLLOW_UP)
                .map(FollowUpMode::from_str)
                .transpose()?
                .unwrap_or_default(),
            partitions: get(SCAN_PARTITIONS).map(|v| split_list(v).map(String::from).collect()),
            buckets: get(SCAN_BUCKETS)
                .map(|v| {
                    split_list(v)
                        .map(|b| parse_number(SCAN_BUCKETS, b))
                        .collect::<Result<Vec<u32>>>()
                })
                .transpose()?,
        })
    }

    /// Parse a TOML document. Nested tables and quoted dotted keys are both
    /// accepted, so `[scan] mode = "latest"` and `"scan.mode" = "latest"`
    /// are equivalent.
    ///
    /// # Errors
    ///
    /// `InvalidOption` for malformed TOML or values.
    pub fn from_toml_str(document: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(document)
            .map_err(|e| ScanError::invalid_option("<toml>", e.to_string()))?;
        let mut flat = BTreeMap::new();
        flatten_toml("", &table, &mut flat)?;
        Self::from_map(&flat)
    }

    /// Resolve `scan.mode` and its companion keys into a startup policy.
    ///
    /// # Errors
    ///
    /// `InvalidOption` when the mode needs a key that is not set.
    pub fn startup_policy(&self) -> Result<StartupPolicy> {
        let from_timestamp = |millis| StartupPolicy::FromTimestamp {
            millis,
            fallback_to_earliest: self.fallback_to_earliest,
        };
        Ok(match self.mode {
            ScanMode::Default => match (self.timestamp_millis, self.snapshot_id) {
                (Some(millis), _) => from_timestamp(millis),
                (None, Some(id)) => StartupPolicy::FromSnapshot(id),
                (None, None) => StartupPolicy::Latest,
            },
            ScanMode::Full => StartupPolicy::Full,
            ScanMode::CompactedFull => StartupPolicy::CompactedFull,
            ScanMode::Latest => StartupPolicy::Latest,
            ScanMode::FromSnapshot => {
                StartupPolicy::FromSnapshot(self.snapshot_id.ok_or_else(|| {
                    ScanError::invalid_option(SCAN_SNAPSHOT_ID, "required by from-snapshot mode")
                })?)
            }
            ScanMode::FromTimestamp => from_timestamp(self.timestamp_millis.ok_or_else(|| {
                ScanError::invalid_option(SCAN_TIMESTAMP_MILLIS, "required by from-timestamp mode")
            })?),
            ScanMode::Incremental => {
                let (from, to) = self.incremental_between.ok_or_else(|| {
                    ScanError::invalid_option(INCREMENTAL_BETWEEN, "required by incremental mode")
                })?;
                StartupPolicy::Incremental { from, to }
            }
        })
    }

    pub fn filter(&self) -> ScanFilter {
        let mut filter = ScanFilter::new();
        if let Some(partitions) = &self.partitions {
            filter = filter.with_partitions(partitions.iter().cloned());
        }
        if let Some(buckets) = &self.buckets {
            filter = filter.with_buckets(buckets.iter().copied());
        }
        filter
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| ScanError::invalid_option(key, format!("'{}': {}", value, e)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ScanError::invalid_option(
            key,
            format!("expected true or false, got '{}'", value),
        )),
    }
}

fn parse_rfc3339(value: &str) -> Result<i64> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.timestamp_millis())
        .map_err(|e| ScanError::invalid_option(SCAN_TIMESTAMP, format!("'{}': {}", value, e)))
}

fn parse_range(value: &str) -> Result<(SnapshotId, SnapshotId)> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [from, to] => Ok((
            parse_number(INCREMENTAL_BETWEEN, from)?,
            parse_number(INCREMENTAL_BETWEEN, to)?,
        )),
        _ => Err(ScanError::invalid_option(
            INCREMENTAL_BETWEEN,
            format!("expected 'from,to', got '{}'", value),
        )),
    }
}

fn flatten_toml(prefix: &str, table: &toml::Table, out: &mut BTreeMap<String, String>) -> Result<()> {
    for (key, value) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        let scalar = match value {
            toml::Value::Table(nested) => {
                flatten_toml(&path, nested, out)?;
                continue;
            }
            toml::Value::String(s) => s.clone(),
            toml::Value::Integer(i) => i.to_string(),
            toml::Value::Boolean(b) => b.to_string(),
            toml::Value::Datetime(dt) => dt.to_string(),
            toml::Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    toml::Value::String(s) => Ok(s.clone()),
                    toml::Value::Integer(i) => Ok(i.to_string()),
                    _ => Err(ScanError::invalid_option(
                        &path,
                        "arrays may only hold strings or integers",
                    )),
                })
                .collect::<Result<Vec<String>>>()?
                .join(","),
            toml::Value::Float(_) => {
                return Err(ScanError::invalid_option(&path, "floats are not supported"))
            }
        };
        out.insert(path, scalar);
    }
    Ok(())
}
