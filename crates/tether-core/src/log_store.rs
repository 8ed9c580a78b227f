//! Append-only, time-ordered log storage on the camera.

use std::sync::{PoisonError, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Result, TetherError};
use crate::models::{LogRecord, TimeRange};

/// Current wall-clock time in unix seconds.
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// Records sorted by timestamp. Appends take the write lock briefly; range
/// reads clone the matching slice under the read lock, so a reader never
/// sees a partially written record.
#[derive(Debug, Default)]
pub struct LogStore {
    records: RwLock<Vec<LogRecord>>,
}

impl LogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record stamped with the current time.
    ///
    /// If the wall clock stepped backwards, the record reuses the newest
    /// timestamp so the store stays ordered.
    pub fn append(&self, description: impl Into<String>) -> LogRecord {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let newest = records.last().map_or(f64::NEG_INFINITY, |r| r.timestamp);
        let record = LogRecord::new(unix_now().max(newest), description);
        records.push(record.clone());
        record
    }

    /// Append a record with an explicit timestamp.
    ///
    /// Fails if the timestamp is not finite or would be older than the
    /// newest stored record.
    pub fn push(&self, record: LogRecord) -> Result<()> {
        if !record.timestamp.is_finite() {
            return Err(TetherError::validation(
                "timestamp",
                format!("{} is not a finite unix time", record.timestamp),
            ));
        }
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(newest) = records.last() {
            if record.timestamp < newest.timestamp {
                return Err(TetherError::validation(
                    "timestamp",
                    format!(
                        "{} is older than the newest record at {}",
                        record.timestamp, newest.timestamp
                    ),
                ));
            }
        }
        records.push(record);
        Ok(())
    }

    /// All records with a timestamp inside `range`, oldest first.
    pub fn filter(&self, range: &TimeRange) -> Vec<LogRecord> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        let first = records.partition_point(|r| r.timestamp < range.start());
        let last = records.partition_point(|r| r.timestamp <= range.end());
        if first >= last {
            return Vec::new();
        }
        records[first..last].to_vec()
    }

    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(timestamps: &[f64]) -> LogStore {
        let store = LogStore::new();
        for &ts in timestamps {
            store
                .push(LogRecord::new(ts, format!("record {}", ts)))
                .unwrap();
        }
        store
    }

    #[test]
    fn test_filter_is_inclusive_and_ordered() {
        let store = store_with(&[50.0, 100.0, 150.0, 200.0, 250.0]);
        let range = TimeRange::new(100.0, 200.0).unwrap();
        let timestamps: Vec<f64> = store.filter(&range).iter().map(|r| r.timestamp).collect();
        assert_eq!(timestamps, vec![100.0, 150.0, 200.0]);
    }

    #[test]
    fn test_filter_empty_and_unbounded() {
        let store = store_with(&[50.0, 150.0, 250.0]);
        assert!(store
            .filter(&TimeRange::new(160.0, 240.0).unwrap())
            .is_empty());
        assert_eq!(store.filter(&TimeRange::all_time()).len(), 3);
        assert!(LogStore::new().filter(&TimeRange::all_time()).is_empty());
    }

    #[test]
    fn test_push_rejects_out_of_order() {
        let store = store_with(&[100.0]);
        assert!(store.push(LogRecord::new(99.0, "late")).is_err());
        assert!(store.push(LogRecord::new(100.0, "same instant")).is_ok());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_push_rejects_non_finite_timestamps() {
        let store = store_with(&[100.0]);
        for ts in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(store.push(LogRecord::new(ts, "bad clock")).is_err());
        }
        assert_eq!(store.len(), 1);
        assert!(store.push(LogRecord::new(101.0, "good clock")).is_ok());
        let all = store.filter(&TimeRange::all_time());
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_append_never_goes_backwards() {
        let store = store_with(&[f64::MAX]);
        let record = store.append("clock skew");
        assert_eq!(record.timestamp, f64::MAX);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_append_stamps_current_time() {
        let store = LogStore::new();
        let before = unix_now();
        let record = store.append("motion detected at (1, 2)");
        assert!(record.timestamp >= before);
        assert!(!store.is_empty());
    }
}
