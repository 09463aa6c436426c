//! Chronological log of microphone switches.

use crate::audio::DeviceName;
use chrono::{DateTime, Local};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::fmt;

/// Timestamp format used when a record is displayed.
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// One accepted microphone switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    timestamp: DateTime<Local>,
    device_name: DeviceName,
}

impl ChangeRecord {
    /// Create a record stamped with the current wall-clock time.
    pub fn now(device_name: impl Into<DeviceName>) -> Self {
        Self::at(Local::now(), device_name)
    }

    pub fn at(timestamp: DateTime<Local>, device_name: impl Into<DeviceName>) -> Self {
        Self {
            timestamp,
            device_name: device_name.into(),
        }
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] Microphone switched: {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.device_name
        )
    }
}

/// Append-only, time-ordered sequence of [`ChangeRecord`]s.
///
/// Readers get point-in-time copies. The lock is only held for the length of
/// a push or a clone, never across a device query.
#[derive(Debug, Default)]
pub struct HistoryLog {
    records: RwLock<VecDeque<ChangeRecord>>,
    limit: Option<usize>,
}

impl HistoryLog {
    /// Create an unbounded log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log that keeps at most `limit` records, evicting the oldest.
    /// `None` (or zero) means unbounded.
    pub fn with_capacity_limit(limit: Option<usize>) -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            limit: limit.filter(|&n| n > 0),
        }
    }

    pub fn append(&self, record: ChangeRecord) {
        let mut records = self.records.write();
        records.push_back(record);

        if let Some(limit) = self.limit {
            while records.len() > limit {
                records.pop_front();
            }
        }
    }

    /// Copy of every record, oldest first.
    pub fn snapshot(&self) -> Vec<ChangeRecord> {
        self.records.read().iter().cloned().collect()
    }

    /// Most recent record, if any.
    pub fn latest(&self) -> Option<ChangeRecord> {
        self.records.read().back().cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_record_display_format() {
        let timestamp = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 2).unwrap();
        let record = ChangeRecord::at(timestamp, "USB Microphone");

        assert_eq!(
            record.to_string(),
            "[2024/03/09 07:05:02] Microphone switched: USB Microphone"
        );
    }

    #[test]
    fn test_snapshot_preserves_insertion_order() {
        let log = HistoryLog::new();
        log.append(ChangeRecord::now("Built-in Microphone"));
        log.append(ChangeRecord::now("Headset"));

        let names: Vec<_> = log
            .snapshot()
            .iter()
            .map(|r| r.device_name().to_string())
            .collect();
        assert_eq!(names, vec!["Built-in Microphone", "Headset"]);
        assert_eq!(log.latest().unwrap().device_name(), "Headset");
    }

    #[test]
    fn test_snapshot_is_detached_from_later_appends() {
        let log = HistoryLog::new();
        log.append(ChangeRecord::now("Headset"));

        let snapshot = log.snapshot();
        log.append(ChangeRecord::now("Webcam"));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_capacity_limit_evicts_oldest() {
        let log = HistoryLog::with_capacity_limit(Some(2));
        for name in ["A", "B", "C"] {
            log.append(ChangeRecord::now(name));
        }

        let names: Vec<_> = log
            .snapshot()
            .iter()
            .map(|r| r.device_name().to_string())
            .collect();
        assert_eq!(names, vec!["B", "C"]);
    }

    #[test]
    fn test_zero_limit_is_unbounded() {
        let log = HistoryLog::with_capacity_limit(Some(0));
        for name in ["A", "B", "C"] {
            log.append(ChangeRecord::now(name));
        }
        assert_eq!(log.len(), 3);
        assert!(!log.is_empty());
    }
}
