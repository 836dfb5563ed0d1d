//! Bounded per-device reading history for sparklines.
//!
//! Kept in memory only, capacity-bounded, never persisted. Push updates
//! append as they arrive; opening the detail overlay backfills from the
//! bucketed-readings endpoint so the sparkline is not empty on first view.

use std::collections::{HashMap, VecDeque};

use super::device::Reading;

/// Maximum readings retained per device.
const MAX_HISTORY_SIZE: usize = 60;

/// Recent readings per device, oldest first.
#[derive(Debug, Clone, Default)]
pub struct ReadingHistory {
    per_device: HashMap<String, VecDeque<Reading>>,
}

impl ReadingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a reading observed on the push channel.
    pub fn record(&mut self, device_id: &str, reading: Reading) {
        let readings = self.per_device.entry(device_id.to_string()).or_default();
        readings.push_back(reading);
        if readings.len() > MAX_HISTORY_SIZE {
            readings.pop_front();
        }
    }

    /// Seed a device's history from a REST backfill.
    ///
    /// Fetched readings replace what is held, except readings already
    /// recorded that are newer than the fetched range, which are kept at
    /// the tail.
    pub fn backfill(&mut self, device_id: &str, mut fetched: Vec<Reading>) {
        fetched.sort_by_key(|r| r.time);
        let newest_fetched = fetched.last().map(|r| r.time);

        let readings = self.per_device.entry(device_id.to_string()).or_default();
        let tail: Vec<Reading> = match newest_fetched {
            Some(cutoff) => readings.iter().filter(|r| r.time > cutoff).cloned().collect(),
            None => return,
        };

        readings.clear();
        readings.extend(fetched);
        readings.extend(tail);
        while readings.len() > MAX_HISTORY_SIZE {
            readings.pop_front();
        }
    }

    /// The value series for one sensor of one device, oldest first.
    ///
    /// Readings that do not carry the sensor are skipped.
    pub fn series(&self, device_id: &str, code: &str) -> Vec<f64> {
        self.per_device
            .get(device_id)
            .map(|readings| {
                readings.iter().filter_map(|r| r.values.get(code).copied()).collect()
            })
            .unwrap_or_default()
    }

    /// Sparkline levels (0-7) for one sensor of one device.
    ///
    /// Returns an empty Vec when there are fewer than two points.
    pub fn sparkline(&self, device_id: &str, code: &str) -> Vec<u8> {
        let values = self.series(device_id, code);
        if values.len() < 2 {
            return Vec::new();
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = (max - min).max(f64::EPSILON);

        values
            .iter()
            .map(|&v| {
                let normalized = ((v - min) / range * 7.0) as u8;
                normalized.min(7)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::BTreeMap;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn reading(secs: i64, temp: f64) -> Reading {
        let mut values = BTreeMap::new();
        values.insert("temperature".to_string(), temp);
        Reading { time: at(secs), values }
    }

    #[test]
    fn test_record_and_series() {
        let mut history = ReadingHistory::new();
        history.record("d1", reading(0, 20.0));
        history.record("d1", reading(10, 21.0));
        history.record("d2", reading(10, 5.0));

        assert_eq!(history.series("d1", "temperature"), vec![20.0, 21.0]);
        assert_eq!(history.series("d2", "temperature"), vec![5.0]);
        assert!(history.series("d3", "temperature").is_empty());
    }

    #[test]
    fn test_capacity_bound() {
        let mut history = ReadingHistory::new();
        for i in 0..100 {
            history.record("d1", reading(i, i as f64));
        }

        let series = history.series("d1", "temperature");
        assert_eq!(series.len(), MAX_HISTORY_SIZE);
        // Oldest entries were evicted.
        assert_eq!(series[0], 40.0);
        assert_eq!(*series.last().unwrap(), 99.0);
    }

    #[test]
    fn test_backfill_keeps_newer_pushes() {
        let mut history = ReadingHistory::new();
        history.record("d1", reading(100, 25.0));

        history.backfill("d1", vec![reading(10, 20.0), reading(0, 19.0)]);

        // Backfill sorts oldest-first and keeps the newer pushed reading.
        assert_eq!(history.series("d1", "temperature"), vec![19.0, 20.0, 25.0]);
    }

    #[test]
    fn test_sparkline_normalization() {
        let mut history = ReadingHistory::new();
        history.record("d1", reading(0, 10.0));
        history.record("d1", reading(10, 15.0));
        history.record("d1", reading(20, 20.0));

        assert_eq!(history.sparkline("d1", "temperature"), vec![0, 3, 7]);
    }

    #[test]
    fn test_sparkline_needs_two_points() {
        let mut history = ReadingHistory::new();
        history.record("d1", reading(0, 10.0));
        assert!(history.sparkline("d1", "temperature").is_empty());
    }
}
