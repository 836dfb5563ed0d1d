//! Device records and the canonical device state store.
//!
//! The store holds the authoritative in-memory view of all known devices.
//! It is populated wholesale from the REST snapshot and then kept current
//! by per-device push updates. Online/offline classification is never
//! stored: it is derived on read from `last_status_update` via
//! [`is_alive`](super::liveness::is_alive).

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::liveness::is_alive;

/// How long a freshly updated device keeps its visual pulse.
pub const PULSE_DURATION: Duration = Duration::from_secs(1);

/// A point-in-time snapshot of sensor values for one device.
///
/// Readings are immutable once created; a newer reading for the same device
/// supersedes the old one rather than being merged into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// When the reading was taken (the device's own timestamp).
    pub time: DateTime<Utc>,
    /// Sensor code to measured value.
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

/// A device record as served by the REST backend and held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Stable identifier, the store's primary key.
    pub device_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_addr: Option<String>,
    /// Sensor codes this device declares, in declaration order.
    #[serde(default)]
    pub sensors: Vec<String>,
    /// Uptime in seconds, as last reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<u64>,
    /// The last time any signal (REST or push) was observed for this device.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_status_update: Option<DateTime<Utc>>,
    /// The most recent sensor-value snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reading: Option<Reading>,
    /// Timestamp of the most recent store mutation. Drives the short-lived
    /// visual pulse; otherwise semantically identical to `last_status_update`.
    #[serde(skip)]
    pub last_update: Option<DateTime<Utc>>,
}

impl DeviceRecord {
    /// Whether the device counts as online at `now`, derived from
    /// `last_status_update` and the heartbeat TTL.
    pub fn is_online(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        is_alive(self.last_status_update, ttl, now)
    }

    /// Whether the record was mutated within the pulse window.
    pub fn recently_updated(&self, now: DateTime<Utc>) -> bool {
        is_alive(self.last_update, PULSE_DURATION, now)
    }
}

/// A partial device update as carried on the push channel.
///
/// `id` is mandatory: an update without an identifier cannot be merged and
/// fails deserialization, which drops the message upstream.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceUpdate {
    pub id: String,
    /// Device-side timestamp of the measurement, epoch milliseconds.
    /// Used only as the reading's own time, never for liveness.
    pub timestamp: Option<i64>,
    pub uptime: Option<u64>,
    #[serde(default)]
    pub sensors_data: BTreeMap<String, f64>,
}

impl DeviceUpdate {
    /// Build the superseding reading for this update.
    ///
    /// The reading carries the device's embedded timestamp when present and
    /// parseable, falling back to the receipt time.
    fn into_reading(self, received_at: DateTime<Utc>) -> (String, Option<u64>, Reading) {
        let time = self
            .timestamp
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .unwrap_or(received_at);
        (
            self.id,
            self.uptime,
            Reading {
                time,
                values: self.sensors_data,
            },
        )
    }
}

/// The canonical mapping of device identifier to device record.
///
/// Snapshot order is preserved; devices first seen via push are appended.
/// All mutation happens through [`apply_snapshot`](Self::apply_snapshot) and
/// [`apply_update`](Self::apply_update) on the single event-loop thread, so
/// readers never observe a partially merged record.
#[derive(Debug, Clone, Default)]
pub struct DeviceStore {
    devices: Vec<DeviceRecord>,
}

impl DeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the store wholesale with a REST snapshot.
    ///
    /// Each entry's transient `last_update` is seeded from its own
    /// `last_status_update` so the age display works before any push
    /// traffic arrives.
    pub fn apply_snapshot(&mut self, devices: Vec<DeviceRecord>) {
        self.devices = devices;
        for device in &mut self.devices {
            device.last_update = device.last_status_update;
        }
    }

    /// Upsert a push update by device id.
    ///
    /// Unknown id: insert a new record carrying only the update's fields.
    /// Known id: shallow-merge the update over the existing record. Either
    /// way `last_update` and `last_status_update` are set to `received_at`,
    /// the receipt time, regardless of any timestamp embedded in the
    /// payload: most-recently-received-wins.
    pub fn apply_update(&mut self, update: DeviceUpdate, received_at: DateTime<Utc>) {
        let (id, uptime, reading) = update.into_reading(received_at);

        match self.devices.iter_mut().find(|d| d.device_id == id) {
            Some(existing) => {
                existing.uptime = uptime;
                existing.last_reading = Some(reading);
                existing.last_status_update = Some(received_at);
                existing.last_update = Some(received_at);
            }
            None => {
                self.devices.push(DeviceRecord {
                    device_id: id,
                    model: None,
                    image: None,
                    location: None,
                    ip_addr: None,
                    sensors: Vec::new(),
                    uptime,
                    last_status_update: Some(received_at),
                    last_reading: Some(reading),
                    last_update: Some(received_at),
                });
            }
        }
    }

    pub fn devices(&self) -> &[DeviceRecord] {
        &self.devices
    }

    pub fn get(&self, device_id: &str) -> Option<&DeviceRecord> {
        self.devices.iter().find(|d| d.device_id == device_id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Number of devices currently classified as online.
    pub fn online_count(&self, ttl: Duration, now: DateTime<Utc>) -> usize {
        self.devices.iter().filter(|d| d.is_online(ttl, now)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn snapshot_device(id: &str, last_status_update: DateTime<Utc>) -> DeviceRecord {
        DeviceRecord {
            device_id: id.to_string(),
            model: Some("rpi-4b".to_string()),
            image: None,
            location: Some("kitchen".to_string()),
            ip_addr: Some("10.0.0.12".to_string()),
            sensors: vec!["temperature".to_string(), "humidity".to_string()],
            uptime: Some(3600),
            last_status_update: Some(last_status_update),
            last_reading: None,
            last_update: None,
        }
    }

    fn update(id: &str, temp: f64) -> DeviceUpdate {
        let mut sensors_data = BTreeMap::new();
        sensors_data.insert("temperature".to_string(), temp);
        DeviceUpdate {
            id: id.to_string(),
            timestamp: Some(1_700_000_000_000),
            uptime: Some(120),
            sensors_data,
        }
    }

    #[test]
    fn test_snapshot_seeds_last_update() {
        let t0 = at(1_700_000_000_000);
        let mut store = DeviceStore::new();
        store.apply_snapshot(vec![snapshot_device("d1", t0)]);

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("d1").unwrap().last_update, Some(t0));
    }

    #[test]
    fn test_update_unknown_id_inserts_partial_record() {
        let received = at(1_700_000_100_000);
        let mut store = DeviceStore::new();
        store.apply_update(update("d2", 21.5), received);

        assert_eq!(store.len(), 1);
        let d2 = store.get("d2").unwrap();
        // Fields absent from the update stay absent, not defaulted.
        assert!(d2.model.is_none());
        assert!(d2.sensors.is_empty());
        // The reading carries the measured value...
        let reading = d2.last_reading.as_ref().unwrap();
        assert_eq!(reading.values.get("temperature"), Some(&21.5));
        // ...and its own embedded time, while liveness tracks receipt time.
        assert_eq!(reading.time, at(1_700_000_000_000));
        assert_eq!(d2.last_status_update, Some(received));
    }

    #[test]
    fn test_update_known_id_merges_in_place() {
        let t0 = at(1_700_000_000_000);
        let received = at(1_700_000_050_000);
        let mut store = DeviceStore::new();
        store.apply_snapshot(vec![snapshot_device("d1", t0)]);

        store.apply_update(update("d1", 19.0), received);

        assert_eq!(store.len(), 1);
        let d1 = store.get("d1").unwrap();
        // Snapshot metadata survives the merge.
        assert_eq!(d1.model.as_deref(), Some("rpi-4b"));
        assert_eq!(d1.location.as_deref(), Some("kitchen"));
        // Fields present in the update overwrite.
        assert_eq!(d1.uptime, Some(120));
        assert_eq!(d1.last_status_update, Some(received));
    }

    #[test]
    fn test_update_idempotent_for_data_but_not_last_update() {
        let mut store = DeviceStore::new();
        let first = at(1_700_000_010_000);
        let second = at(1_700_000_020_000);

        store.apply_update(update("d1", 21.5), first);
        let after_first = store.get("d1").unwrap().clone();

        store.apply_update(update("d1", 21.5), second);
        let after_second = store.get("d1").unwrap();

        // Same payload, same data fields...
        assert_eq!(after_first.last_reading, after_second.last_reading);
        assert_eq!(after_first.uptime, after_second.uptime);
        // ...but each application refreshes the mutation markers.
        assert_eq!(after_second.last_update, Some(second));
        assert_eq!(after_second.last_status_update, Some(second));
        assert_ne!(after_first.last_update, after_second.last_update);
    }

    #[test]
    fn test_newer_reading_supersedes() {
        let mut store = DeviceStore::new();
        store.apply_update(update("d1", 21.5), at(1_700_000_010_000));

        let mut humidity_only = BTreeMap::new();
        humidity_only.insert("humidity".to_string(), 40.0);
        store.apply_update(
            DeviceUpdate {
                id: "d1".to_string(),
                timestamp: None,
                uptime: Some(130),
                sensors_data: humidity_only,
            },
            at(1_700_000_020_000),
        );

        // The old reading is replaced, not merged: temperature is gone.
        let reading = store.get("d1").unwrap().last_reading.as_ref().unwrap();
        assert!(!reading.values.contains_key("temperature"));
        assert_eq!(reading.values.get("humidity"), Some(&40.0));
        // No embedded timestamp: the reading falls back to receipt time.
        assert_eq!(reading.time, at(1_700_000_020_000));
    }

    #[test]
    fn test_device_liveness_is_derived() {
        let t0 = at(1_700_000_000_000);
        let ttl = Duration::from_secs(60);
        let mut store = DeviceStore::new();
        store.apply_snapshot(vec![snapshot_device("d1", t0)]);
        let d1 = store.get("d1").unwrap();

        // No further messages: liveness flips purely with elapsed time.
        assert!(d1.is_online(ttl, at(1_700_000_059_000)));
        assert!(!d1.is_online(ttl, at(1_700_000_061_000)));
    }

    #[test]
    fn test_store_size_invariant() {
        let mut store = DeviceStore::new();
        store.apply_snapshot(vec![snapshot_device("d1", at(0))]);

        store.apply_update(update("d2", 1.0), at(1_000));
        assert_eq!(store.len(), 2);

        store.apply_update(update("d2", 2.0), at(2_000));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_deserialize_update_requires_id() {
        let err = serde_json::from_str::<DeviceUpdate>(
            r#"{"timestamp": 1700000000000, "sensors_data": {"temperature": 21.5}}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_deserialize_rest_record() {
        let json = r#"{
            "device_id": "kitchen-pi",
            "model": "Raspberry Pi 4B",
            "location": "Kitchen",
            "ip_addr": "10.0.0.12",
            "sensors": ["temperature", "humidity"],
            "uptime": 86400,
            "last_status_update": "2024-05-01T12:00:00Z",
            "last_reading": {"time": "2024-05-01T11:59:30Z", "temperature": 21.5, "humidity": 40.2}
        }"#;

        let record: DeviceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.device_id, "kitchen-pi");
        assert_eq!(record.sensors.len(), 2);
        let reading = record.last_reading.unwrap();
        assert_eq!(reading.values.get("humidity"), Some(&40.2));
    }
}
