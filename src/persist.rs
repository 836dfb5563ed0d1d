//! Persisted client-side state.
//!
//! Two values survive a restart: the auth token and the monitor's last
//! heartbeat timestamp (so monitor liveness does not wait a full TTL for a
//! fresh heartbeat after a relaunch). Rather than ambient global storage,
//! persistence is an explicitly injected port so the tracker and the REST
//! client can be tested against an in-memory implementation.

use std::fmt::Debug;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Port for the two persisted values.
///
/// Implementations log-and-continue on storage failures; losing persisted
/// state degrades to the first-launch experience, never to a crash.
pub trait StatePort: Send + Sync + Debug {
    fn load_heartbeat(&self) -> Option<DateTime<Utc>>;
    fn save_heartbeat(&self, ts: DateTime<Utc>);
    fn clear_heartbeat(&self);

    fn load_token(&self) -> Option<String>;
    fn save_token(&self, token: &str);
    fn clear_token(&self);
}

/// On-disk layout of the state file.
///
/// The heartbeat is stored in epoch seconds, the unit the wire payload
/// carries; conversion to [`DateTime<Utc>`] happens at this boundary.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SavedState {
    #[serde(skip_serializing_if = "Option::is_none")]
    monitor_heartbeat: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
}

/// JSON-file implementation under the platform data directory.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Open the default state file (e.g. `~/.local/share/fleet-doctor/state.json`).
    pub fn open() -> Result<Self> {
        let dirs = ProjectDirs::from("org", "pragma", "fleet-doctor")
            .context("no home directory available for state storage")?;
        fs::create_dir_all(dirs.data_dir())
            .with_context(|| format!("creating {}", dirs.data_dir().display()))?;
        Ok(Self {
            path: dirs.data_dir().join("state.json"),
        })
    }

    /// Open a state file at an explicit path.
    pub fn open_at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> SavedState {
        match fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(path = %self.path.display(), "unreadable state file: {e}");
                SavedState::default()
            }),
            Err(_) => SavedState::default(),
        }
    }

    fn write(&self, state: &SavedState) {
        let json = match serde_json::to_string_pretty(state) {
            Ok(json) => json,
            Err(e) => {
                warn!("failed to serialize state: {e}");
                return;
            }
        };
        if let Err(e) = fs::write(&self.path, json) {
            warn!(path = %self.path.display(), "failed to write state file: {e}");
        }
    }
}

impl StatePort for FileStore {
    fn load_heartbeat(&self) -> Option<DateTime<Utc>> {
        let secs = self.read().monitor_heartbeat?;
        DateTime::from_timestamp(secs, 0)
    }

    fn save_heartbeat(&self, ts: DateTime<Utc>) {
        let mut state = self.read();
        state.monitor_heartbeat = Some(ts.timestamp());
        self.write(&state);
    }

    fn clear_heartbeat(&self) {
        let mut state = self.read();
        state.monitor_heartbeat = None;
        self.write(&state);
    }

    fn load_token(&self) -> Option<String> {
        self.read().token
    }

    fn save_token(&self, token: &str) {
        let mut state = self.read();
        state.token = Some(token.to_string());
        self.write(&state);
    }

    fn clear_token(&self) {
        let mut state = self.read();
        state.token = None;
        self.write(&state);
    }
}

/// In-memory implementation for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    heartbeat: Mutex<Option<DateTime<Utc>>>,
    token: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatePort for MemoryStore {
    fn load_heartbeat(&self) -> Option<DateTime<Utc>> {
        *self.heartbeat.lock().unwrap()
    }

    fn save_heartbeat(&self, ts: DateTime<Utc>) {
        *self.heartbeat.lock().unwrap() = Some(ts);
    }

    fn clear_heartbeat(&self) {
        *self.heartbeat.lock().unwrap() = None;
    }

    fn load_token(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }

    fn save_token(&self, token: &str) {
        *self.token.lock().unwrap() = Some(token.to_string());
    }

    fn clear_token(&self) {
        *self.token.lock().unwrap() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.load_heartbeat().is_none());
        assert!(store.load_token().is_none());

        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        store.save_heartbeat(ts);
        store.save_token("abc123");

        assert_eq!(store.load_heartbeat(), Some(ts));
        assert_eq!(store.load_token().as_deref(), Some("abc123"));

        store.clear_heartbeat();
        assert!(store.load_heartbeat().is_none());
        assert_eq!(store.load_token().as_deref(), Some("abc123"));
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open_at(dir.path().join("state.json"));

        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        store.save_heartbeat(ts);
        store.save_token("bearer-token");

        // A fresh handle re-reads from disk.
        let reopened = FileStore::open_at(dir.path().join("state.json"));
        assert_eq!(reopened.load_heartbeat(), Some(ts));
        assert_eq!(reopened.load_token().as_deref(), Some("bearer-token"));

        // Each value clears independently.
        reopened.clear_token();
        assert_eq!(reopened.load_heartbeat(), Some(ts));
        assert!(reopened.load_token().is_none());
    }

    #[test]
    fn test_file_store_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open_at(dir.path().join("absent.json"));
        assert!(store.load_heartbeat().is_none());
        assert!(store.load_token().is_none());
    }

    #[test]
    fn test_file_store_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "not json").unwrap();

        let store = FileStore::open_at(&path);
        assert!(store.load_heartbeat().is_none());

        // Saving over a corrupt file recovers it.
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        store.save_heartbeat(ts);
        assert_eq!(store.load_heartbeat(), Some(ts));
    }
}
