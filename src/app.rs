//! Application state and message dispatch.
//!
//! The `App` owns the reconciliation core: the device store, the monitor
//! tracker, the reading history, and the push-message source. The main
//! loop drains the source through [`pump_messages`](App::pump_messages)
//! and drives elapsed-time transitions through [`tick`](App::tick) and
//! [`refresh_liveness`](App::refresh_liveness), so every mutation happens
//! on one logical thread between renders.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::api::ApiError;
use crate::data::{
    DeviceRecord, DeviceStore, DeviceUpdate, MonitorStatus, MonitorTracker, Reading,
    ReadingHistory, SensorCatalog,
};
use crate::persist::StatePort;
use crate::source::{device_id_from_topic, ConnectionState, MessageSource, PushMessage, MONITOR_STATUS_TOPIC};
use crate::ui::Theme;

/// The current view/tab in the TUI.
///
/// Device detail is shown as an overlay (controlled by
/// `App::show_detail_overlay`) rather than as a separate view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// All known devices with liveness badges.
    Devices,
    /// The sensor catalog.
    Sensors,
}

impl View {
    /// Cycle to the next view.
    pub fn next(self) -> Self {
        match self {
            View::Devices => View::Sensors,
            View::Sensors => View::Devices,
        }
    }

    /// Cycle to the previous view.
    pub fn prev(self) -> Self {
        self.next()
    }
}

/// A device row with its derived liveness, as displayed.
///
/// Rows are rebuilt when messages arrive and when the re-evaluation ticker
/// fires; liveness is a function of elapsed time, so it can go stale
/// between rebuilds.
#[derive(Debug, Clone)]
pub struct DeviceRow {
    pub record: DeviceRecord,
    pub online: bool,
}

/// Main application state.
pub struct App {
    pub running: bool,
    pub current_view: View,
    pub show_help: bool,
    pub show_detail_overlay: bool,

    // Reconciliation core
    source: Box<dyn MessageSource>,
    state_port: Arc<dyn StatePort>,
    pub store: DeviceStore,
    pub monitor: MonitorTracker,
    pub history: ReadingHistory,
    pub sensors: SensorCatalog,
    pub ttl: Duration,
    rows: Vec<DeviceRow>,

    // Navigation and filtering
    pub selected_index: usize,
    pub show_only_online: bool,

    // Async fetches in flight (resolved by the main loop)
    refresh_requested: bool,
    backfill_requested: Option<String>,

    // UI
    pub theme: Theme,
    pub load_error: Option<String>,
    status_message: Option<(String, std::time::Instant)>,
}

impl App {
    /// Create the app, restoring monitor liveness from persisted state.
    pub fn new(
        source: Box<dyn MessageSource>,
        state_port: Arc<dyn StatePort>,
        sensors: SensorCatalog,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        let monitor = MonitorTracker::restore(&*state_port, ttl, now);
        Self {
            running: true,
            current_view: View::Devices,
            show_help: false,
            show_detail_overlay: false,
            source,
            state_port,
            store: DeviceStore::new(),
            monitor,
            history: ReadingHistory::new(),
            sensors,
            ttl,
            rows: Vec::new(),
            selected_index: 0,
            show_only_online: false,
            refresh_requested: false,
            backfill_requested: None,
            theme: Theme::auto_detect(),
            load_error: None,
            status_message: None,
        }
    }

    /// Replace the store with a REST snapshot.
    pub fn set_snapshot(&mut self, devices: Vec<DeviceRecord>, now: DateTime<Utc>) {
        self.store.apply_snapshot(devices);
        self.load_error = None;
        self.rebuild_rows(now);
    }

    /// Drain the push source, dispatching each message. Returns how many
    /// messages were applied.
    pub fn pump_messages(&mut self, now: DateTime<Utc>) -> usize {
        let mut applied = 0;
        while let Some(message) = self.source.poll() {
            if self.dispatch(message, now) {
                applied += 1;
            }
        }
        if applied > 0 {
            self.rebuild_rows(now);
        }
        applied
    }

    /// Route one raw message to the store or the tracker.
    ///
    /// Malformed payloads are logged and dropped, leaving the store
    /// unchanged; a wildcard match with an unexpected suffix is ignored.
    fn dispatch(&mut self, message: PushMessage, now: DateTime<Utc>) -> bool {
        if message.topic == MONITOR_STATUS_TOPIC {
            let status: MonitorStatus = match serde_json::from_slice(&message.payload) {
                Ok(status) => status,
                Err(e) => {
                    warn!("invalid monitor status payload: {e}");
                    return false;
                }
            };
            let Some(ts) = status.timestamp() else {
                warn!(
                    "monitor heartbeat timestamp out of range: {}",
                    status.last_heartbeat_timestamp
                );
                return false;
            };
            self.monitor.record_heartbeat(ts, &*self.state_port, now);
            return true;
        }

        if device_id_from_topic(&message.topic).is_some() {
            let update: DeviceUpdate = match serde_json::from_slice(&message.payload) {
                Ok(update) => update,
                Err(e) => {
                    warn!(topic = %message.topic, "invalid device payload: {e}");
                    return false;
                }
            };
            let device_id = update.id.clone();
            self.store.apply_update(update, now);
            if let Some(reading) = self.store.get(&device_id).and_then(|d| d.last_reading.clone()) {
                self.history.record(&device_id, reading);
            }
            return true;
        }

        false
    }

    /// Drive elapsed-time monitor transitions. Returns true on a change.
    pub fn tick(&mut self, now: DateTime<Utc>) -> bool {
        self.monitor.poll(now)
    }

    /// Recompute derived liveness for every device (the ticker's effect).
    pub fn refresh_liveness(&mut self, now: DateTime<Utc>) {
        self.rebuild_rows(now);
    }

    fn rebuild_rows(&mut self, now: DateTime<Utc>) {
        self.rows = self
            .store
            .devices()
            .iter()
            .map(|record| DeviceRow {
                online: record.is_online(self.ttl, now),
                record: record.clone(),
            })
            .collect();

        let visible = self.visible_rows().len();
        if self.selected_index >= visible {
            self.selected_index = visible.saturating_sub(1);
        }
    }

    /// Rows after applying the online-only filter.
    pub fn visible_rows(&self) -> Vec<&DeviceRow> {
        self.rows
            .iter()
            .filter(|row| !self.show_only_online || row.online)
            .collect()
    }

    /// The currently selected device row, if any.
    pub fn selected_row(&self) -> Option<&DeviceRow> {
        self.visible_rows().get(self.selected_index).copied()
    }

    pub fn select_next(&mut self) {
        let max = self.visible_rows().len().saturating_sub(1);
        self.selected_index = (self.selected_index + 1).min(max);
    }

    pub fn select_prev(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
    }

    pub fn select_first(&mut self) {
        self.selected_index = 0;
    }

    pub fn select_last(&mut self) {
        self.selected_index = self.visible_rows().len().saturating_sub(1);
    }

    /// Toggle the online-only device filter.
    pub fn toggle_online_filter(&mut self) {
        self.show_only_online = !self.show_only_online;
        let visible = self.visible_rows().len();
        if self.selected_index >= visible {
            self.selected_index = visible.saturating_sub(1);
        }
    }

    /// Open the detail overlay for the selected device and request a
    /// reading-history backfill for it.
    pub fn enter_detail(&mut self) {
        if self.current_view != View::Devices {
            return;
        }
        if let Some(row) = self.selected_row() {
            self.backfill_requested = Some(row.record.device_id.clone());
            self.show_detail_overlay = true;
        }
    }

    /// Navigate back: close overlays first, then fall back to Devices.
    pub fn go_back(&mut self) {
        if self.show_detail_overlay {
            self.show_detail_overlay = false;
        } else if self.current_view != View::Devices {
            self.current_view = View::Devices;
        }
    }

    pub fn next_view(&mut self) {
        self.current_view = self.current_view.next();
        self.selected_index = 0;
    }

    pub fn prev_view(&mut self) {
        self.current_view = self.current_view.prev();
        self.selected_index = 0;
    }

    pub fn set_view(&mut self, view: View) {
        self.current_view = view;
        self.selected_index = 0;
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Ask the main loop to re-fetch the REST snapshot.
    pub fn request_refresh(&mut self) {
        self.refresh_requested = true;
    }

    /// Take a pending snapshot-refresh request.
    pub fn take_refresh_request(&mut self) -> bool {
        std::mem::take(&mut self.refresh_requested)
    }

    /// Take a pending reading-backfill request.
    pub fn take_backfill_request(&mut self) -> Option<String> {
        self.backfill_requested.take()
    }

    /// Apply the result of an asynchronous snapshot re-fetch.
    pub fn apply_snapshot_result(
        &mut self,
        result: Result<Vec<DeviceRecord>, ApiError>,
        now: DateTime<Utc>,
    ) {
        match result {
            Ok(devices) => {
                let count = devices.len();
                self.set_snapshot(devices, now);
                self.set_status_message(format!("Snapshot refreshed: {count} devices"));
            }
            Err(e) => {
                self.load_error = Some(e.to_string());
            }
        }
    }

    /// Apply the result of an asynchronous reading backfill.
    pub fn apply_backfill_result(
        &mut self,
        device_id: &str,
        result: Result<Vec<Reading>, ApiError>,
    ) {
        match result {
            Ok(readings) => self.history.backfill(device_id, readings),
            Err(e) => self.set_status_message(format!("Readings fetch failed: {e}")),
        }
    }

    /// Returns a description of the push source.
    pub fn source_description(&self) -> &str {
        self.source.description()
    }

    /// Connection state of the push source, for the header.
    pub fn connection_state(&self) -> ConnectionState {
        self.source.connection_state()
    }

    /// Tear the push source down. Called once at application teardown; the
    /// connection is session-scoped and must never close on a view change.
    pub fn shutdown_source(&self) {
        self.source.shutdown();
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, std::time::Instant::now()));
    }

    /// Get the current status message if it hasn't expired (3 seconds).
    pub fn get_status_message(&self) -> Option<&str> {
        if let Some((msg, time)) = &self.status_message {
            if time.elapsed() < Duration::from_secs(3) {
                return Some(msg);
            }
        }
        None
    }

    /// Signal the application to quit.
    pub fn quit(&mut self) {
        self.running = false;
    }
}
