// Library crate: public API items may not be used by the binary
#![allow(unused)]

//! # fleet-doctor
//!
//! A realtime TUI dashboard and library for monitoring IoT device fleet
//! telemetry.
//!
//! The crate reconciles two inputs into one authoritative view: a one-time
//! REST snapshot of all known devices, and an unbounded MQTT stream of
//! per-device status updates and monitor-service heartbeats. Devices and
//! the monitoring service itself are classified online/offline with
//! heartbeat-expiry rules, and that classification survives push-channel
//! reconnects and process restarts (the monitor heartbeat is persisted).
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Application                           │
//! │  ┌─────────┐    ┌──────────┐    ┌─────────┐    ┌──────────┐ │
//! │  │  app    │───▶│   data   │───▶│   ui    │───▶│ Terminal │ │
//! │  │(dispatch)    │ (store)  │    │(render) │    │          │ │
//! │  └────┬────┘    └──────────┘    └─────────┘    └──────────┘ │
//! │       │                ▲                                     │
//! │       ▼                │ snapshot / backfill                 │
//! │  ┌─────────┐      ┌────┴────┐                                │
//! │  │ source  │      │   api   │◀── REST backend                │
//! │  │ (MQTT)  │      └─────────┘                                │
//! │  └─────────┘                                                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`app`]**: application state, message dispatch, navigation
//! - **[`source`]**: push-channel abstraction ([`MessageSource`] trait) with
//!   a live MQTT implementation and an in-memory channel for tests
//! - **[`data`]**: the reconciliation core - device store, heartbeat
//!   evaluator, monitor liveness tracker, sensor catalog, reading history
//! - **[`api`]**: bearer-token REST client for snapshot, readings, catalog
//! - **[`persist`]**: injected persistence port for the auth token and the
//!   monitor heartbeat
//! - **[`ticker`]**: session-scoped periodic liveness re-evaluation
//! - **[`ui`]**: terminal rendering using ratatui
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Connect to the default local backend and broker
//! fleet-doctor
//!
//! # Explicit endpoints
//! fleet-doctor --api-url http://backend:8000 --broker-url mqtt://broker:1883
//! ```
//!
//! ### As a library with an injected transport
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use chrono::Utc;
//! use fleet_doctor::{App, ChannelSource, MemoryStore, SensorCatalog};
//!
//! // Create a channel pair standing in for the broker
//! let (tx, source) = ChannelSource::create("embedded");
//!
//! let app = App::new(
//!     Box::new(source),
//!     Arc::new(MemoryStore::new()),
//!     SensorCatalog::default(),
//!     Duration::from_secs(60),
//!     Utc::now(),
//! );
//! ```

pub mod api;
pub mod app;
pub mod data;
pub mod events;
pub mod persist;
pub mod settings;
pub mod source;
pub mod ticker;
pub mod ui;

// Re-export main types for convenience
pub use api::{ApiClient, ApiError};
pub use app::{App, DeviceRow, View};
pub use data::{
    is_alive, DeviceRecord, DeviceStore, DeviceUpdate, Liveness, MonitorStatus, MonitorTracker,
    Reading, ReadingHistory, SensorCatalog, SensorInfo,
};
pub use persist::{FileStore, MemoryStore, StatePort};
pub use settings::Settings;
pub use source::{ChannelSource, ConnectionState, MessageSource, MqttSource, PushMessage};
pub use ticker::Ticker;
