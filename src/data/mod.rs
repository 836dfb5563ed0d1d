//! Data models and the reconciliation core.
//!
//! ## Submodules
//!
//! - [`liveness`]: the pure heartbeat evaluator shared by devices and the monitor
//! - [`device`]: device records and the canonical [`DeviceStore`]
//! - [`monitor`]: tri-state monitor-service liveness with persisted heartbeat
//! - [`sensor`]: immutable sensor catalog reference data
//! - [`history`]: bounded reading history for sparklines
//!
//! ## Data flow
//!
//! ```text
//! REST snapshot ──▶ DeviceStore::apply_snapshot()
//! push update   ──▶ DeviceStore::apply_update() ──▶ ReadingHistory::record()
//! monitor/status ─▶ MonitorTracker::record_heartbeat()
//! elapsed time  ──▶ is_alive() (on read, and re-forced by the ticker)
//! ```

pub mod device;
pub mod history;
pub mod liveness;
pub mod monitor;
pub mod sensor;

pub use device::{DeviceRecord, DeviceStore, DeviceUpdate, Reading};
pub use history::ReadingHistory;
pub use liveness::{is_alive, HEARTBEAT_TTL_SECS};
pub use monitor::{Liveness, MonitorStatus, MonitorTracker};
pub use sensor::{SensorCatalog, SensorInfo};
