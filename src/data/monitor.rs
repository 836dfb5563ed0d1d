//! Monitor-service liveness tracking.
//!
//! The monitoring service announces itself with periodic heartbeats on the
//! push channel. This tracker distinguishes "never heard from" (unknown)
//! from "heard from but now stale" (offline) from "currently fresh"
//! (online), because the UI must not claim Offline before any data exists.
//! The last heartbeat is persisted through a [`StatePort`] so the
//! classification survives a restart without waiting a full TTL.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use super::liveness::is_alive;
use crate::persist::StatePort;

/// Wire payload of the `monitor/status` topic.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorStatus {
    /// Epoch seconds of the monitor's last heartbeat.
    pub last_heartbeat_timestamp: i64,
}

impl MonitorStatus {
    /// The heartbeat as a UTC timestamp, `None` if out of range.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.last_heartbeat_timestamp, 0)
    }
}

/// How often a held heartbeat is re-evaluated against the TTL.
pub const CHECK_INTERVAL: Duration = Duration::from_secs(5);

/// Tri-state liveness classification of the monitoring service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// No heartbeat observed yet and the grace period has not elapsed.
    Unknown,
    /// The last heartbeat is within the TTL window.
    Online,
    /// The grace period elapsed with no heartbeat, or the last one went stale.
    Offline,
}

impl Liveness {
    pub fn label(&self) -> &'static str {
        match self {
            Liveness::Unknown => "waiting",
            Liveness::Online => "online",
            Liveness::Offline => "offline",
        }
    }
}

/// Stateful tracker for monitor-service liveness.
///
/// Driven entirely from the single event-loop thread: heartbeat messages
/// arrive via [`record_heartbeat`](Self::record_heartbeat) and elapsed-time
/// transitions happen in [`poll`](Self::poll). The pending declare-offline
/// action and the periodic re-check are deadlines evaluated by `poll`, so a
/// heartbeat cancels them by disarming the deadline.
#[derive(Debug)]
pub struct MonitorTracker {
    ttl: Duration,
    last_heartbeat: Option<DateTime<Utc>>,
    liveness: Liveness,
    /// Pending declare-offline deadline while no heartbeat has been seen.
    grace_deadline: Option<DateTime<Utc>>,
    /// Next periodic re-evaluation; `None` once offline until a new
    /// heartbeat restarts the cycle.
    next_check: Option<DateTime<Utc>>,
}

impl MonitorTracker {
    /// Construct from persisted state.
    ///
    /// A persisted heartbeat that is still alive yields `Online` and keeps
    /// the value. An expired one is cleared from persistence (never left
    /// stale) and the tracker starts `Unknown` with the grace period armed,
    /// exactly as if nothing had been persisted.
    pub fn restore(port: &dyn StatePort, ttl: Duration, now: DateTime<Utc>) -> Self {
        match port.load_heartbeat() {
            Some(ts) if is_alive(Some(ts), ttl, now) => {
                debug!(heartbeat = %ts, "restored monitor heartbeat");
                Self {
                    ttl,
                    last_heartbeat: Some(ts),
                    liveness: Liveness::Online,
                    grace_deadline: None,
                    next_check: Some(now + chrono_interval(CHECK_INTERVAL)),
                }
            }
            persisted => {
                if persisted.is_some() {
                    debug!("persisted monitor heartbeat expired, clearing");
                    port.clear_heartbeat();
                }
                Self {
                    ttl,
                    last_heartbeat: None,
                    liveness: Liveness::Unknown,
                    grace_deadline: Some(now + chrono_interval(ttl)),
                    next_check: None,
                }
            }
        }
    }

    /// Record a heartbeat message.
    ///
    /// Persists the timestamp and flips to `Online` immediately; there is
    /// no grace period on the online transition. Any pending declare-offline
    /// deadline is cancelled and the periodic check restarts.
    pub fn record_heartbeat(
        &mut self,
        ts: DateTime<Utc>,
        port: &dyn StatePort,
        now: DateTime<Utc>,
    ) {
        port.save_heartbeat(ts);
        self.last_heartbeat = Some(ts);
        self.liveness = Liveness::Online;
        self.grace_deadline = None;
        self.next_check = Some(now + chrono_interval(CHECK_INTERVAL));
    }

    /// Re-evaluate elapsed-time transitions.
    ///
    /// Returns `true` when the liveness classification changed.
    pub fn poll(&mut self, now: DateTime<Utc>) -> bool {
        match self.liveness {
            Liveness::Unknown => {
                if self.grace_deadline.is_some_and(|deadline| now >= deadline) {
                    self.grace_deadline = None;
                    self.liveness = Liveness::Offline;
                    return true;
                }
                false
            }
            Liveness::Online => {
                let Some(next_check) = self.next_check else {
                    return false;
                };
                if now < next_check {
                    return false;
                }
                if is_alive(self.last_heartbeat, self.ttl, now) {
                    self.next_check = Some(now + chrono_interval(CHECK_INTERVAL));
                    false
                } else {
                    // First failing check: flip and stop re-confirming until
                    // a new heartbeat restarts the cycle.
                    self.next_check = None;
                    self.liveness = Liveness::Offline;
                    true
                }
            }
            Liveness::Offline => false,
        }
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness
    }

    pub fn last_heartbeat(&self) -> Option<DateTime<Utc>> {
        self.last_heartbeat
    }
}

fn chrono_interval(d: Duration) -> chrono::Duration {
    chrono::Duration::milliseconds(d.as_millis() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemoryStore;
    use chrono::TimeZone;

    const TTL: Duration = Duration::from_secs(60);

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_starts_unknown_without_persisted_heartbeat() {
        let port = MemoryStore::new();
        let tracker = MonitorTracker::restore(&port, TTL, at(0));
        assert_eq!(tracker.liveness(), Liveness::Unknown);
        assert!(tracker.last_heartbeat().is_none());
    }

    #[test]
    fn test_grace_period_escalates_to_offline() {
        let port = MemoryStore::new();
        let mut tracker = MonitorTracker::restore(&port, TTL, at(0));

        assert!(!tracker.poll(at(59)));
        assert_eq!(tracker.liveness(), Liveness::Unknown);

        assert!(tracker.poll(at(60)));
        assert_eq!(tracker.liveness(), Liveness::Offline);
    }

    #[test]
    fn test_heartbeat_cancels_pending_offline() {
        let port = MemoryStore::new();
        let mut tracker = MonitorTracker::restore(&port, TTL, at(0));

        // Heartbeat at second 30 disarms the pending declare-offline.
        tracker.record_heartbeat(at(30), &port, at(30));
        assert_eq!(tracker.liveness(), Liveness::Online);

        // The original grace deadline passes without effect.
        assert!(!tracker.poll(at(60)));
        assert_eq!(tracker.liveness(), Liveness::Online);
    }

    #[test]
    fn test_stale_heartbeat_flips_offline_and_pauses_checks() {
        let port = MemoryStore::new();
        let mut tracker = MonitorTracker::restore(&port, TTL, at(0));
        tracker.record_heartbeat(at(0), &port, at(0));

        // Within the TTL the periodic checks keep confirming online.
        assert!(!tracker.poll(at(5)));
        assert!(!tracker.poll(at(55)));
        assert_eq!(tracker.liveness(), Liveness::Online);

        // First failing check flips offline...
        assert!(tracker.poll(at(65)));
        assert_eq!(tracker.liveness(), Liveness::Offline);

        // ...and stays there without further transitions.
        assert!(!tracker.poll(at(200)));
        assert_eq!(tracker.liveness(), Liveness::Offline);
    }

    #[test]
    fn test_check_interval_gates_reevaluation() {
        let port = MemoryStore::new();
        let mut tracker = MonitorTracker::restore(&port, TTL, at(0));
        tracker.record_heartbeat(at(0), &port, at(0));

        // Polls inside the check interval are no-ops even past the TTL
        // once a check has just run.
        assert!(!tracker.poll(at(5)));
        assert!(!tracker.poll(at(7)));
        assert_eq!(tracker.liveness(), Liveness::Online);
    }

    #[test]
    fn test_heartbeat_revives_after_offline() {
        let port = MemoryStore::new();
        let mut tracker = MonitorTracker::restore(&port, TTL, at(0));
        tracker.record_heartbeat(at(0), &port, at(0));
        tracker.poll(at(65));
        assert_eq!(tracker.liveness(), Liveness::Offline);

        tracker.record_heartbeat(at(70), &port, at(70));
        assert_eq!(tracker.liveness(), Liveness::Online);

        // The periodic check resumed.
        assert!(tracker.poll(at(140)));
        assert_eq!(tracker.liveness(), Liveness::Offline);
    }

    #[test]
    fn test_restore_fresh_persisted_heartbeat() {
        let port = MemoryStore::new();
        port.save_heartbeat(at(0));

        let tracker = MonitorTracker::restore(&port, TTL, at(30));
        assert_eq!(tracker.liveness(), Liveness::Online);
        assert_eq!(tracker.last_heartbeat(), Some(at(0)));
        // The persisted value is kept.
        assert_eq!(port.load_heartbeat(), Some(at(0)));
    }

    #[test]
    fn test_deserialize_monitor_status() {
        let status: MonitorStatus =
            serde_json::from_str(r#"{"last_heartbeat_timestamp": 1700000000}"#).unwrap();
        assert_eq!(status.timestamp(), Some(at(0)));
    }

    #[test]
    fn test_restore_expired_persisted_heartbeat_clears_it() {
        let port = MemoryStore::new();
        port.save_heartbeat(at(0));

        let tracker = MonitorTracker::restore(&port, TTL, at(120));
        assert_eq!(tracker.liveness(), Liveness::Unknown);
        // Stale entries are cleared rather than left behind.
        assert_eq!(port.load_heartbeat(), None);
    }
}
