//! Heartbeat liveness evaluation.
//!
//! A single pure function decides whether an entity (a device or the
//! monitoring service) is still alive given the timestamp of its last
//! heartbeat and a time-to-live. Both the device store and the monitor
//! tracker derive their online/offline classification from it.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Default time-to-live for heartbeats, in seconds.
///
/// An entity whose last heartbeat is older than this is considered offline.
pub const HEARTBEAT_TTL_SECS: u64 = 60;

/// Decide whether an entity is alive at `now`.
///
/// Returns `false` when no heartbeat has ever been seen. Otherwise the
/// entity is alive iff `now <= last_seen + ttl` at millisecond precision:
/// the TTL window is closed, so a heartbeat exactly `ttl` old still counts
/// as alive and one millisecond older does not.
pub fn is_alive(last_seen: Option<DateTime<Utc>>, ttl: Duration, now: DateTime<Utc>) -> bool {
    let Some(last_seen) = last_seen else {
        return false;
    };
    let ttl_ms = ttl.as_millis() as i64;
    now.timestamp_millis() <= last_seen.timestamp_millis() + ttl_ms
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn test_heartbeat_now_is_alive() {
        let now = at(1_700_000_000_000);
        for ttl in [1, 5, 60, 3600] {
            assert!(is_alive(Some(now), Duration::from_secs(ttl), now));
        }
    }

    #[test]
    fn test_closed_window_boundary() {
        let last = at(1_700_000_000_000);
        let ttl = Duration::from_secs(60);

        // Exactly at the boundary: still alive.
        assert!(is_alive(Some(last), ttl, at(1_700_000_000_000 + 60_000)));
        // One millisecond past: not alive.
        assert!(!is_alive(Some(last), ttl, at(1_700_000_000_000 + 60_001)));
    }

    #[test]
    fn test_absent_is_never_alive() {
        let now = at(1_700_000_000_000);
        assert!(!is_alive(None, Duration::from_secs(60), now));
        assert!(!is_alive(None, Duration::ZERO, now));
    }

    #[test]
    fn test_zero_ttl() {
        let last = at(1_700_000_000_000);
        // With a zero TTL only an instantaneous heartbeat is alive.
        assert!(is_alive(Some(last), Duration::ZERO, last));
        assert!(!is_alive(Some(last), Duration::ZERO, at(1_700_000_000_001)));
    }
}
