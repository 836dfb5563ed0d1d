//! Periodic liveness re-evaluation ticker.
//!
//! Liveness is a function of elapsed wall-clock time, so it can change with
//! zero new messages. The ticker is a single recurring tokio task, owned by
//! `main` for the whole session, whose only effect is a unit signal telling
//! the app loop to recompute derived liveness. [`stop`](Ticker::stop)
//! aborts it at teardown.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// An owned, cancellable recurring signal.
#[derive(Debug)]
pub struct Ticker {
    receiver: mpsc::Receiver<()>,
    task: JoinHandle<()>,
}

impl Ticker {
    /// Spawn the ticker on the given runtime.
    pub fn start(handle: &tokio::runtime::Handle, period: Duration) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let task = handle.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick of a tokio interval completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                match tx.try_send(()) {
                    Ok(()) | Err(mpsc::error::TrySendError::Full(())) => {}
                    Err(mpsc::error::TrySendError::Closed(())) => return,
                }
            }
        });
        Self { receiver: rx, task }
    }

    /// Non-blocking check for a pending tick signal.
    pub fn try_tick(&mut self) -> bool {
        self.receiver.try_recv().is_ok()
    }

    /// Cancel the ticker. Called once at session teardown.
    pub fn stop(&self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tick_fires_after_period() {
        let mut ticker = Ticker::start(&tokio::runtime::Handle::current(), Duration::from_millis(10));
        assert!(!ticker.try_tick());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(ticker.try_tick());
        ticker.stop();
    }

    #[tokio::test]
    async fn test_pending_signal_does_not_accumulate() {
        let mut ticker = Ticker::start(&tokio::runtime::Handle::current(), Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Many periods elapsed while nobody drained the channel, but the
        // signal is level-triggered: one pending tick at most.
        assert!(ticker.try_tick());
        assert!(!ticker.try_tick());
        ticker.stop();
    }
}
