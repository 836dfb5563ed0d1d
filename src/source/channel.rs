//! In-memory push-message source.
//!
//! Backs the [`MessageSource`] trait with a plain mpsc pair so the
//! dispatcher and store can be exercised without a broker, and so
//! embedders can inject their own transport.

use tokio::sync::mpsc;

use super::{ConnectionState, MessageSource, PushMessage};

/// A message source fed through a channel.
#[derive(Debug)]
pub struct ChannelSource {
    receiver: mpsc::Receiver<PushMessage>,
    description: String,
    closed: bool,
}

impl ChannelSource {
    /// Create a sender/source pair.
    pub fn create(description: &str) -> (mpsc::Sender<PushMessage>, Self) {
        let (tx, rx) = mpsc::channel(256);
        let source = Self {
            receiver: rx,
            description: format!("channel: {description}"),
            closed: false,
        };
        (tx, source)
    }
}

impl MessageSource for ChannelSource {
    fn poll(&mut self) -> Option<PushMessage> {
        match self.receiver.try_recv() {
            Ok(message) => Some(message),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                self.closed = true;
                None
            }
        }
    }

    fn connection_state(&self) -> ConnectionState {
        if self.closed {
            ConnectionState::Disconnected
        } else {
            ConnectionState::Connected
        }
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn last_error(&self) -> Option<String> {
        self.closed.then(|| "channel closed".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(topic: &str) -> PushMessage {
        PushMessage {
            topic: topic.to_string(),
            payload: b"{}".to_vec(),
        }
    }

    #[test]
    fn test_delivers_in_send_order() {
        let (tx, mut source) = ChannelSource::create("test");
        tx.try_send(message("monitor/status")).unwrap();
        tx.try_send(message("websockets/d1/status")).unwrap();

        assert_eq!(source.poll().unwrap().topic, "monitor/status");
        assert_eq!(source.poll().unwrap().topic, "websockets/d1/status");
        assert!(source.poll().is_none());
    }

    #[test]
    fn test_disconnect_on_sender_drop() {
        let (tx, mut source) = ChannelSource::create("test");
        assert_eq!(source.connection_state(), ConnectionState::Connected);

        drop(tx);
        assert!(source.poll().is_none());
        assert_eq!(source.connection_state(), ConnectionState::Disconnected);
        assert!(source.last_error().is_some());
    }
}
