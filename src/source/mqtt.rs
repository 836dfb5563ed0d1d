//! MQTT push-channel manager.
//!
//! Owns the single broker connection for the lifetime of the application
//! session. A background task drives the rumqttc event loop: on connect it
//! (re)subscribes to the monitor-status topic and the wildcard device
//! family, and every publish is forwarded unmodified through an mpsc
//! channel to the event-loop thread. On transport errors the task logs,
//! flips the connection-state watch, and waits out the reconnect period;
//! re-establishing the session is the event loop's own retry policy.
//!
//! Nothing here closes the connection on a view change: [`shutdown`]
//! (MessageSource::shutdown) is called exactly once, at application
//! teardown.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::{ConnectionState, MessageSource, PushMessage, DEVICE_STATUS_PATTERN, MONITOR_STATUS_TOPIC};
use crate::settings::Settings;

/// Keepalive matching the broker-side heartbeat expectations.
const KEEP_ALIVE: Duration = Duration::from_secs(60);

/// Pause between reconnect attempts after a transport error.
const RECONNECT_PERIOD: Duration = Duration::from_secs(5);

/// A live MQTT subscription forwarding raw messages to the consumer.
#[derive(Debug)]
pub struct MqttSource {
    receiver: mpsc::Receiver<PushMessage>,
    state: watch::Receiver<ConnectionState>,
    description: String,
    last_error: Arc<Mutex<Option<String>>>,
    driver: JoinHandle<()>,
}

impl MqttSource {
    /// Establish the session-scoped connection and spawn the driver task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(settings: &Settings) -> anyhow::Result<Self> {
        let (host, port) = settings.broker_host_port()?;

        let client_id = format!("fleet-doctor-{}", std::process::id());
        let mut options = MqttOptions::new(client_id, host, port);
        options.set_keep_alive(KEEP_ALIVE);
        options.set_clean_session(true);
        if let (Some(user), Some(pass)) = (&settings.mqtt_username, &settings.mqtt_password) {
            options.set_credentials(user.clone(), pass.clone());
        }

        let (client, eventloop) = AsyncClient::new(options, 64);
        let (tx, rx) = mpsc::channel(256);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let last_error = Arc::new(Mutex::new(None));

        let driver = tokio::spawn(drive(
            client,
            eventloop,
            tx,
            state_tx,
            last_error.clone(),
        ));

        Ok(Self {
            receiver: rx,
            state: state_rx,
            description: format!("mqtt: {}", settings.broker_url),
            last_error,
            driver,
        })
    }
}

impl MessageSource for MqttSource {
    fn poll(&mut self) -> Option<PushMessage> {
        match self.receiver.try_recv() {
            Ok(message) => Some(message),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                *self.last_error.lock().unwrap() = Some("push channel closed".to_string());
                None
            }
        }
    }

    fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap().clone()
    }

    fn shutdown(&self) {
        self.driver.abort();
    }
}

/// Drive the event loop until the consumer goes away.
async fn drive(
    client: AsyncClient,
    mut eventloop: rumqttc::EventLoop,
    tx: mpsc::Sender<PushMessage>,
    state: watch::Sender<ConnectionState>,
    last_error: Arc<Mutex<Option<String>>>,
) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!("mqtt connected");
                *last_error.lock().unwrap() = None;
                let _ = state.send(ConnectionState::Connected);

                // Clean session: subscriptions do not survive a reconnect,
                // so they are re-issued on every ConnAck.
                for topic in [MONITOR_STATUS_TOPIC, DEVICE_STATUS_PATTERN] {
                    if let Err(e) = client.subscribe(topic, QoS::AtMostOnce).await {
                        error!("subscribe to {topic} failed: {e}");
                    }
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let message = PushMessage {
                    topic: publish.topic.clone(),
                    payload: publish.payload.to_vec(),
                };
                if tx.send(message).await.is_err() {
                    // Consumer dropped: application teardown.
                    return;
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!("mqtt transport error: {e}");
                *last_error.lock().unwrap() = Some(e.to_string());
                let _ = state.send(ConnectionState::Disconnected);
                tokio::time::sleep(RECONNECT_PERIOD).await;
            }
        }
    }
}
