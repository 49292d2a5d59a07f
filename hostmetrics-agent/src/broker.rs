//! MQTT broker connection for the publisher session
//!
//! The connect attempt runs inside the event-loop task; the caller only
//! waits for its outcome, one polling quantum at a time, so a slow broker
//! never causes a second attempt. A definitive refusal is returned as
//! [`ConnectError::Refused`] and is fatal for the process.

use crate::config::BrokerSettings;
use crate::error::{ConnectError, PublishError};
use rumqttc::{AsyncClient, ConnectionError, Event, EventLoop, Incoming, MqttOptions, QoS};
use std::future::Future;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Pending requests queued for the event loop; publishes beyond it are rejected
const REQUEST_CAPACITY: usize = 10;

/// Publish side of a broker session
pub trait BrokerSession {
    fn send(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: String,
    ) -> impl Future<Output = Result<(), PublishError>> + Send;
}

/// Source of MQTT events (the rumqttc event loop in production)
pub trait EventSource {
    fn next_event(&mut self) -> impl Future<Output = Result<Event, ConnectionError>> + Send;
}

impl BrokerSession for AsyncClient {
    // Never waits for room in the request queue: a broker outage must not stall the pass
    async fn send(&self, topic: &str, qos: QoS, retain: bool, payload: String) -> Result<(), PublishError> {
        self.try_publish(topic, qos, retain, payload)?;
        Ok(())
    }
}

impl EventSource for EventLoop {
    async fn next_event(&mut self) -> Result<Event, ConnectionError> {
        self.poll().await
    }
}

/// Session options: broker address, credentials (only when a username is set), client ID
pub fn mqtt_options(client_id: &str, settings: &BrokerSettings) -> MqttOptions {
    let mut options = MqttOptions::new(client_id, &settings.host, settings.port);
    options.set_keep_alive(settings.keep_alive);
    options.set_clean_session(true);

    if !settings.username.is_empty() {
        options.set_credentials(&settings.username, &settings.password);
    }

    options
}

/// Open the publisher session and wait until the broker acknowledges it
pub async fn connect(client_id: &str, settings: &BrokerSettings) -> Result<AsyncClient, ConnectError> {
    info!(
        "Connecting to MQTT broker {}:{} as {}",
        settings.host, settings.port, client_id
    );

    let (client, eventloop) = AsyncClient::new(mqtt_options(client_id, settings), REQUEST_CAPACITY);

    let (ack_tx, ack_rx) = oneshot::channel();
    tokio::spawn(drive_event_loop(eventloop, ack_tx, settings.reconnect_delay));

    wait_for_connack(ack_rx, settings.connect_wait, settings.max_connect_polls).await?;

    info!("Connected to MQTT broker {}:{}", settings.host, settings.port);
    Ok(client)
}

/// Poll the event loop forever.
///
/// The first `ConnAck` or error is reported through `ack`. An error before
/// that ends the task; afterwards errors are logged and polling resumes
/// after `reconnect_delay`.
pub async fn drive_event_loop<E>(
    mut events: E,
    ack: oneshot::Sender<Result<(), ConnectError>>,
    reconnect_delay: Duration,
) where
    E: EventSource + Send + 'static,
{
    let mut ack = Some(ack);

    loop {
        match events.next_event().await {
            Ok(Event::Incoming(Incoming::ConnAck(connack))) => match ack.take() {
                Some(tx) => {
                    debug!("Broker accepted session: {:?}", connack.code);
                    let _ = tx.send(Ok(()));
                }
                None => info!("Reconnected to MQTT broker"),
            },
            Ok(_) => {}
            Err(e) => match ack.take() {
                Some(tx) => {
                    let _ = tx.send(Err(ConnectError::Refused(e)));
                    return;
                }
                None => {
                    error!("MQTT connection error: {}", e);
                    tokio::time::sleep(reconnect_delay).await;
                }
            },
        }
    }
}

/// Wait for the connect outcome in `quantum` slices.
///
/// An elapsed quantum is not an error; it only counts towards `max_polls`
/// when one is set.
pub async fn wait_for_connack(
    mut ack: oneshot::Receiver<Result<(), ConnectError>>,
    quantum: Duration,
    max_polls: Option<u32>,
) -> Result<(), ConnectError> {
    let mut polls = 0u32;

    loop {
        match timeout(quantum, &mut ack).await {
            Ok(Ok(outcome)) => return outcome,
            Ok(Err(_closed)) => return Err(ConnectError::EventLoopClosed),
            Err(_elapsed) => {
                polls = polls.saturating_add(1);
                if max_polls.is_some_and(|max| polls >= max) {
                    warn!("Giving up on MQTT broker after {} polls", polls);
                    return Err(ConnectError::TimedOut { polls });
                }
                debug!("Still waiting for MQTT broker ({:?} elapsed)", quantum * polls);
            }
        }
    }
}
