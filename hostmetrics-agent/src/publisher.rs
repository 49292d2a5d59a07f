//! Metric records and their publication
//!
//! Wire format, shared with existing subscribers:
//! - topic `metrics/<host_id>/<family>[/<interface>]/<measurement>`
//! - payload `<unix_nanos>;<value>`, floats with exactly two decimals,
//!   unsigned integers in plain base 10
//! - QoS 0, not retained

use crate::broker::BrokerSession;
use crate::identity::HostId;
use rumqttc::QoS;
use std::fmt;
use tracing::{trace, warn};

pub const TOPIC_ROOT: &str = "metrics";

/// A single measurement value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Float(f64),
    Unsigned(u64),
}

/// Timestamped value, rendered as the message payload
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricRecord {
    pub timestamp_nanos: i64,
    pub value: MetricValue,
}

/// Topic namespace of one host
#[derive(Debug, Clone)]
pub struct Topics {
    base: String,
}

/// Publishes records for one host over a broker session
pub struct MetricPublisher<C> {
    session: C,
    topics: Topics,
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Float(value) => write!(f, "{:.2}", value),
            MetricValue::Unsigned(value) => write!(f, "{}", value),
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Float(value)
    }
}

impl From<u64> for MetricValue {
    fn from(value: u64) -> Self {
        MetricValue::Unsigned(value)
    }
}

impl MetricRecord {
    pub fn new(timestamp_nanos: i64, value: impl Into<MetricValue>) -> Self {
        Self {
            timestamp_nanos,
            value: value.into(),
        }
    }

    pub fn payload(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MetricRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{}", self.timestamp_nanos, self.value)
    }
}

impl Topics {
    pub fn new(host_id: &HostId) -> Self {
        Self {
            base: format!("{}/{}", TOPIC_ROOT, host_id),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Full topic for a metric path such as `memory/total`
    pub fn metric(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    /// Full topic for a per-interface measurement
    pub fn interface(&self, interface: &str, measurement: &str) -> String {
        format!("{}/network/{}/{}", self.base, interface, measurement)
    }
}

impl<C: BrokerSession> MetricPublisher<C> {
    pub fn new(session: C, topics: Topics) -> Self {
        Self { session, topics }
    }

    pub fn session(&self) -> &C {
        &self.session
    }

    /// Publish one record; a failure is logged and reported as `false`
    pub async fn publish(&self, topic: &str, record: MetricRecord) -> bool {
        let payload = record.payload();
        trace!("Publishing {} to {}", payload, topic);

        match self.session.send(topic, QoS::AtMostOnce, false, payload).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Error publishing message to {}: {}", topic, e);
                false
            }
        }
    }

    pub async fn publish_metric(&self, path: &str, record: MetricRecord) -> bool {
        self.publish(&self.topics.metric(path), record).await
    }

    pub async fn publish_interface(&self, interface: &str, measurement: &str, record: MetricRecord) -> bool {
        self.publish(&self.topics.interface(interface, measurement), record).await
    }
}
