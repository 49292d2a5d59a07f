//! Error taxonomy for the publisher
//!
//! Each failure class maps to one escalation policy:
//! - [`IdentityError`], [`ConfigError`], [`ConnectError`]: fatal at startup
//! - [`SampleError`]: fatal for the sampling loop
//! - [`PublishError`]: logged and ignored

use std::fmt;
use std::io;
use thiserror::Error;

/// One category of OS statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricFamily {
    Uptime,
    Memory,
    LoadAverage,
    Cpu,
    Network,
}

impl fmt::Display for MetricFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricFamily::Uptime => "uptime",
            MetricFamily::Memory => "memory",
            MetricFamily::LoadAverage => "load average",
            MetricFamily::Cpu => "cpu",
            MetricFamily::Network => "network",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("failed to enumerate network interfaces: {0}")]
    Enumerate(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid broker URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("broker URL {0:?} has no host")]
    MissingHost(String),

    #[error("invalid value {value:?} for {var}")]
    InvalidValue { var: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum ConnectError {
    /// The broker or the transport gave a definitive answer.
    #[error("connection to MQTT broker failed: {0}")]
    Refused(#[from] rumqttc::ConnectionError),

    #[error("no answer from MQTT broker after {polls} polls")]
    TimedOut { polls: u32 },

    #[error("MQTT event loop stopped before the connection completed")]
    EventLoopClosed,
}

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("error getting {family} stats: {source}")]
    Read {
        family: MetricFamily,
        #[source]
        source: io::Error,
    },

    #[error("{family} stats are not available on this platform")]
    Unsupported { family: MetricFamily },
}

impl SampleError {
    pub fn read(family: MetricFamily, source: impl Into<io::Error>) -> Self {
        SampleError::Read {
            family,
            source: source.into(),
        }
    }

    pub fn family(&self) -> MetricFamily {
        match self {
            SampleError::Read { family, .. } | SampleError::Unsupported { family } => *family,
        }
    }
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Client(#[from] rumqttc::ClientError),

    /// Rejection reported by a session that is not a live rumqttc client.
    #[error("publish rejected: {0}")]
    Rejected(String),
}
