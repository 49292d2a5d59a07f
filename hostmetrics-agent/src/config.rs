//! Configuration from the process environment
//!
//! Handles:
//! - Broker URI (`MQTT_URL`) with credentials in its user-info
//! - Sampling period and CPU sampling delay
//! - Connect polling quantum and optional bound
//!
//! A `.env` file is honoured when present (see [`PublisherConfig::from_env`]).

use crate::error::ConfigError;
use percent_encoding::percent_decode_str;
use std::time::Duration;
use tracing::warn;
use url::Url;

pub const DEFAULT_MQTT_URL: &str = "mqtt://localhost:1883";
pub const DEFAULT_MQTT_PORT: u16 = 1883;

#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub broker: BrokerSettings,
    pub sampling: SamplingSettings,
}

/// Everything needed to open the publisher session
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub keep_alive: Duration,
    /// How long one wait for the connection acknowledgment lasts
    pub connect_wait: Duration,
    /// `None` keeps waiting until the connect attempt resolves
    pub max_connect_polls: Option<u32>,
    /// Back-off after a transport error once connected
    pub reconnect_delay: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SamplingSettings {
    pub interval: Duration,
    pub cpu_sample_delay: Duration,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_MQTT_PORT,
            username: String::new(),
            password: String::new(),
            keep_alive: Duration::from_secs(30),
            connect_wait: Duration::from_secs(3),
            max_connect_polls: None,
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            cpu_sample_delay: Duration::from_secs(1),
        }
    }
}

impl BrokerSettings {
    /// Broker address and credentials from `scheme://[user[:password]@]host[:port]`
    pub fn from_url(raw: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(raw).map_err(|source| ConfigError::InvalidUrl {
            url: raw.to_string(),
            source,
        })?;

        if !matches!(url.scheme(), "mqtt" | "tcp") {
            warn!("Unsupported scheme {:?} in MQTT_URL, connecting over plain TCP", url.scheme());
        }

        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| ConfigError::MissingHost(raw.to_string()))?
            .to_string();

        Ok(Self {
            host,
            port: url.port().unwrap_or(DEFAULT_MQTT_PORT),
            username: decode(url.username()),
            password: url.password().map(decode).unwrap_or_default(),
            ..Self::default()
        })
    }
}

impl PublisherConfig {
    /// Load `.env` (if any) then read the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Ok si .env n'existe pas
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the config from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mqtt_url = lookup("MQTT_URL")
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_MQTT_URL.to_string());

        let mut broker = BrokerSettings::from_url(&mqtt_url)?;
        if let Some(secs) = parse_var(&lookup, "MQTT_CONNECT_WAIT_SECS")? {
            broker.connect_wait = Duration::from_secs(non_zero("MQTT_CONNECT_WAIT_SECS", secs)?);
        }
        if let Some(polls) = parse_var(&lookup, "MQTT_CONNECT_MAX_POLLS")? {
            broker.max_connect_polls = Some(non_zero("MQTT_CONNECT_MAX_POLLS", polls)?);
        }
        if let Some(secs) = parse_var(&lookup, "MQTT_KEEP_ALIVE_SECS")? {
            broker.keep_alive = Duration::from_secs(secs);
        }

        let mut sampling = SamplingSettings::default();
        if let Some(secs) = parse_var(&lookup, "METRICS_INTERVAL_SECS")? {
            sampling.interval = Duration::from_secs(non_zero("METRICS_INTERVAL_SECS", secs)?);
        }
        if let Some(millis) = parse_var(&lookup, "METRICS_CPU_SAMPLE_MS")? {
            sampling.cpu_sample_delay = Duration::from_millis(millis);
        }

        Ok(Self { broker, sampling })
    }
}

fn decode(component: &str) -> String {
    percent_decode_str(component).decode_utf8_lossy().into_owned()
}

fn parse_var<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var).filter(|value| !value.trim().is_empty()) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value }),
    }
}

fn non_zero<T>(var: &'static str, value: T) -> Result<T, ConfigError>
where
    T: Default + PartialEq + ToString,
{
    if value == T::default() {
        return Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
        });
    }
    Ok(value)
}
