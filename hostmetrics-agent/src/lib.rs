//! HostMetrics Agent - Periodic host metrics publisher over MQTT
//!
//! On every tick the agent samples local OS counters and publishes each
//! measurement to `metrics/<host_id>/...` as a `<unix_nanos>;<value>` record:
//! - Host identification from the primary hardware address
//! - Broker session with polling connect wait
//! - Uptime, memory, load average, CPU and per-interface network metrics
//! - Publish failures logged, metric read failures fatal

pub mod broker;
pub mod config;
pub mod error;
pub mod identity;
pub mod metrics;
pub mod publisher;
pub mod sample_loop;

pub use broker::{BrokerSession, EventSource};
pub use config::{BrokerSettings, PublisherConfig, SamplingSettings};
pub use error::{ConfigError, ConnectError, IdentityError, MetricFamily, PublishError, SampleError};
pub use identity::HostId;
pub use metrics::{HostStats, MetricSampler};
pub use publisher::{MetricPublisher, MetricRecord, MetricValue, Topics};
pub use sample_loop::{Clock, PassSummary, SampleLoop, SystemClock};
