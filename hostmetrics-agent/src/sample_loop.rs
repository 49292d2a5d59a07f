//! Tick-driven sampling loop
//!
//! Each tick runs one full pass in a fixed family order: uptime, memory,
//! load average, CPU, network. A family read failure ends the loop; a
//! failed publish only counts against the pass summary.

use crate::broker::BrokerSession;
use crate::config::SamplingSettings;
use crate::error::SampleError;
use crate::metrics::{HostStats, MetricSampler};
use crate::publisher::{MetricPublisher, MetricRecord, MetricValue};
use chrono::Utc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Wall-clock source for record timestamps
pub trait Clock {
    /// Nanoseconds since the Unix epoch
    fn now_nanos(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_nanos(&self) -> i64 {
        // Out of range only after year 2262
        Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
    }
}

/// Outcome of one sampling pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub published: usize,
    pub failed: usize,
}

impl PassSummary {
    fn record(&mut self, delivered: bool) {
        if delivered {
            self.published += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn attempted(&self) -> usize {
        self.published + self.failed
    }
}

pub struct SampleLoop<S, C, K> {
    sampler: MetricSampler<S>,
    publisher: MetricPublisher<C>,
    clock: K,
    settings: SamplingSettings,
}

impl<S, C, K> SampleLoop<S, C, K>
where
    S: HostStats,
    C: BrokerSession,
    K: Clock,
{
    pub fn new(
        sampler: MetricSampler<S>,
        publisher: MetricPublisher<C>,
        clock: K,
        settings: SamplingSettings,
    ) -> Self {
        Self {
            sampler,
            publisher,
            clock,
            settings,
        }
    }

    pub fn sampler_mut(&mut self) -> &mut MetricSampler<S> {
        &mut self.sampler
    }

    /// Run a pass on every tick; only returns when a metric family cannot be read.
    ///
    /// The first tick fires one full period after start. Ticks missed while a
    /// pass overruns the period are skipped, never queued.
    pub async fn run(&mut self) -> Result<(), SampleError> {
        let period = self.settings.interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Sampling host metrics every {:?}", period);

        loop {
            ticker.tick().await;
            let timestamp = self.clock.now_nanos();

            self.run_pass(timestamp).await?;
        }
    }

    /// Sample every family and publish its records stamped with `timestamp`
    pub async fn run_pass(&mut self, timestamp: i64) -> Result<PassSummary, SampleError> {
        let mut summary = PassSummary::default();
        let publisher = &self.publisher;
        let record = |value: MetricValue| MetricRecord::new(timestamp, value);

        let uptime = self.sampler.uptime()?;
        summary.record(publisher.publish_metric("uptime", record(uptime.into())).await);

        let memory = self.sampler.memory()?;
        for (path, value) in [
            ("memory/total", memory.total),
            ("memory/used", memory.used),
            ("memory/cached", memory.cached),
            ("memory/free", memory.free),
        ] {
            summary.record(publisher.publish_metric(path, record(value.into())).await);
        }

        let load = self.sampler.load_average()?;
        for (path, value) in [
            ("load/avg1", load.avg1),
            ("load/avg5", load.avg5),
            ("load/avg15", load.avg15),
        ] {
            summary.record(publisher.publish_metric(path, record(value.into())).await);
        }

        let cpu = self.sampler.cpu_utilization(self.settings.cpu_sample_delay).await?;
        for (path, value) in [
            ("cpu/user", cpu.user_pct),
            ("cpu/system", cpu.system_pct),
            ("cpu/idle", cpu.idle_pct),
        ] {
            summary.record(publisher.publish_metric(path, record(value.into())).await);
        }

        let interfaces = self.sampler.network_interfaces()?;
        for interface in &interfaces {
            summary.record(
                publisher
                    .publish_interface(&interface.name, "txbytes", record(interface.tx_bytes.into()))
                    .await,
            );
            summary.record(
                publisher
                    .publish_interface(&interface.name, "rxbytes", record(interface.rx_bytes.into()))
                    .await,
            );
        }

        debug!(
            "Pass complete: {} published, {} failed",
            summary.published, summary.failed
        );
        Ok(summary)
    }
}
