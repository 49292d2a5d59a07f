//! System metrics sampling for the publisher
//!
//! Provides one read per metric family:
//! - Uptime
//! - Memory usage statistics (total/used/cached/free)
//! - Load averages
//! - CPU utilization from two raw tick snapshots
//! - Per-interface network byte counters
//!
//! Raw OS access goes through the [`HostStats`] trait; [`system::SystemStats`]
//! is the real implementation.

pub mod system;

use crate::error::SampleError;
use std::time::Duration;
use tracing::{debug, warn};

/// Memory usage in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryStats {
    pub total: u64,
    pub used: u64,
    pub cached: u64,
    pub free: u64,
}

/// Load averages over 1, 5 and 15 minutes
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LoadAverage {
    pub avg1: f64,
    pub avg5: f64,
    pub avg15: f64,
}

/// Cumulative CPU tick counters since boot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuTimes {
    pub total: u64,
    pub user: u64,
    pub system: u64,
    pub idle: u64,
}

/// CPU usage percentages over one sampling window
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CpuUtilization {
    pub user_pct: f64,
    pub system_pct: f64,
    pub idle_pct: f64,
}

/// Per-interface network statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceStats {
    pub name: String,
    pub tx_bytes: u64,
    pub rx_bytes: u64,
}

/// Raw OS metric facility
pub trait HostStats {
    fn uptime(&mut self) -> Result<f64, SampleError>;
    fn memory(&mut self) -> Result<MemoryStats, SampleError>;
    fn load_average(&mut self) -> Result<LoadAverage, SampleError>;
    fn cpu_times(&mut self) -> Result<CpuTimes, SampleError>;
    /// One entry per interface, in the order the OS reports them
    fn network(&mut self) -> Result<Vec<InterfaceStats>, SampleError>;
}

/// First half of a CPU measurement; finish it with [`MetricSampler::end_cpu_sample`]
#[derive(Debug, Clone, Copy)]
#[must_use]
pub struct CpuSample {
    before: CpuTimes,
}

/// Reads each metric family from a [`HostStats`] facility
pub struct MetricSampler<S> {
    stats: S,
}

impl CpuUtilization {
    /// Percentages of the ticks elapsed between two snapshots.
    ///
    /// With no elapsed ticks the window is empty and every percentage is 0.
    pub fn between(before: &CpuTimes, after: &CpuTimes) -> Self {
        let total = after.total.saturating_sub(before.total);
        if total == 0 {
            warn!("No CPU ticks elapsed between snapshots, reporting 0% utilization");
            return Self::default();
        }

        let pct = |after: u64, before: u64| after.saturating_sub(before) as f64 / total as f64 * 100.0;
        Self {
            user_pct: pct(after.user, before.user),
            system_pct: pct(after.system, before.system),
            idle_pct: pct(after.idle, before.idle),
        }
    }
}

impl<S: HostStats> MetricSampler<S> {
    pub fn new(stats: S) -> Self {
        Self { stats }
    }

    pub fn uptime(&mut self) -> Result<f64, SampleError> {
        self.stats.uptime()
    }

    pub fn memory(&mut self) -> Result<MemoryStats, SampleError> {
        self.stats.memory()
    }

    pub fn load_average(&mut self) -> Result<LoadAverage, SampleError> {
        self.stats.load_average()
    }

    pub fn begin_cpu_sample(&mut self) -> Result<CpuSample, SampleError> {
        let before = self.stats.cpu_times()?;
        Ok(CpuSample { before })
    }

    pub fn end_cpu_sample(&mut self, sample: CpuSample) -> Result<CpuUtilization, SampleError> {
        let after = self.stats.cpu_times()?;
        Ok(CpuUtilization::between(&sample.before, &after))
    }

    /// Both CPU snapshots with `delay` in between
    pub async fn cpu_utilization(&mut self, delay: Duration) -> Result<CpuUtilization, SampleError> {
        let sample = self.begin_cpu_sample()?;
        tokio::time::sleep(delay).await;
        let utilization = self.end_cpu_sample(sample)?;

        debug!(
            "CPU over {:?}: user {:.2}%, system {:.2}%, idle {:.2}%",
            delay, utilization.user_pct, utilization.system_pct, utilization.idle_pct
        );
        Ok(utilization)
    }

    pub fn network_interfaces(&mut self) -> Result<Vec<InterfaceStats>, SampleError> {
        self.stats.network()
    }

    pub fn stats_mut(&mut self) -> &mut S {
        &mut self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetricFamily;
    use std::collections::VecDeque;

    /// Facility replaying a fixed list of CPU snapshots
    struct CpuScript {
        snapshots: VecDeque<Result<CpuTimes, SampleError>>,
    }

    impl HostStats for CpuScript {
        fn uptime(&mut self) -> Result<f64, SampleError> {
            Ok(1.0)
        }

        fn memory(&mut self) -> Result<MemoryStats, SampleError> {
            Ok(MemoryStats::default())
        }

        fn load_average(&mut self) -> Result<LoadAverage, SampleError> {
            Ok(LoadAverage::default())
        }

        fn cpu_times(&mut self) -> Result<CpuTimes, SampleError> {
            self.snapshots
                .pop_front()
                .unwrap_or(Err(SampleError::Unsupported { family: MetricFamily::Cpu }))
        }

        fn network(&mut self) -> Result<Vec<InterfaceStats>, SampleError> {
            Ok(Vec::new())
        }
    }

    fn times(total: u64, user: u64, system: u64, idle: u64) -> CpuTimes {
        CpuTimes { total, user, system, idle }
    }

    fn assert_pct(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    #[test]
    fn test_cpu_delta_percentages() {
        let utilization = CpuUtilization::between(&times(100, 40, 30, 30), &times(150, 55, 45, 50));
        assert_pct(utilization.user_pct, 30.0);
        assert_pct(utilization.system_pct, 30.0);
        assert_pct(utilization.idle_pct, 40.0);
    }

    #[test]
    fn test_cpu_delta_without_elapsed_ticks() {
        let snapshot = times(100, 40, 30, 30);
        let utilization = CpuUtilization::between(&snapshot, &snapshot);
        assert_eq!(utilization, CpuUtilization::default());
        assert!(utilization.user_pct.is_finite());
    }

    #[test]
    fn test_two_phase_cpu_sample() {
        let mut sampler = MetricSampler::new(CpuScript {
            snapshots: VecDeque::from([Ok(times(1000, 400, 100, 500)), Ok(times(1200, 450, 150, 600))]),
        });

        let sample = sampler.begin_cpu_sample().unwrap();
        let utilization = sampler.end_cpu_sample(sample).unwrap();
        assert_pct(utilization.user_pct, 25.0);
        assert_pct(utilization.system_pct, 25.0);
        assert_pct(utilization.idle_pct, 50.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cpu_utilization_waits_between_snapshots() {
        let mut sampler = MetricSampler::new(CpuScript {
            snapshots: VecDeque::from([Ok(times(100, 40, 30, 30)), Ok(times(150, 55, 45, 50))]),
        });

        let start = tokio::time::Instant::now();
        let utilization = sampler.cpu_utilization(Duration::from_secs(1)).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(1));
        assert_pct(utilization.idle_pct, 40.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cpu_utilization_propagates_second_read_failure() {
        let mut sampler = MetricSampler::new(CpuScript {
            snapshots: VecDeque::from([Ok(times(100, 40, 30, 30))]),
        });

        let err = sampler.cpu_utilization(Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(err.family(), MetricFamily::Cpu);
    }
}
