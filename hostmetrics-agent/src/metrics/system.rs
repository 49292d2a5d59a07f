//! Real OS metric facility
//!
//! `sysinfo` covers memory, load averages and network counters on every
//! platform. Raw CPU ticks, the page cache and sub-second uptime only exist
//! in `/proc`, so those are read through `procfs` on Linux.

use super::{CpuTimes, HostStats, InterfaceStats, LoadAverage, MemoryStats};
use crate::error::{MetricFamily, SampleError};
use sysinfo::{Networks, System};
use tracing::debug;

pub struct SystemStats {
    sys: System,
    networks: Networks,
}

impl SystemStats {
    pub fn new() -> Self {
        Self {
            sys: System::new(),
            networks: Networks::new_with_refreshed_list(),
        }
    }
}

impl Default for SystemStats {
    fn default() -> Self {
        Self::new()
    }
}

impl HostStats for SystemStats {
    fn uptime(&mut self) -> Result<f64, SampleError> {
        uptime_seconds()
    }

    fn memory(&mut self) -> Result<MemoryStats, SampleError> {
        self.sys.refresh_memory();

        Ok(MemoryStats {
            total: self.sys.total_memory(),
            used: self.sys.used_memory(),
            cached: page_cache_bytes()?,
            free: self.sys.free_memory(),
        })
    }

    fn load_average(&mut self) -> Result<LoadAverage, SampleError> {
        if !cfg!(unix) {
            return Err(SampleError::Unsupported {
                family: MetricFamily::LoadAverage,
            });
        }

        let load = System::load_average();
        Ok(LoadAverage {
            avg1: load.one,
            avg5: load.five,
            avg15: load.fifteen,
        })
    }

    fn cpu_times(&mut self) -> Result<CpuTimes, SampleError> {
        cpu_ticks()
    }

    fn network(&mut self) -> Result<Vec<InterfaceStats>, SampleError> {
        // Pick up interfaces that appeared since the last pass
        self.networks.refresh_list();

        let interfaces: Vec<InterfaceStats> = self
            .networks
            .iter()
            .map(|(name, data)| InterfaceStats {
                name: name.clone(),
                tx_bytes: data.total_transmitted(),
                rx_bytes: data.total_received(),
            })
            .collect();

        debug!("Read counters for {} network interfaces", interfaces.len());
        Ok(interfaces)
    }
}

#[cfg(target_os = "linux")]
fn uptime_seconds() -> Result<f64, SampleError> {
    use procfs::{Current, Uptime};

    let uptime = Uptime::current().map_err(|e| proc_error(MetricFamily::Uptime, e))?;
    Ok(uptime.uptime)
}

// Whole seconds only
#[cfg(not(target_os = "linux"))]
fn uptime_seconds() -> Result<f64, SampleError> {
    Ok(System::uptime() as f64)
}

#[cfg(target_os = "linux")]
fn cpu_ticks() -> Result<CpuTimes, SampleError> {
    use procfs::{CurrentSI, KernelStats};

    let stat = KernelStats::current().map_err(|e| proc_error(MetricFamily::Cpu, e))?;
    let cpu = &stat.total;

    let total = cpu.user
        + cpu.nice
        + cpu.system
        + cpu.idle
        + cpu.iowait.unwrap_or(0)
        + cpu.irq.unwrap_or(0)
        + cpu.softirq.unwrap_or(0)
        + cpu.steal.unwrap_or(0);

    Ok(CpuTimes {
        total,
        user: cpu.user,
        system: cpu.system,
        idle: cpu.idle,
    })
}

#[cfg(not(target_os = "linux"))]
fn cpu_ticks() -> Result<CpuTimes, SampleError> {
    Err(SampleError::Unsupported {
        family: MetricFamily::Cpu,
    })
}

#[cfg(target_os = "linux")]
fn page_cache_bytes() -> Result<u64, SampleError> {
    use procfs::{Current, Meminfo};

    let meminfo = Meminfo::current().map_err(|e| proc_error(MetricFamily::Memory, e))?;
    Ok(meminfo.cached)
}

#[cfg(not(target_os = "linux"))]
fn page_cache_bytes() -> Result<u64, SampleError> {
    Ok(0)
}

#[cfg(target_os = "linux")]
fn proc_error(family: MetricFamily, err: procfs::ProcError) -> SampleError {
    SampleError::read(family, std::io::Error::new(std::io::ErrorKind::Other, err))
}
