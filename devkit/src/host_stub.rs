/*!
Faux collecteur système pour tests déterministes

Remplace `SystemStats` : renvoie des valeurs scriptées, compte les lectures
par famille et peut faire échouer une famille à partir d'une lecture donnée.
*/

use hostmetrics_agent::metrics::{CpuTimes, HostStats, InterfaceStats, LoadAverage, MemoryStats};
use hostmetrics_agent::{MetricFamily, SampleError};
use std::collections::HashMap;
use std::io;

pub struct FakeHostStats {
    pub uptime: f64,
    pub memory: MemoryStats,
    pub load: LoadAverage,
    /// Snapshots renvoyés en boucle, un par lecture
    pub cpu_snapshots: Vec<CpuTimes>,
    pub interfaces: Vec<InterfaceStats>,
    reads: HashMap<MetricFamily, usize>,
    failures: HashMap<MetricFamily, usize>,
}

impl FakeHostStats {
    pub fn new() -> Self {
        Self {
            uptime: 0.0,
            memory: MemoryStats::default(),
            load: LoadAverage::default(),
            cpu_snapshots: Vec::new(),
            interfaces: Vec::new(),
            reads: HashMap::new(),
            failures: HashMap::new(),
        }
    }

    /// Valeurs réalistes pour un petit serveur avec deux interfaces
    pub fn typical() -> Self {
        Self {
            uptime: 12345.678,
            memory: MemoryStats {
                total: 16_777_216_000,
                used: 8_388_608_000,
                cached: 2_097_152_000,
                free: 6_291_456_000,
            },
            load: LoadAverage {
                avg1: 1.52,
                avg5: 0.75,
                avg15: 0.1,
            },
            cpu_snapshots: vec![
                CpuTimes { total: 100, user: 40, system: 30, idle: 30 },
                CpuTimes { total: 150, user: 55, system: 45, idle: 50 },
            ],
            interfaces: vec![
                interface("eth0", 1_000, 2_000),
                interface("wlan0", 3_000, 4_000),
            ],
            ..Self::new()
        }
    }

    /// La famille échoue dès la lecture `nth` (1 = première lecture)
    pub fn fail_from_read(&mut self, family: MetricFamily, nth: usize) -> &mut Self {
        self.failures.insert(family, nth.max(1));
        self
    }

    pub fn fail(&mut self, family: MetricFamily) -> &mut Self {
        self.fail_from_read(family, 1)
    }

    /// Nombre de lectures effectuées pour une famille
    pub fn reads(&self, family: MetricFamily) -> usize {
        self.reads.get(&family).copied().unwrap_or(0)
    }

    fn read(&mut self, family: MetricFamily) -> Result<usize, SampleError> {
        let count = self.reads.entry(family).or_insert(0);
        *count += 1;
        let count = *count;

        match self.failures.get(&family) {
            Some(&nth) if count >= nth => {
                log::warn!("💥 [FAKE] {} read #{} fails", family, count);
                Err(SampleError::read(
                    family,
                    io::Error::new(io::ErrorKind::Other, "simulated failure"),
                ))
            }
            _ => Ok(count),
        }
    }
}

impl Default for FakeHostStats {
    fn default() -> Self {
        Self::new()
    }
}

impl HostStats for FakeHostStats {
    fn uptime(&mut self) -> Result<f64, SampleError> {
        self.read(MetricFamily::Uptime)?;
        Ok(self.uptime)
    }

    fn memory(&mut self) -> Result<MemoryStats, SampleError> {
        self.read(MetricFamily::Memory)?;
        Ok(self.memory)
    }

    fn load_average(&mut self) -> Result<LoadAverage, SampleError> {
        self.read(MetricFamily::LoadAverage)?;
        Ok(self.load)
    }

    fn cpu_times(&mut self) -> Result<CpuTimes, SampleError> {
        let count = self.read(MetricFamily::Cpu)?;
        if self.cpu_snapshots.is_empty() {
            return Ok(CpuTimes::default());
        }
        Ok(self.cpu_snapshots[(count - 1) % self.cpu_snapshots.len()])
    }

    fn network(&mut self) -> Result<Vec<InterfaceStats>, SampleError> {
        self.read(MetricFamily::Network)?;
        Ok(self.interfaces.clone())
    }
}

/// Raccourci pour construire une entrée réseau
pub fn interface(name: &str, tx_bytes: u64, rx_bytes: u64) -> InterfaceStats {
    InterfaceStats {
        name: name.to_string(),
        tx_bytes,
        rx_bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_snapshots_cycle() {
        let mut stats = FakeHostStats::typical();
        let first = stats.cpu_times().unwrap();
        let second = stats.cpu_times().unwrap();
        let third = stats.cpu_times().unwrap();
        assert_eq!(first.total, 100);
        assert_eq!(second.total, 150);
        assert_eq!(third, first);
        assert_eq!(stats.reads(MetricFamily::Cpu), 3);
    }

    #[test]
    fn test_failure_from_nth_read() {
        let mut stats = FakeHostStats::typical();
        stats.fail_from_read(MetricFamily::Memory, 2);

        assert!(stats.memory().is_ok());
        let err = stats.memory().unwrap_err();
        assert_eq!(err.family(), MetricFamily::Memory);
        assert!(stats.memory().is_err());
    }
}
