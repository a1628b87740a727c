//! CPU and memory counters.

use std::time::Duration;

use sysinfo::{MINIMUM_CPU_UPDATE_INTERVAL, System};

#[cfg(test)]
use mockall::automock;

/// Memory counters in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemorySnapshot {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub free: u64,
}

impl MemorySnapshot {
    /// Used share of total, rounded to one decimal place.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let pct = (self.total.saturating_sub(self.available)) as f64 / self.total as f64 * 100.0;
        (pct * 10.0).round() / 10.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuCounts {
    pub logical: usize,
    pub physical: Option<usize>,
}

/// OS resource counters. Blocking; `cpu_usage` sleeps for the interval.
#[cfg_attr(test, automock)]
pub trait StatsSource: Send + Sync {
    /// Global CPU usage percentage sampled over `interval`.
    fn cpu_usage(&self, interval: Duration) -> f32;

    fn memory(&self) -> MemorySnapshot;

    fn cpu_counts(&self) -> CpuCounts;
}

/// [`StatsSource`] backed by `sysinfo`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysinfoStats;

impl SysinfoStats {
    pub fn new() -> Self {
        Self
    }
}

impl StatsSource for SysinfoStats {
    fn cpu_usage(&self, interval: Duration) -> f32 {
        let mut system = System::new();
        system.refresh_cpu_usage();
        std::thread::sleep(interval.max(MINIMUM_CPU_UPDATE_INTERVAL));
        system.refresh_cpu_usage();
        system.global_cpu_usage()
    }

    fn memory(&self) -> MemorySnapshot {
        let mut system = System::new();
        system.refresh_memory();
        MemorySnapshot {
            total: system.total_memory(),
            available: system.available_memory(),
            used: system.used_memory(),
            free: system.free_memory(),
        }
    }

    fn cpu_counts(&self) -> CpuCounts {
        let mut system = System::new();
        system.refresh_cpu_all();
        CpuCounts {
            logical: system.cpus().len(),
            physical: system.physical_core_count(),
        }
    }
}
