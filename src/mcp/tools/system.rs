//! CPU and memory tools.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};

use super::{map_join_error, now_epoch};
use crate::dispatch::{Arguments, ParamSpec, ToolDescriptor, ToolError, ToolOutcome, ToolSet};
use crate::upstream::{CpuCounts, MemorySnapshot, StatsSource};

/// Sampling window used by `get_system_info`.
const SYSTEM_INFO_INTERVAL: Duration = Duration::from_secs(1);

const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

/// Render a byte count with binary multiples, e.g. `1.50 GB`.
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    for unit in UNITS {
        if value < 1024.0 {
            return format!("{value:.2} {unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.2} PB")
}

pub struct SystemTools<S: StatsSource> {
    stats: Arc<S>,
    timeout: Duration,
    descriptors: Vec<ToolDescriptor>,
}

impl<S: StatsSource + 'static> SystemTools<S> {
    /// Create the system statistics tool set.
    ///
    /// # Arguments
    /// * `stats` - source of CPU and memory readings
    /// * `timeout` - per-call limit
    ///
    /// # Returns
    /// A tool set exposing the `get_*` statistics tools.
    pub fn new(stats: S, timeout: Duration) -> Self {
        Self {
            stats: Arc::new(stats),
            timeout,
            descriptors: descriptors(),
        }
    }

    /// Run a blocking stats read on the blocking pool.
    async fn sample<T, F>(&self, read: F) -> ToolOutcome<T>
    where
        T: Send + 'static,
        F: FnOnce(&S) -> T + Send + 'static,
    {
        let stats = Arc::clone(&self.stats);
        tokio::task::spawn_blocking(move || read(stats.as_ref()))
            .await
            .map_err(map_join_error)
    }

    async fn get_cpu_usage(&self, args: &Arguments) -> ToolOutcome<Value> {
        let seconds = args.number("interval").unwrap_or(1.0);
        let interval = Duration::from_secs_f64(seconds);
        let usage = self.sample(move |s| s.cpu_usage(interval)).await?;

        Ok(json!({
            "cpu_percentage": round1(usage),
            "interval_seconds": seconds,
            "timestamp": now_epoch(),
        }))
    }

    async fn get_memory_usage(&self) -> ToolOutcome<Value> {
        let memory = self.sample(|s| s.memory()).await?;

        Ok(json!({
            "total": memory.total,
            "available": memory.available,
            "used": memory.used,
            "free": memory.free,
            "percent": memory.percent(),
            "timestamp": now_epoch(),
        }))
    }

    async fn get_system_info(&self) -> ToolOutcome<Value> {
        let (usage, counts, memory): (f32, CpuCounts, MemorySnapshot) = self
            .sample(|s| (s.cpu_usage(SYSTEM_INFO_INTERVAL), s.cpu_counts(), s.memory()))
            .await?;

        Ok(json!({
            "cpu": {
                "percentage": round1(usage),
                "count_logical": counts.logical,
                "count_physical": counts.physical,
            },
            "memory": {
                "total_bytes": memory.total,
                "available_bytes": memory.available,
                "used_bytes": memory.used,
                "free_bytes": memory.free,
                "percent": memory.percent(),
            },
            "formatted": {
                "memory_total": format_bytes(memory.total),
                "memory_available": format_bytes(memory.available),
                "memory_used": format_bytes(memory.used),
            },
            "timestamp": now_epoch(),
        }))
    }
}

impl<S: StatsSource + 'static> ToolSet for SystemTools<S> {
    fn server_name(&self) -> &'static str {
        "system"
    }

    fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn cancel_safe(&self) -> bool {
        false
    }

    async fn call(&self, tool: &'static str, args: Arguments) -> ToolOutcome<Value> {
        match tool {
            "get_cpu_usage" => self.get_cpu_usage(&args).await,
            "get_memory_usage" => self.get_memory_usage().await,
            "get_system_info" => self.get_system_info().await,
            other => Err(ToolError::unknown_tool(other)),
        }
    }
}

fn round1(value: f32) -> f64 {
    (f64::from(value) * 10.0).round() / 10.0
}

fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new("get_cpu_usage", "Get the current CPU usage percentage.").param(
            ParamSpec::number("interval")
                .default_num(1.0)
                .clamp(Some(0.2), Some(10.0))
                .describe("Sampling interval in seconds (0.2-10, default: 1)"),
        ),
        ToolDescriptor::new(
            "get_memory_usage",
            "Get memory totals and usage in bytes.",
        ),
        ToolDescriptor::new(
            "get_system_info",
            "Get CPU and memory information with human-readable sizes.",
        ),
    ]
}
