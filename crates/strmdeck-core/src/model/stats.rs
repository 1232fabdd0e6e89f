// ── Stats domain types ──

use chrono::{DateTime, Utc};
use serde::Serialize;

use strmdeck_api::models::{NetworkIo, SystemStats, TaskStats, TaskStatus};
use strmdeck_api::push::StatsPayload;

/// Aggregate counters shown on the dashboard. Always replaced wholesale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub total_tasks: u64,
    pub running_tasks: u64,
    pub completed_tasks: u64,
    pub failed_tasks: u64,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    /// Percent used of the root mount, or the fullest mount if there is
    /// no root entry.
    pub disk_usage: f64,
    /// Present only in loaded snapshots; push updates do not carry it.
    pub network: Option<NetworkIo>,
    pub updated_at: DateTime<Utc>,
}

impl From<StatsPayload> for Stats {
    fn from(p: StatsPayload) -> Self {
        Self {
            total_tasks: p.total_tasks,
            running_tasks: p.running_tasks,
            completed_tasks: p.completed_tasks,
            failed_tasks: p.failed_tasks,
            cpu_usage: p.cpu_usage,
            memory_usage: p.memory_usage,
            disk_usage: p.disk_usage,
            network: None,
            updated_at: Utc::now(),
        }
    }
}

impl Stats {
    /// Combine the two stats endpoints into one snapshot.
    pub fn from_parts(system: &SystemStats, tasks: &TaskStats) -> Self {
        let disk_usage = system
            .disk_usage
            .get("/")
            .map(|d| d.percent)
            .or_else(|| {
                system
                    .disk_usage
                    .values()
                    .map(|d| d.percent)
                    .reduce(f64::max)
            })
            .unwrap_or(0.0);

        Self {
            total_tasks: tasks.total(),
            running_tasks: tasks.count(TaskStatus::Running),
            completed_tasks: tasks.count(TaskStatus::Completed),
            failed_tasks: tasks.count(TaskStatus::Failed),
            cpu_usage: system.cpu_percent,
            memory_usage: system.memory_percent,
            disk_usage,
            network: Some(system.network_io),
            updated_at: Utc::now(),
        }
    }
}
