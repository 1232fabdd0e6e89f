// ── Task domain types ──

use chrono::NaiveDateTime;
use serde::Serialize;

use strmdeck_api::models::{OrganizeStrategy, TaskPatch, TaskRecord, TaskStatus};

/// An organize task as mirrored on the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub id: i64,
    pub name: String,
    pub source_path: String,
    pub destination_path: String,
    pub organize_strategy: OrganizeStrategy,
    pub status: TaskStatus,
    /// Percent complete, always within `0.0..=100.0`.
    pub progress: f64,
    pub total_files: u64,
    pub processed_files: u64,
    pub failed_files: u64,
    pub created_at: Option<NaiveDateTime>,
    pub started_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
}

/// Result of merging a push patch into the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// At least one field changed.
    Applied,
    /// The task exists and already matched the patch.
    Unchanged,
    /// No task with that id is mirrored; nothing was created.
    UnknownTask,
}

impl From<TaskRecord> for Task {
    fn from(r: TaskRecord) -> Self {
        Self {
            id: r.id,
            name: r.name,
            source_path: r.source_path,
            destination_path: r.destination_path,
            organize_strategy: r.organize_strategy,
            status: r.status,
            progress: clamp_progress(r.progress),
            total_files: r.total_files,
            processed_files: r.processed_files,
            failed_files: r.failed_files,
            created_at: r.created_at,
            started_at: r.started_at,
            completed_at: r.completed_at,
        }
    }
}

impl Task {
    /// Return a copy with the patch's present fields merged in, or `None`
    /// if nothing would change. Applying the same patch twice is a no-op.
    pub fn patched(&self, patch: &TaskPatch) -> Option<Self> {
        let mut next = self.clone();

        if let Some(name) = &patch.name {
            next.name.clone_from(name);
        }
        if let Some(status) = patch.status {
            next.status = status;
        }
        if let Some(progress) = patch.progress {
            next.progress = clamp_progress(progress);
        }
        if let Some(n) = patch.total_files {
            next.total_files = n;
        }
        if let Some(n) = patch.processed_files {
            next.processed_files = n;
        }
        if let Some(n) = patch.failed_files {
            next.failed_files = n;
        }
        if patch.started_at.is_some() {
            next.started_at = patch.started_at;
        }
        if patch.completed_at.is_some() {
            next.completed_at = patch.completed_at;
        }

        (next != *self).then_some(next)
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, TaskStatus::Running | TaskStatus::Pending)
    }

    /// Newest first; the service hands out increasing ids, so ties on
    /// `created_at` fall back to id.
    pub(crate) fn display_order(a: &Self, b: &Self) -> std::cmp::Ordering {
        b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id))
    }
}

fn clamp_progress(p: f64) -> f64 {
    if p.is_nan() { 0.0 } else { p.clamp(0.0, 100.0) }
}
