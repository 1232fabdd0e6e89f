// ── Central reactive state store ──
//
// The session's mirror of server state. Full loads replace a kind
// wholesale; push events patch it incrementally. Only the store's own
// methods mutate it.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::watch;
use tracing::{debug, trace};

use strmdeck_api::models::TaskPatch;

use super::collection::EntityCollection;
use crate::model::{DataKind, LogEntry, PatchOutcome, ScraperConfig, Settings, Stats, Task};
use crate::stream::EntityStream;

/// Central reactive store for the session's view of the service.
///
/// Collections are ordered for display: tasks newest first, scrapers by
/// ascending priority. Scalars (settings, stats) are swapped wholesale.
/// Logs are a ring buffer bounded by `log_capacity`.
pub struct StateStore {
    pub(crate) tasks: EntityCollection<Task>,
    pub(crate) scrapers: EntityCollection<ScraperConfig>,
    pub(crate) settings: watch::Sender<Option<Arc<Settings>>>,
    pub(crate) stats: watch::Sender<Option<Arc<Stats>>>,
    pub(crate) logs: watch::Sender<Arc<VecDeque<LogEntry>>>,
    pub(crate) log_capacity: usize,
    pub(crate) last_loaded: DashMap<DataKind, DateTime<Utc>>,
}

impl StateStore {
    pub fn new(log_capacity: usize) -> Self {
        let (settings, _) = watch::channel(None);
        let (stats, _) = watch::channel(None);
        let (logs, _) = watch::channel(Arc::new(VecDeque::new()));

        Self {
            tasks: EntityCollection::new(Task::display_order),
            scrapers: EntityCollection::new(ScraperConfig::display_order),
            settings,
            stats,
            logs,
            log_capacity: log_capacity.max(1),
            last_loaded: DashMap::new(),
        }
    }

    // ── Incremental updates ──────────────────────────────────────────

    /// Merge one task patch. A patch for an id that is not mirrored is a
    /// no-op: patches never create tasks.
    pub fn apply_patch(&self, patch: &TaskPatch) -> PatchOutcome {
        match self.tasks.update(patch.id, |task| task.patched(patch)) {
            None => {
                debug!(task_id = patch.id, "patch for unknown task ignored");
                PatchOutcome::UnknownTask
            }
            Some(false) => PatchOutcome::Unchanged,
            Some(true) => {
                trace!(task_id = patch.id, "task patched");
                PatchOutcome::Applied
            }
        }
    }

    /// Merge a batch of patches in order. Returns how many changed a task.
    pub fn apply_task_update(&self, patches: &[TaskPatch]) -> usize {
        patches
            .iter()
            .filter(|p| self.apply_patch(p) == PatchOutcome::Applied)
            .count()
    }

    /// Drop a task the server confirmed deleted.
    pub fn remove_task(&self, id: i64) -> bool {
        self.tasks.remove(id).is_some()
    }

    /// Replace the stats snapshot.
    pub fn apply_stats(&self, stats: Stats) {
        self.stats.send_replace(Some(Arc::new(stats)));
    }

    pub fn replace_settings(&self, settings: Settings) {
        self.settings.send_replace(Some(Arc::new(settings)));
        self.mark_loaded(DataKind::Settings);
    }

    /// Append a log line, evicting the oldest beyond capacity.
    pub fn apply_log(&self, entry: LogEntry) {
        let capacity = self.log_capacity;
        self.logs.send_modify(|buf| {
            let buf = Arc::make_mut(buf);
            buf.push_back(entry);
            while buf.len() > capacity {
                buf.pop_front();
            }
        });
    }

    /// Replace the log buffer with the most recent `capacity` entries.
    pub fn replace_logs(&self, entries: Vec<LogEntry>) {
        let skip = entries.len().saturating_sub(self.log_capacity);
        let buf: VecDeque<LogEntry> = entries.into_iter().skip(skip).collect();
        self.logs.send_replace(Arc::new(buf));
        self.mark_loaded(DataKind::Logs);
    }

    pub fn clear_logs(&self) {
        self.logs.send_replace(Arc::new(VecDeque::new()));
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn tasks_snapshot(&self) -> Arc<Vec<Arc<Task>>> {
        self.tasks.snapshot()
    }

    pub fn scrapers_snapshot(&self) -> Arc<Vec<Arc<ScraperConfig>>> {
        self.scrapers.snapshot()
    }

    pub fn settings(&self) -> Option<Arc<Settings>> {
        self.settings.borrow().clone()
    }

    pub fn stats(&self) -> Option<Arc<Stats>> {
        self.stats.borrow().clone()
    }

    /// Buffered log lines, oldest first.
    pub fn logs(&self) -> Vec<LogEntry> {
        self.logs.borrow().iter().cloned().collect()
    }

    pub fn log_capacity(&self) -> usize {
        self.log_capacity
    }

    // ── Single-entity lookups ────────────────────────────────────────

    pub fn task(&self, id: i64) -> Option<Arc<Task>> {
        self.tasks.get(id)
    }

    pub fn scraper(&self, id: i64) -> Option<Arc<ScraperConfig>> {
        self.scrapers.get(id)
    }

    pub fn scraper_by_name(&self, name: &str) -> Option<Arc<ScraperConfig>> {
        self.scrapers
            .snapshot()
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn scraper_count(&self) -> usize {
        self.scrapers.len()
    }

    /// When `kind` was last loaded in full, if ever.
    pub fn last_loaded(&self, kind: DataKind) -> Option<DateTime<Utc>> {
        self.last_loaded.get(&kind).map(|r| *r.value())
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_tasks(&self) -> EntityStream<Task> {
        EntityStream::new(self.tasks.subscribe())
    }

    pub fn subscribe_scrapers(&self) -> EntityStream<ScraperConfig> {
        EntityStream::new(self.scrapers.subscribe())
    }

    pub fn watch_settings(&self) -> watch::Receiver<Option<Arc<Settings>>> {
        self.settings.subscribe()
    }

    pub fn watch_stats(&self) -> watch::Receiver<Option<Arc<Stats>>> {
        self.stats.subscribe()
    }

    pub fn watch_logs(&self) -> watch::Receiver<Arc<VecDeque<LogEntry>>> {
        self.logs.subscribe()
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(500)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{OrganizeStrategy, TaskStatus};

    fn task(id: i64, day: u32) -> Task {
        Task {
            id,
            name: format!("task-{id}"),
            source_path: "/src".into(),
            destination_path: "/dst".into(),
            organize_strategy: OrganizeStrategy::Category,
            status: TaskStatus::Pending,
            progress: 0.0,
            total_files: 0,
            processed_files: 0,
            failed_files: 0,
            created_at: NaiveDate::from_ymd_opt(2025, 3, day)
                .and_then(|d| d.and_hms_opt(12, 0, 0)),
            started_at: None,
            completed_at: None,
        }
    }

    fn log(message: &str) -> LogEntry {
        LogEntry {
            level: "info".into(),
            message: message.into(),
            timestamp: None,
            received_at: Utc::now(),
        }
    }

    #[test]
    fn full_load_replaces_and_orders_newest_first() {
        let store = StateStore::default();
        store.replace_tasks(vec![task(1, 1), task(2, 3), task(3, 2)]);
        store.replace_tasks(vec![task(2, 3), task(3, 2), task(4, 4)]);

        let ids: Vec<i64> = store.tasks_snapshot().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![4, 2, 3]);
        assert!(store.last_loaded(DataKind::Tasks).is_some());
        assert!(store.last_loaded(DataKind::Scrapers).is_none());
    }

    #[test]
    fn patch_for_unknown_task_is_a_noop() {
        let store = StateStore::default();
        store.replace_tasks(vec![task(1, 1)]);
        let before = store.tasks_snapshot();

        let outcome = store.apply_patch(&TaskPatch {
            id: 99,
            status: Some(TaskStatus::Running),
            ..TaskPatch::default()
        });

        assert_eq!(outcome, PatchOutcome::UnknownTask);
        assert!(store.task(99).is_none());
        assert!(Arc::ptr_eq(&before, &store.tasks_snapshot()));
    }

    #[test]
    fn patch_merges_in_place_and_is_idempotent() {
        let store = StateStore::default();
        store.replace_tasks(vec![task(1, 1)]);
        let patch = TaskPatch {
            id: 1,
            status: Some(TaskStatus::Running),
            progress: Some(25.0),
            ..TaskPatch::default()
        };

        assert_eq!(store.apply_patch(&patch), PatchOutcome::Applied);
        assert_eq!(store.apply_patch(&patch), PatchOutcome::Unchanged);

        let t = store.task(1).unwrap();
        assert_eq!(t.status, TaskStatus::Running);
        assert_eq!(t.progress, 25.0);
        assert_eq!(t.name, "task-1");
    }

    #[test]
    fn batch_counts_only_changes() {
        let store = StateStore::default();
        store.replace_tasks(vec![task(1, 1), task(2, 2)]);
        let applied = store.apply_task_update(&[
            TaskPatch {
                id: 1,
                progress: Some(5.0),
                ..TaskPatch::default()
            },
            TaskPatch {
                id: 3,
                progress: Some(5.0),
                ..TaskPatch::default()
            },
        ]);
        assert_eq!(applied, 1);
    }

    #[test]
    fn log_buffer_is_bounded() {
        let store = StateStore::new(3);
        for i in 0..5 {
            store.apply_log(log(&format!("line {i}")));
        }
        let messages: Vec<String> = store.logs().into_iter().map(|l| l.message).collect();
        assert_eq!(messages, vec!["line 2", "line 3", "line 4"]);

        store.replace_logs((0..10).map(|i| log(&i.to_string())).collect());
        let messages: Vec<String> = store.logs().into_iter().map(|l| l.message).collect();
        assert_eq!(messages, vec!["7", "8", "9"]);
    }

    #[test]
    fn stats_are_replaced_wholesale() {
        let store = StateStore::default();
        let mut rx = store.watch_stats();
        store.apply_stats(Stats::from(strmdeck_api::push::StatsPayload {
            total_tasks: 4,
            cpu_usage: 50.0,
            ..Default::default()
        }));
        store.apply_stats(Stats::from(strmdeck_api::push::StatsPayload {
            total_tasks: 5,
            ..Default::default()
        }));

        assert!(rx.has_changed().unwrap());
        let stats = rx.borrow_and_update().clone().unwrap();
        assert_eq!(stats.total_tasks, 5);
        assert_eq!(stats.cpu_usage, 0.0);
    }

    #[test]
    fn confirmed_delete_removes_task() {
        let store = StateStore::default();
        store.replace_tasks(vec![task(1, 1)]);
        assert!(store.remove_task(1));
        assert!(!store.remove_task(1));
        assert_eq!(store.task_count(), 0);
    }
}
