// ── Full-load application logic ──
//
// Applies authoritative snapshots from `loadFull` into the StateStore.
// A full load replaces its collection: anything the server no longer
// reports is pruned.

use std::collections::HashSet;

use chrono::Utc;

use super::StateStore;
use super::collection::EntityCollection;
use crate::model::{DataKind, ScraperConfig, Task};

/// Upsert all incoming entities, then prune any existing ids not in the
/// incoming set. This avoids the brief empty state that a clear causes.
fn upsert_and_prune<T: Clone + Send + Sync + 'static>(
    collection: &EntityCollection<T>,
    items: Vec<(i64, T)>,
) {
    let incoming: HashSet<i64> = items.iter().map(|(id, _)| *id).collect();
    for (id, entity) in items {
        collection.upsert(id, entity);
    }
    for existing in collection.ids() {
        if !incoming.contains(&existing) {
            collection.remove(existing);
        }
    }
}

impl StateStore {
    /// Replace the task mirror with the server's list.
    pub fn replace_tasks(&self, tasks: Vec<Task>) {
        upsert_and_prune(&self.tasks, tasks.into_iter().map(|t| (t.id, t)).collect());
        self.mark_loaded(DataKind::Tasks);
    }

    /// Replace the scraper mirror with the server's list.
    pub fn replace_scrapers(&self, scrapers: Vec<ScraperConfig>) {
        upsert_and_prune(
            &self.scrapers,
            scrapers.into_iter().map(|s| (s.id, s)).collect(),
        );
        self.mark_loaded(DataKind::Scrapers);
    }

    pub(crate) fn mark_loaded(&self, kind: DataKind) {
        self.last_loaded.insert(kind, Utc::now());
    }
}
