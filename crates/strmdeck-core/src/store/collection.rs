// ── Generic reactive entity collection ──
//
// Keyed storage with O(1) lookups and push-based change notification via
// `watch` channels. Snapshots are kept in display order.

use std::cmp::Ordering;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

pub(crate) type Snapshot<T> = Arc<Vec<Arc<T>>>;

/// A reactive collection for a single entity type, keyed by server id.
///
/// Every mutation rebuilds the ordered snapshot that subscribers receive.
pub(crate) struct EntityCollection<T: Clone + Send + Sync + 'static> {
    by_id: DashMap<i64, Arc<T>>,

    /// Snapshot ordering.
    order: fn(&T, &T) -> Ordering,

    /// Full snapshot, rebuilt on mutation for efficient subscription.
    snapshot: watch::Sender<Snapshot<T>>,
}

impl<T: Clone + Send + Sync + 'static> EntityCollection<T> {
    pub(crate) fn new(order: fn(&T, &T) -> Ordering) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            by_id: DashMap::new(),
            order,
            snapshot,
        }
    }

    /// Insert or replace an entity. Returns `true` if the id was new.
    pub(crate) fn upsert(&self, id: i64, entity: T) -> bool {
        let is_new = self.by_id.insert(id, Arc::new(entity)).is_none();
        self.rebuild_snapshot();
        is_new
    }

    /// Replace an existing entity with `f(current)`. Returns `None` when
    /// the id is absent (nothing is inserted), `Some(false)` when `f`
    /// declined to change it.
    pub(crate) fn update<F>(&self, id: i64, f: F) -> Option<bool>
    where
        F: FnOnce(&T) -> Option<T>,
    {
        let next = {
            let current = self.by_id.get(&id)?;
            f(current.value())
        };
        let Some(next) = next else {
            return Some(false);
        };
        self.by_id.insert(id, Arc::new(next));
        self.rebuild_snapshot();
        Some(true)
    }

    /// Remove an entity by id. Returns the removed entity if it existed.
    pub(crate) fn remove(&self, id: i64) -> Option<Arc<T>> {
        let removed = self.by_id.remove(&id).map(|(_, v)| v);
        if removed.is_some() {
            self.rebuild_snapshot();
        }
        removed
    }

    pub(crate) fn get(&self, id: i64) -> Option<Arc<T>> {
        self.by_id.get(&id).map(|r| Arc::clone(r.value()))
    }

    /// Get the current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Snapshot<T> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes via a `watch::Receiver`.
    pub(crate) fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Return all current ids in the collection.
    pub(crate) fn ids(&self) -> Vec<i64> {
        self.by_id.iter().map(|r| *r.key()).collect()
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Collect, order, and broadcast to subscribers.
    fn rebuild_snapshot(&self) {
        let mut values: Vec<Arc<T>> = self.by_id.iter().map(|r| Arc::clone(r.value())).collect();
        let order = self.order;
        values.sort_by(|a, b| order(a, b));
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }
}
