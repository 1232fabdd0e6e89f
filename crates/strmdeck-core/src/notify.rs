// ── Notification sink ──
//
// Terminal outcomes surfaced to the user. Each notification dismisses
// itself after a fixed TTL; nothing is merged or deduplicated.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::{AsRefStr, Display, EnumString};
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;

const FEED_CAPACITY: usize = 256;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub text: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    expires_at: Instant,
}

impl Notification {
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Cheaply cloneable handle to the notification queue.
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<NotifierInner>,
}

struct NotifierInner {
    ttl: Duration,
    next_id: AtomicU64,
    active: watch::Sender<Arc<Vec<Notification>>>,
    feed: broadcast::Sender<Notification>,
}

impl NotifierInner {
    fn dismiss(&self, id: u64) -> bool {
        let mut removed = false;
        self.active.send_if_modified(|list| {
            if list.iter().any(|n| n.id == id) {
                *list = Arc::new(list.iter().filter(|n| n.id != id).cloned().collect());
                removed = true;
            }
            removed
        });
        removed
    }
}

impl Notifier {
    pub fn new(ttl: Duration) -> Self {
        let (active, _) = watch::channel(Arc::new(Vec::new()));
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            inner: Arc::new(NotifierInner {
                ttl,
                next_id: AtomicU64::new(1),
                active,
                feed,
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Enqueue a notification and arm its dismissal timer. Returns its id.
    ///
    /// Outside a Tokio runtime no timer is armed; the entry still drops out
    /// of [`active`](Self::active) once its TTL has passed.
    pub fn notify(&self, severity: Severity, text: impl Into<String>) -> u64 {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let notification = Notification {
            id,
            text: text.into(),
            severity,
            created_at: Utc::now(),
            expires_at: Instant::now() + self.inner.ttl,
        };
        tracing::debug!(id, severity = %severity, text = %notification.text, "notification");

        self.inner.active.send_modify(|list| {
            let mut next = Vec::with_capacity(list.len() + 1);
            next.extend(list.iter().cloned());
            next.push(notification.clone());
            *list = Arc::new(next);
        });
        // No receivers is fine: nobody is watching the feed yet.
        let _ = self.inner.feed.send(notification);

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let weak: Weak<NotifierInner> = Arc::downgrade(&self.inner);
            let ttl = self.inner.ttl;
            handle.spawn(async move {
                tokio::time::sleep(ttl).await;
                if let Some(inner) = weak.upgrade() {
                    inner.dismiss(id);
                }
            });
        }
        id
    }

    pub fn info(&self, text: impl Into<String>) -> u64 {
        self.notify(Severity::Info, text)
    }

    pub fn success(&self, text: impl Into<String>) -> u64 {
        self.notify(Severity::Success, text)
    }

    pub fn warning(&self, text: impl Into<String>) -> u64 {
        self.notify(Severity::Warning, text)
    }

    pub fn error(&self, text: impl Into<String>) -> u64 {
        self.notify(Severity::Error, text)
    }

    /// Remove a notification early. Returns `false` if it was already gone.
    pub fn dismiss(&self, id: u64) -> bool {
        self.inner.dismiss(id)
    }

    /// Currently visible notifications, oldest first.
    pub fn active(&self) -> Vec<Notification> {
        self.inner
            .active
            .borrow()
            .iter()
            .filter(|n| !n.is_expired())
            .cloned()
            .collect()
    }

    /// Every notification as it is emitted.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.inner.feed.subscribe()
    }

    /// The visible list, updated on enqueue and dismissal.
    pub fn watch(&self) -> watch::Receiver<Arc<Vec<Notification>>> {
        self.inner.active.subscribe()
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("ttl", &self.inner.ttl)
            .field("active", &self.inner.active.borrow().len())
            .finish()
    }
}
