//! Transient operator notifications
//!
//! `show` appends a toast and schedules its removal after the configured TTL.
//! Ids come from a per-queue counter, so two toasts created in the same
//! millisecond never collide.

mod types;

pub use types::{Notification, NotificationId, NotificationKind};

use crate::config::NotificationConfig;
use crate::logger::{self, LogTag};
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;

pub const DEFAULT_TTL: Duration = Duration::from_millis(6_000);

struct QueueInner {
    entries: Mutex<Vec<Notification>>,
    updates: watch::Sender<Vec<Notification>>,
    next_id: AtomicU64,
    ttl: Duration,
}

impl QueueInner {
    fn remove(&self, id: NotificationId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|n| n.id != id);
        if entries.len() == before {
            return false;
        }
        self.updates.send_replace(entries.clone());
        true
    }
}

#[derive(Clone)]
pub struct NotificationQueue {
    inner: Arc<QueueInner>,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl From<&NotificationConfig> for NotificationQueue {
    fn from(config: &NotificationConfig) -> Self {
        Self::new(Duration::from_millis(config.ttl_ms))
    }
}

impl NotificationQueue {
    pub fn new(ttl: Duration) -> Self {
        let (updates, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(QueueInner {
                entries: Mutex::new(Vec::new()),
                updates,
                next_id: AtomicU64::new(1),
                ttl,
            }),
        }
    }

    /// Append a notification and schedule its expiry
    pub fn show(&self, message: impl Into<String>, kind: NotificationKind) -> NotificationId {
        let id = NotificationId(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        let notification = Notification {
            id,
            message: message.into(),
            kind,
            created_at: Utc::now(),
        };
        logger::debug(
            LogTag::Notify,
            &format!("{} {} {}", id, kind.as_str(), notification.message),
        );

        {
            let mut entries = self.inner.entries.lock();
            entries.push(notification);
            self.inner.updates.send_replace(entries.clone());
        }

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let queue: Weak<QueueInner> = Arc::downgrade(&self.inner);
                let ttl = self.inner.ttl;
                runtime.spawn(async move {
                    tokio::time::sleep(ttl).await;
                    if let Some(queue) = queue.upgrade() {
                        queue.remove(id);
                    }
                });
            }
            Err(_) => logger::warning(
                LogTag::Notify,
                &format!("No runtime; notification {} will not expire", id),
            ),
        }

        id
    }

    /// Remove a notification; unknown ids are ignored
    pub fn dismiss(&self, id: NotificationId) -> bool {
        self.inner.remove(id)
    }

    /// Current notifications in creation order
    pub fn list(&self) -> Vec<Notification> {
        self.inner.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Notification>> {
        self.inner.updates.subscribe()
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    pub fn success(&self, message: impl Into<String>) -> NotificationId {
        self.show(message, NotificationKind::Success)
    }

    pub fn error(&self, message: impl Into<String>) -> NotificationId {
        self.show(message, NotificationKind::Error)
    }

    pub fn info(&self, message: impl Into<String>) -> NotificationId {
        self.show(message, NotificationKind::Info)
    }

    pub fn warning(&self, message: impl Into<String>) -> NotificationId {
        self.show(message, NotificationKind::Warning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn test_notification_expires_after_ttl() {
        let queue = NotificationQueue::default();
        queue.show("x", NotificationKind::Success);
        assert_eq!(queue.len(), 1);

        sleep(Duration::from_millis(5_999)).await;
        assert_eq!(queue.len(), 1);

        sleep(Duration::from_millis(2)).await;
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_removes_once() {
        let queue = NotificationQueue::default();
        let id = queue.success("Signal promoted");
        let other = queue.info("Engine running");

        assert!(queue.dismiss(id));
        assert!(!queue.dismiss(id));
        assert_eq!(queue.list().iter().map(|n| n.id).collect::<Vec<_>>(), vec![other]);

        // Expiry of the dismissed entry is harmless
        sleep(Duration::from_millis(7_000)).await;
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_ids_unique_and_order_kept() {
        let queue = NotificationQueue::default();
        let ids: Vec<_> = (0..5).map(|_| queue.warning("same text")).collect();

        let listed = queue.list();
        assert_eq!(listed.len(), 5);
        assert_eq!(listed.iter().map(|n| n.id).collect::<Vec<_>>(), ids);
        let mut unique = ids.clone();
        unique.dedup();
        assert_eq!(unique.len(), 5);
    }

    #[tokio::test]
    async fn test_dismiss_unknown_is_noop() {
        let queue = NotificationQueue::default();
        queue.error("Request failed. Please try again.");
        assert!(!queue.dismiss(NotificationId(999)));
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_changes() {
        let queue = NotificationQueue::new(Duration::from_millis(100));
        let mut updates = queue.subscribe();

        queue.info("hello");
        updates.changed().await.unwrap();
        assert_eq!(updates.borrow_and_update().len(), 1);

        updates.changed().await.unwrap();
        assert!(updates.borrow().is_empty());
    }
}
