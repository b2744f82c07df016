//! Refresh-on-return trigger
//!
//! Watches hidden/visible transitions of the client window and calls back
//! when the window becomes visible after being hidden for longer than a
//! threshold. The terminal driver feeds it from focus events.

use crate::config::VisibilityConfig;
use crate::logger::{self, LogTag};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub const DEFAULT_THRESHOLD: Duration = Duration::from_millis(2_000);

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Hidden,
    Visible,
}

/// Pure hidden-duration bookkeeping for one trigger
#[derive(Debug, Clone)]
pub struct VisibilityTracker {
    threshold: Duration,
    last_hidden_at: Option<Instant>,
}

impl VisibilityTracker {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            last_hidden_at: None,
        }
    }

    /// Apply one transition; returns true when a refresh is due
    ///
    /// A visible event with no prior hidden event counts as zero hidden time.
    pub fn transition(&mut self, visibility: Visibility, now: Instant) -> bool {
        match visibility {
            Visibility::Hidden => {
                self.last_hidden_at = Some(now);
                false
            }
            Visibility::Visible => {
                let hidden = self
                    .last_hidden_at
                    .take()
                    .map(|at| now.saturating_duration_since(at))
                    .unwrap_or_default();
                hidden > self.threshold
            }
        }
    }

    pub fn last_hidden_at(&self) -> Option<Instant> {
        self.last_hidden_at
    }
}

/// Broadcast source of visibility changes
#[derive(Clone)]
pub struct VisibilityEvents {
    sender: broadcast::Sender<Visibility>,
}

impl Default for VisibilityEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl VisibilityEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, visibility: Visibility) {
        // No observers is fine
        let _ = self.sender.send(visibility);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Visibility> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Subscription guard; dropping it stops observing
pub struct VisibilityObserver {
    task: JoinHandle<()>,
}

impl Drop for VisibilityObserver {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[derive(Debug, Clone, Copy)]
pub struct VisibilityRefreshTrigger {
    threshold: Duration,
    enabled: bool,
}

impl Default for VisibilityRefreshTrigger {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            enabled: true,
        }
    }
}

impl From<&VisibilityConfig> for VisibilityRefreshTrigger {
    fn from(config: &VisibilityConfig) -> Self {
        Self {
            threshold: Duration::from_millis(config.threshold_ms),
            enabled: config.enabled,
        }
    }
}

impl VisibilityRefreshTrigger {
    pub fn new(threshold: Duration, enabled: bool) -> Self {
        Self { threshold, enabled }
    }

    /// Subscribe to `events`; `None` (and no subscription) when disabled
    pub fn observe<F>(&self, events: &VisibilityEvents, on_visible: F) -> Option<VisibilityObserver>
    where
        F: Fn() + Send + Sync + 'static,
    {
        if !self.enabled {
            return None;
        }

        let mut receiver = events.subscribe();
        let mut tracker = VisibilityTracker::new(self.threshold);

        let task = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(visibility) => {
                        if tracker.transition(visibility, Instant::now()) {
                            logger::debug(LogTag::Visibility, "Visible after long absence, refreshing");
                            on_visible();
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        logger::warning(
                            LogTag::Visibility,
                            &format!("Dropped {} visibility events", skipped),
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Some(VisibilityObserver { task })
    }
}

/// Observe with the default threshold
pub fn observe<F>(events: &VisibilityEvents, on_visible: F, enabled: bool) -> Option<VisibilityObserver>
where
    F: Fn() + Send + Sync + 'static,
{
    VisibilityRefreshTrigger::new(DEFAULT_THRESHOLD, enabled).observe(events, on_visible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::sleep;

    fn at(origin: Instant, ms: u64) -> Instant {
        origin + Duration::from_millis(ms)
    }

    #[test]
    fn test_short_absence_does_not_refresh() {
        let t0 = Instant::now();
        let mut tracker = VisibilityTracker::new(DEFAULT_THRESHOLD);

        assert!(!tracker.transition(Visibility::Hidden, at(t0, 0)));
        assert!(!tracker.transition(Visibility::Visible, at(t0, 1000)));
        assert_eq!(tracker.last_hidden_at(), None);
    }

    #[test]
    fn test_long_absence_refreshes_once() {
        let t0 = Instant::now();
        let mut tracker = VisibilityTracker::new(DEFAULT_THRESHOLD);

        tracker.transition(Visibility::Hidden, at(t0, 2000));
        assert!(tracker.transition(Visibility::Visible, at(t0, 5500)));
        // A repeated visible event has no recorded hide
        assert!(!tracker.transition(Visibility::Visible, at(t0, 9000)));
    }

    #[test]
    fn test_threshold_is_strict() {
        let t0 = Instant::now();
        let mut tracker = VisibilityTracker::new(DEFAULT_THRESHOLD);

        tracker.transition(Visibility::Hidden, at(t0, 0));
        assert!(!tracker.transition(Visibility::Visible, at(t0, 2000)));
        tracker.transition(Visibility::Hidden, at(t0, 3000));
        assert!(tracker.transition(Visibility::Visible, at(t0, 5001)));
    }

    #[test]
    fn test_visible_without_hide_is_zero() {
        let mut tracker = VisibilityTracker::new(Duration::ZERO);
        assert!(!tracker.transition(Visibility::Visible, Instant::now()));
    }

    #[tokio::test]
    async fn test_disabled_does_not_subscribe() {
        let events = VisibilityEvents::new();
        let before = events.receiver_count();

        let observer = observe(&events, || {}, false);

        assert!(observer.is_none());
        assert_eq!(events.receiver_count(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_observer_calls_back_after_long_hide() {
        let events = VisibilityEvents::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let _observer = observe(
            &events,
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            true,
        )
        .unwrap();

        events.publish(Visibility::Hidden);
        sleep(Duration::from_millis(1000)).await;
        events.publish(Visibility::Visible);
        sleep(Duration::from_millis(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        events.publish(Visibility::Hidden);
        sleep(Duration::from_millis(3500)).await;
        events.publish(Visibility::Visible);
        sleep(Duration::from_millis(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dropping_observer_unsubscribes() {
        let events = VisibilityEvents::new();
        let observer = observe(&events, || {}, true);
        assert_eq!(events.receiver_count(), 1);

        drop(observer);
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert_eq!(events.receiver_count(), 0);
    }
}
