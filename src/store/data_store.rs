//! Per-domain snapshot store
//!
//! A `DataStore` owns the latest snapshot for one data domain, its
//! loading/error flags and the in-flight fetch slot. Views read it through
//! `state()` or a `watch` subscription; the only writers are `fetch` and
//! `reset`.

use super::fetch_guard::{Admission, FetchFuture, FetchGuard, FetchResult};
use crate::errors::{ClientError, ClientResult};
use crate::logger::{self, LogTag};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;

/// Who asked for the refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// User-initiated: toggles `loading`, surfaces failures in `error`
    Foreground,
    /// Poll- or visibility-triggered: silent, failures are only logged
    Background,
}

impl FetchMode {
    pub fn is_background(&self) -> bool {
        matches!(self, FetchMode::Background)
    }
}

impl std::fmt::Display for FetchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchMode::Foreground => write!(f, "foreground"),
            FetchMode::Background => write!(f, "background"),
        }
    }
}

/// Mutation of one snapshot field produced by a successful sub-request
pub type Patch<T> = Box<dyn FnOnce(&mut T) + Send>;

/// Outcome of one sub-request of a store fetch
pub struct SubResult<T> {
    pub endpoint: String,
    pub outcome: ClientResult<Patch<T>>,
}

/// Where a store's snapshot comes from
///
/// `load` issues every sub-request of the domain (in parallel where there
/// are several) and reports each outcome separately, so one failing
/// endpoint never blocks the fields fed by the others.
#[async_trait]
pub trait SnapshotSource: Send + Sync + 'static {
    type Snapshot: Clone + Default + Send + Sync + 'static;

    fn name(&self) -> &'static str;

    async fn load(&self) -> Vec<SubResult<Self::Snapshot>>;
}

/// Read-only view of a store published to subscribers
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub fetching: bool,
}

impl<T> Default for StoreSnapshot<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
            updated_at: None,
            fetching: false,
        }
    }
}

struct FetchState<T> {
    data: Option<T>,
    loading: bool,
    error: Option<String>,
    updated_at: Option<DateTime<Utc>>,
    /// Bumped by `reset`; responses from an older generation are discarded
    generation: u64,
    guard: FetchGuard,
}

impl<T: Clone> FetchState<T> {
    fn view(&self) -> StoreSnapshot<T> {
        StoreSnapshot {
            data: self.data.clone(),
            loading: self.loading,
            error: self.error.clone(),
            updated_at: self.updated_at,
            fetching: self.guard.is_pending(),
        }
    }
}

struct StoreInner<S: SnapshotSource> {
    source: S,
    state: Mutex<FetchState<S::Snapshot>>,
    updates: watch::Sender<StoreSnapshot<S::Snapshot>>,
}

impl<S: SnapshotSource> StoreInner<S> {
    fn publish(&self, state: &FetchState<S::Snapshot>) {
        self.updates.send_replace(state.view());
    }

    /// Body of the spawned request task
    async fn run(self: Arc<Self>, ticket: u64, generation: u64, mode: FetchMode) -> FetchResult {
        let mut abandoned = AbandonedFetch {
            inner: Some(self.clone()),
            ticket,
            mode,
        };
        let results = self.source.load().await;
        let name = self.source.name();

        let mut patches = Vec::new();
        let mut failures: Vec<(String, ClientError)> = Vec::new();
        for sub in results {
            match sub.outcome {
                Ok(patch) => patches.push(patch),
                Err(e) => failures.push((sub.endpoint, e)),
            }
        }
        let outcome = match failures.first() {
            Some((_, e)) => Err(e.clone()),
            None => Ok(()),
        };

        let mut state = self.state.lock();
        if state.generation == generation {
            if !patches.is_empty() {
                let mut next = state.data.clone().unwrap_or_default();
                for patch in patches {
                    patch(&mut next);
                }
                state.data = Some(next);
                state.updated_at = Some(Utc::now());
            }

            match (mode, failures.first()) {
                (FetchMode::Foreground, None) => state.error = None,
                (FetchMode::Foreground, Some((_, e))) => state.error = Some(e.user_message()),
                (FetchMode::Background, _) => {}
            }
        } else {
            logger::debug(
                LogTag::Store,
                &format!("{}: discarding response from generation {}", name, generation),
            );
        }

        if mode == FetchMode::Foreground {
            state.loading = false;
        }
        state.guard.settle(ticket);
        self.publish(&state);
        drop(state);
        abandoned.disarm();

        for (endpoint, e) in &failures {
            match mode {
                FetchMode::Foreground => {
                    logger::error(LogTag::Store, &format!("{}: {} failed: {}", name, endpoint, e))
                }
                FetchMode::Background => logger::warning(
                    LogTag::Store,
                    &format!("{}: background refresh of {} failed: {}", name, endpoint, e),
                ),
            }
        }

        outcome
    }
}

/// Frees the in-flight slot if `run` never reaches its end
///
/// A panicking source (or a task cancelled at runtime shutdown) would
/// otherwise leave every later fetch joined to a dead future.
struct AbandonedFetch<S: SnapshotSource> {
    inner: Option<Arc<StoreInner<S>>>,
    ticket: u64,
    mode: FetchMode,
}

impl<S: SnapshotSource> AbandonedFetch<S> {
    fn disarm(&mut self) {
        self.inner = None;
    }
}

impl<S: SnapshotSource> Drop for AbandonedFetch<S> {
    fn drop(&mut self) {
        let Some(inner) = self.inner.take() else {
            return;
        };
        let mut state = inner.state.lock();
        if self.mode == FetchMode::Foreground {
            state.loading = false;
        }
        state.guard.settle(self.ticket);
        inner.publish(&state);
        drop(state);
        logger::error(
            LogTag::Store,
            &format!("{}: fetch #{} aborted before completing", inner.source.name(), self.ticket),
        );
    }
}

/// Shared, cheaply cloneable handle to one data domain
pub struct DataStore<S: SnapshotSource> {
    inner: Arc<StoreInner<S>>,
}

impl<S: SnapshotSource> Clone for DataStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: SnapshotSource> DataStore<S> {
    pub fn new(source: S) -> Self {
        let (updates, _) = watch::channel(StoreSnapshot::default());
        Self {
            inner: Arc::new(StoreInner {
                source,
                state: Mutex::new(FetchState {
                    data: None,
                    loading: false,
                    error: None,
                    updated_at: None,
                    generation: 0,
                    guard: FetchGuard::new(),
                }),
                updates,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.source.name()
    }

    /// Refresh the snapshot, joining the in-flight request if there is one
    ///
    /// The request runs on its own task, so it completes (and clears the
    /// in-flight slot) whether or not the returned future is awaited.
    /// Must be called from within a tokio runtime.
    pub fn fetch(&self, mode: FetchMode) -> FetchFuture {
        let mut state = self.inner.state.lock();
        let generation = state.generation;
        let inner = self.inner.clone();

        let (future, admission) = state.guard.join_or_begin(|ticket| {
            let task = tokio::spawn(inner.run(ticket, generation, mode));
            async move {
                task.await
                    .unwrap_or_else(|e| Err(ClientError::Task(e.to_string())))
            }
            .boxed()
            .shared()
        });

        match admission {
            Admission::Joined => {
                logger::debug(
                    LogTag::Store,
                    &format!("{}: {} fetch joined in-flight request", self.name(), mode),
                );
            }
            Admission::Started(ticket) => {
                logger::debug(
                    LogTag::Store,
                    &format!("{}: {} fetch #{} started", self.name(), mode, ticket),
                );
                if mode == FetchMode::Foreground {
                    state.loading = true;
                }
                self.inner.publish(&state);
            }
        }

        future
    }

    /// Clear the snapshot and flags; an in-flight response will be discarded
    ///
    /// The in-flight slot is kept so the store still never has two requests
    /// outstanding.
    pub fn reset(&self) {
        let mut state = self.inner.state.lock();
        state.generation += 1;
        state.data = None;
        state.error = None;
        state.loading = false;
        state.updated_at = None;
        self.inner.publish(&state);
    }

    pub fn state(&self) -> StoreSnapshot<S::Snapshot> {
        self.inner.state.lock().view()
    }

    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot<S::Snapshot>> {
        self.inner.updates.subscribe()
    }

    pub fn is_fetching(&self) -> bool {
        self.inner.state.lock().guard.is_pending()
    }

    pub fn generation(&self) -> u64 {
        self.inner.state.lock().generation
    }
}

/// Type-erased refresh surface used by pollers, visibility triggers and actions
pub trait Refreshable: Send + Sync {
    fn name(&self) -> &'static str;

    fn refresh(&self, mode: FetchMode) -> FetchFuture;

    fn reset(&self);
}

impl<S: SnapshotSource> Refreshable for DataStore<S> {
    fn name(&self) -> &'static str {
        DataStore::name(self)
    }

    fn refresh(&self, mode: FetchMode) -> FetchFuture {
        self.fetch(mode)
    }

    fn reset(&self) {
        DataStore::reset(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::endpoints;
    use crate::api::mock::MockEngineApi;
    use crate::errors::FALLBACK_ERROR_MESSAGE;
    use crate::store::sources::{EngineSource, LogsSource};
    use serde_json::json;

    fn log_line(message: &str) -> serde_json::Value {
        json!([{ "level": "INFO", "source": "engine", "message": message }])
    }

    fn logs_store(api: &Arc<MockEngineApi>) -> DataStore<LogsSource> {
        DataStore::new(LogsSource::new(api.clone(), 50))
    }

    async fn settle<S: SnapshotSource>(store: &DataStore<S>) {
        for _ in 0..20 {
            if !store.is_fetching() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("fetch for {} never settled", store.name());
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_one_request() {
        let api = Arc::new(MockEngineApi::new());
        let path = endpoints::logs_tail(50);
        api.respond(&path, log_line("started"));
        api.hold();

        let store = logs_store(&api);
        let first = store.fetch(FetchMode::Foreground);
        let second = store.fetch(FetchMode::Background);
        let third = store.fetch(FetchMode::Foreground);
        assert!(store.state().loading);

        api.release();
        let (a, b, c) = tokio::join!(first, second, third);

        assert_eq!(a, Ok(()));
        assert_eq!(b, Ok(()));
        assert_eq!(c, Ok(()));
        assert_eq!(api.calls_to(&path), 1);
        assert_eq!(api.max_in_flight(), 1);

        let state = store.state();
        assert!(!state.loading);
        assert!(!state.fetching);
        assert_eq!(state.data.map(|d| d.entries.len()), Some(1));
    }

    #[tokio::test]
    async fn test_joined_callers_share_failure() {
        let api = Arc::new(MockEngineApi::new());
        let path = endpoints::logs_tail(50);
        api.fail(&path, 503, Some("Engine offline"));
        api.hold();

        let store = logs_store(&api);
        let first = store.fetch(FetchMode::Foreground);
        let second = store.fetch(FetchMode::Foreground);
        api.release();

        let (a, b) = tokio::join!(first, second);
        assert_eq!(a, b);
        assert!(a.is_err());
        assert_eq!(api.calls_to(&path), 1);
    }

    #[tokio::test]
    async fn test_foreground_failure_keeps_data() {
        let api = Arc::new(MockEngineApi::new());
        let path = endpoints::logs_tail(50);
        api.respond(&path, log_line("first"));

        let store = logs_store(&api);
        store.fetch(FetchMode::Foreground).await.unwrap();
        let loaded = store.state().data;
        assert!(loaded.is_some());

        api.fail(&path, 503, Some("Engine offline"));
        let result = store.fetch(FetchMode::Foreground).await;

        assert!(result.is_err());
        let state = store.state();
        assert_eq!(state.error.as_deref(), Some("Engine offline"));
        assert!(!state.loading);
        assert_eq!(state.data, loaded);

        api.respond(&path, log_line("second"));
        store.fetch(FetchMode::Foreground).await.unwrap();
        assert_eq!(store.state().error, None);
    }

    #[tokio::test]
    async fn test_failure_without_server_message_uses_fallback() {
        let api = Arc::new(MockEngineApi::new());
        api.fail_network(&endpoints::logs_tail(50));

        let store = logs_store(&api);
        let _ = store.fetch(FetchMode::Foreground).await;

        assert_eq!(store.state().error.as_deref(), Some(FALLBACK_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn test_background_failure_is_silent() {
        let api = Arc::new(MockEngineApi::new());
        let path = endpoints::logs_tail(50);
        api.fail(&path, 500, Some("boom"));
        api.hold();

        let store = logs_store(&api);
        let pending = store.fetch(FetchMode::Background);
        tokio::task::yield_now().await;
        assert!(!store.state().loading);

        api.release();
        assert!(pending.await.is_err());

        let state = store.state();
        assert_eq!(state.error, None);
        assert!(!state.loading);
        assert_eq!(state.data, None);
    }

    #[tokio::test]
    async fn test_background_success_replaces_data() {
        let api = Arc::new(MockEngineApi::new());
        let path = endpoints::logs_tail(50);
        api.respond(&path, log_line("tick"));

        let store = logs_store(&api);
        let mut updates = store.subscribe();
        store.fetch(FetchMode::Background).await.unwrap();

        assert!(updates.has_changed().unwrap());
        let published = updates.borrow_and_update().clone();
        assert_eq!(published.data.map(|d| d.entries[0].message.clone()).as_deref(), Some("tick"));
        assert!(published.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_partial_failure_applies_successful_fields() {
        let api = Arc::new(MockEngineApi::new());
        api.respond(endpoints::ENGINE_ACCOUNT, json!({ "balance": 1000.0, "equity": 1020.5 }));
        api.respond(endpoints::ENGINE_PNL, json!({ "realized": 12.0, "today": 3.5 }));
        api.respond(endpoints::ENGINE_GROUPS, json!({ "active": 2, "pending": 1 }));
        api.respond(endpoints::POSITIONS, json!([{ "id": "p1", "symbol": "BTCUSDT", "side": "short" }]));
        api.fail(endpoints::ENGINE_TRADE_STATS, 500, Some("Stats unavailable"));

        let store = DataStore::new(EngineSource::new(api.clone()));
        let result = store.fetch(FetchMode::Foreground).await;
        assert!(result.is_err());

        let state = store.state();
        assert_eq!(state.error.as_deref(), Some("Stats unavailable"));
        let data = state.data.unwrap();
        assert_eq!(data.account.map(|a| a.equity), Some(1020.5));
        assert_eq!(data.groups.map(|g| g.active), Some(2));
        assert_eq!(data.positions.map(|p| p.len()), Some(1));
        assert_eq!(data.trade_stats, None);
        assert_eq!(api.total_calls(), 5);
    }

    #[tokio::test]
    async fn test_reset_discards_stale_response() {
        let api = Arc::new(MockEngineApi::new());
        let path = endpoints::logs_tail(50);
        api.respond(&path, log_line("stale"));
        api.hold();

        let store = logs_store(&api);
        let pending = store.fetch(FetchMode::Foreground);
        tokio::task::yield_now().await;

        store.reset();
        assert!(store.is_fetching());
        assert!(!store.state().loading);

        // Still joined while the old request is outstanding
        let joined = store.fetch(FetchMode::Foreground);
        api.release();
        assert_eq!(pending.await, Ok(()));
        assert_eq!(joined.await, Ok(()));

        let state = store.state();
        assert_eq!(state.data, None);
        assert!(!state.loading);
        assert_eq!(api.calls_to(&path), 1);
        assert_eq!(store.generation(), 1);
    }

    #[tokio::test]
    async fn test_unawaited_fetch_still_settles() {
        let api = Arc::new(MockEngineApi::new());
        let path = endpoints::logs_tail(50);
        api.respond(&path, log_line("fire and forget"));

        let store = logs_store(&api);
        drop(store.fetch(FetchMode::Background));
        settle(&store).await;

        assert!(store.state().data.is_some());
        store.fetch(FetchMode::Background).await.unwrap();
        assert_eq!(api.calls_to(&path), 2);
    }

    /// Panics on its first load, then serves a counter
    struct FlakySource {
        loads: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl SnapshotSource for FlakySource {
        type Snapshot = usize;

        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn load(&self) -> Vec<SubResult<usize>> {
            let n = self.loads.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if n == 0 {
                panic!("source blew up");
            }
            let patch: Patch<usize> = Box::new(move |v| *v = n);
            vec![SubResult {
                endpoint: "/flaky".to_string(),
                outcome: Ok(patch),
            }]
        }
    }

    #[tokio::test]
    async fn test_panicked_load_frees_the_slot() {
        let store = DataStore::new(FlakySource {
            loads: std::sync::atomic::AtomicUsize::new(0),
        });

        let first = store.fetch(FetchMode::Foreground).await;
        assert!(matches!(first, Err(ClientError::Task(_))));
        assert!(!store.is_fetching());
        assert!(!store.state().loading);

        store.fetch(FetchMode::Background).await.unwrap();
        assert_eq!(store.state().data, Some(1));
        assert_eq!(store.inner.source.loads.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
