//! Application context
//!
//! `DashboardClient` is built once at startup and passed by reference. It
//! owns every store, poller and UI service, so tests get a fresh instance
//! instead of sharing process-wide state.

use crate::actions::{report, ActionOutcome, ActionType, OperatorActions};
use crate::api::{self, EngineApi, HttpEngineApi};
use crate::api::types::UserProfile;
use crate::config::{session_path, ClientConfig, LoggingConfig};
use crate::confirm::ConfirmationGate;
use crate::errors::ClientResult;
use crate::keyboard::{KeyboardCommandRouter, KeyboardOptions, KeyboardRegistration, Navigator, Route};
use crate::logger::{self, config_from_flags, LogTag, LoggerConfig};
use crate::notifications::NotificationQueue;
use crate::polling::PollingController;
use crate::session::Session;
use crate::storage::FileStorage;
use crate::store::{
    DashboardSource, DataStore, EngineSource, FetchFuture, FetchMode, LogsSource, QueueSource,
    Refreshable,
};
use crate::visibility::{VisibilityEvents, VisibilityObserver, VisibilityRefreshTrigger};
use futures::future::join_all;
use parking_lot::Mutex;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    Dashboard,
    Engine,
    Queue,
    Logs,
}

impl StoreKind {
    pub const ALL: [StoreKind; 4] = [
        StoreKind::Dashboard,
        StoreKind::Engine,
        StoreKind::Queue,
        StoreKind::Logs,
    ];
}

/// Stores a view reads while mounted
pub fn stores_for(route: Route) -> &'static [StoreKind] {
    match route {
        Route::Overview => &[StoreKind::Dashboard, StoreKind::Engine, StoreKind::Queue],
        Route::Dashboard => &[StoreKind::Dashboard, StoreKind::Engine],
        Route::Positions => &[StoreKind::Engine],
        Route::Queue => &[StoreKind::Queue],
        Route::Risk => &[StoreKind::Queue, StoreKind::Engine],
        Route::Analytics => &[StoreKind::Dashboard],
        Route::Settings => &[StoreKind::Logs],
    }
}

// =============================================================================
// ROUTE STATE
// =============================================================================

/// Current route, observable by the driver
pub struct RouteState {
    current: Mutex<Route>,
    updates: watch::Sender<Route>,
}

impl RouteState {
    pub fn new(initial: Route) -> Self {
        let (updates, _) = watch::channel(initial);
        Self {
            current: Mutex::new(initial),
            updates,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Route> {
        self.updates.subscribe()
    }
}

impl Navigator for RouteState {
    fn current_route(&self) -> Route {
        *self.current.lock()
    }

    fn navigate(&self, route: Route) {
        let mut current = self.current.lock();
        if *current == route {
            return;
        }
        logger::info(LogTag::Keyboard, &format!("Navigating {} -> {}", *current, route));
        *current = route;
        self.updates.send_replace(route);
    }
}

// =============================================================================
// VIEW MOUNT
// =============================================================================

/// Everything a mounted view keeps alive; dropping it unmounts the view
pub struct ViewMount {
    route: Route,
    pollers: Vec<Arc<PollingController>>,
    initial: Vec<FetchFuture>,
    _keyboard: KeyboardRegistration,
    _visibility: Option<VisibilityObserver>,
}

impl ViewMount {
    pub fn route(&self) -> Route {
        self.route
    }

    /// Wait for the initial foreground fetches; true if all succeeded
    pub async fn ready(&self) -> bool {
        join_all(self.initial.iter().cloned())
            .await
            .iter()
            .all(|result| result.is_ok())
    }
}

impl Drop for ViewMount {
    fn drop(&mut self) {
        for poller in &self.pollers {
            poller.stop();
        }
        logger::debug(LogTag::System, &format!("Unmounted {}", self.route));
    }
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct DashboardClient {
    config: ClientConfig,
    session: Arc<Session>,
    api: Arc<dyn EngineApi>,
    pub dashboard: Arc<DataStore<DashboardSource>>,
    pub engine: Arc<DataStore<EngineSource>>,
    pub queue: Arc<DataStore<QueueSource>>,
    pub logs: Arc<DataStore<LogsSource>>,
    pollers: Vec<(StoreKind, Arc<PollingController>)>,
    pub gate: Arc<ConfirmationGate>,
    pub notifications: NotificationQueue,
    pub keyboard: KeyboardCommandRouter,
    pub visibility: VisibilityEvents,
    pub routes: Arc<RouteState>,
    pub actions: Arc<OperatorActions>,
}

impl DashboardClient {
    pub fn new(config: ClientConfig, session: Arc<Session>, api: Arc<dyn EngineApi>) -> Self {
        let dashboard = Arc::new(DataStore::new(DashboardSource::new(api.clone())));
        let engine = Arc::new(DataStore::new(EngineSource::new(api.clone())));
        let queue = Arc::new(DataStore::new(QueueSource::new(api.clone())));
        let logs = Arc::new(DataStore::new(LogsSource::new(api.clone(), config.logs.tail_limit)));

        let polling = &config.polling;
        let pollers = vec![
            (
                StoreKind::Dashboard,
                poller(dashboard.clone(), polling.dashboard_interval_ms),
            ),
            (StoreKind::Engine, poller(engine.clone(), polling.engine_interval_ms)),
            (StoreKind::Queue, poller(queue.clone(), polling.queue_interval_ms)),
            (StoreKind::Logs, poller(logs.clone(), polling.logs_interval_ms)),
        ];

        let gate = Arc::new(ConfirmationGate::new());
        let routes = Arc::new(RouteState::new(Route::default()));
        let actions = Arc::new(OperatorActions::new(
            api.clone(),
            gate.clone(),
            engine.clone(),
            queue.clone(),
        ));

        Self {
            notifications: NotificationQueue::from(&config.notifications),
            keyboard: KeyboardCommandRouter::new(routes.clone()),
            visibility: VisibilityEvents::new(),
            config,
            session,
            api,
            dashboard,
            engine,
            queue,
            logs,
            pollers,
            gate,
            routes,
            actions,
        }
    }

    /// Wire the HTTP API and the persisted session from configuration
    pub fn from_config(config: ClientConfig) -> ClientResult<Self> {
        let storage = Arc::new(FileStorage::open(session_path(&config))?);
        let session = Arc::new(Session::restore(storage)?);
        let api = Arc::new(HttpEngineApi::new(&config.api, session.clone())?);
        Ok(Self::new(config, session, api))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn store(&self, kind: StoreKind) -> Arc<dyn Refreshable> {
        match kind {
            StoreKind::Dashboard => self.dashboard.clone(),
            StoreKind::Engine => self.engine.clone(),
            StoreKind::Queue => self.queue.clone(),
            StoreKind::Logs => self.logs.clone(),
        }
    }

    fn poller_for(&self, kind: StoreKind) -> Option<Arc<PollingController>> {
        self.pollers
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, p)| p.clone())
    }

    /// Mount the view for `route`
    ///
    /// Fetches its stores in the foreground, starts their pollers, registers
    /// the keyboard commands and observes visibility. Drop the previous
    /// mount before mounting the next one; pollers are shared per store.
    pub fn mount(&self, route: Route) -> ViewMount {
        self.routes.navigate(route);
        let kinds = stores_for(route);
        let stores: Vec<Arc<dyn Refreshable>> = kinds.iter().map(|k| self.store(*k)).collect();

        let initial = stores
            .iter()
            .map(|store| store.refresh(FetchMode::Foreground))
            .collect();

        let pollers: Vec<Arc<PollingController>> =
            kinds.iter().filter_map(|k| self.poller_for(*k)).collect();
        for poller in &pollers {
            poller.start();
        }

        let refresh_stores = stores.clone();
        let mut options = KeyboardOptions::default().on_refresh(move || {
            for store in &refresh_stores {
                drop(store.refresh(FetchMode::Foreground));
            }
        });
        if route.has_engine_controls() {
            options.on_force_start = Some(self.spawn_action(ActionType::ForceStartEngine, |a| async move {
                a.force_start_engine().await
            }));
            options.on_force_stop = Some(self.spawn_action(ActionType::ForceStopEngine, |a| async move {
                a.force_stop_engine().await
            }));
            options.on_run_evaluation = Some(self.spawn_action(ActionType::RunEvaluation, |a| async move {
                a.run_evaluation().await
            }));
        }
        let keyboard = self.keyboard.register(options);

        let background_stores = stores;
        let visibility = VisibilityRefreshTrigger::from(&self.config.visibility).observe(
            &self.visibility,
            move || {
                for store in &background_stores {
                    drop(store.refresh(FetchMode::Background));
                }
            },
        );

        logger::info(LogTag::System, &format!("Mounted {} ({})", route.title(), route));
        ViewMount {
            route,
            pollers,
            initial,
            _keyboard: keyboard,
            _visibility: visibility,
        }
    }

    /// Keyboard callback running an engine command and reporting its outcome
    fn spawn_action<F, Fut>(&self, action: ActionType, command: F) -> Arc<dyn Fn() + Send + Sync>
    where
        F: Fn(Arc<OperatorActions>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ClientResult<ActionOutcome>> + Send + 'static,
    {
        let actions = self.actions.clone();
        let notifications = self.notifications.clone();
        Arc::new(move || {
            let pending = command(actions.clone());
            let notifications = notifications.clone();
            tokio::spawn(async move {
                let result = pending.await;
                report(&notifications, action.success_message(), &result);
            });
        })
    }

    /// Authenticate against the engine and persist the session
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<UserProfile> {
        let response = api::login(self.api.as_ref(), username, password).await?;
        self.sign_in(&response.token, response.user.clone())?;
        logger::info(LogTag::Session, &format!("Signed in as {}", username));
        Ok(response.user)
    }

    /// Store the token and profile returned by a successful login
    pub fn sign_in(&self, token: &str, profile: UserProfile) -> ClientResult<()> {
        self.session.login(token, profile)
    }

    /// Clear the session and drop every store's snapshot
    pub fn logout(&self) -> ClientResult<()> {
        self.session.logout()?;
        for kind in StoreKind::ALL {
            self.store(kind).reset();
        }
        Ok(())
    }
}

fn poller(store: Arc<dyn Refreshable>, interval_ms: u64) -> Arc<PollingController> {
    Arc::new(PollingController::new(store, Duration::from_millis(interval_ms)))
}

/// Logger settings from the `[logging]` section plus command-line flags
///
/// Flags win over the file: `--verbose`/`--quiet`/`--debug` override
/// `min_level`. Debug tags from both sources are merged.
pub fn logger_config(logging: &LoggingConfig, debug_flags: &[String], verbose: bool, quiet: bool) -> LoggerConfig {
    let keys: Vec<String> = logging
        .debug_tags
        .iter()
        .chain(debug_flags.iter())
        .cloned()
        .collect();
    let mut config = config_from_flags(&keys, verbose, quiet);

    let flags_set_level = verbose || quiet || !debug_flags.is_empty();
    if !flags_set_level {
        config.min_level = logging.min_level;
    }

    config.enabled_tags = logging
        .only_tags
        .iter()
        .filter_map(|key| LogTag::from_debug_key(key))
        .collect();

    if !logging.file_path.trim().is_empty() {
        config.file_path = Some(PathBuf::from(&logging.file_path));
    }
    config
}
