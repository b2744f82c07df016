//! Global keyboard commands
//!
//! Chords handled:
//! - `Alt+1..7` navigate to a fixed route
//! - `Ctrl/Cmd+R` refresh the mounted view (the native reload is always swallowed)
//! - bare `f` / `s` / `e` force start, force stop and run evaluation, on the
//!   risk and overview routes only
//!
//! Nothing is handled while a text-entry control has focus.

use crate::logger::{self, LogTag};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

// =============================================================================
// ROUTES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Route {
    #[default]
    Overview,
    Dashboard,
    Positions,
    Queue,
    Risk,
    Analytics,
    Settings,
}

impl Route {
    pub const ALL: [Route; 7] = [
        Route::Overview,
        Route::Dashboard,
        Route::Positions,
        Route::Queue,
        Route::Risk,
        Route::Analytics,
        Route::Settings,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Overview => "/",
            Route::Dashboard => "/dashboard",
            Route::Positions => "/positions",
            Route::Queue => "/queue",
            Route::Risk => "/risk",
            Route::Analytics => "/analytics",
            Route::Settings => "/settings",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Overview => "Overview",
            Route::Dashboard => "Dashboard",
            Route::Positions => "Positions",
            Route::Queue => "Queue",
            Route::Risk => "Risk",
            Route::Analytics => "Analytics",
            Route::Settings => "Settings",
        }
    }

    /// Route bound to `Alt+<digit>`
    pub fn from_digit(digit: char) -> Option<Route> {
        let index = digit.to_digit(10)? as usize;
        if index == 0 {
            return None;
        }
        Route::ALL.get(index - 1).copied()
    }

    pub fn from_path(path: &str) -> Option<Route> {
        Route::ALL.iter().copied().find(|route| route.path() == path)
    }

    /// Routes where the engine control keys are live
    pub fn has_engine_controls(&self) -> bool {
        matches!(self, Route::Risk | Route::Overview)
    }
}

/// Accepts a path (`/risk`), a bare name (`risk`) or `overview`
impl std::str::FromStr for Route {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().trim_start_matches('/').to_ascii_lowercase();
        if name == "overview" {
            return Ok(Route::Overview);
        }
        Route::from_path(&format!("/{}", name)).ok_or_else(|| format!("unknown view '{}'", s))
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Navigation collaborator
pub trait Navigator: Send + Sync {
    fn current_route(&self) -> Route;

    fn navigate(&self, route: Route);
}

// =============================================================================
// INPUT
// =============================================================================

/// What had focus when the key was pressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusTarget {
    #[default]
    Document,
    TextInput,
    TextArea,
    Editable,
}

impl FocusTarget {
    pub fn is_text_entry(&self) -> bool {
        !matches!(self, FocusTarget::Document)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
    pub target: FocusTarget,
}

impl KeyInput {
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self {
            code,
            modifiers,
            target: FocusTarget::Document,
        }
    }

    pub fn char(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    pub fn with_target(mut self, target: FocusTarget) -> Self {
        self.target = target;
        self
    }

    fn lowercase_char(&self) -> Option<char> {
        match self.code {
            KeyCode::Char(c) => Some(c.to_ascii_lowercase()),
            _ => None,
        }
    }
}

impl From<KeyEvent> for KeyInput {
    fn from(event: KeyEvent) -> Self {
        Self::new(event.code, event.modifiers)
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

pub type KeyCallback = Arc<dyn Fn() + Send + Sync>;

/// Callbacks a view registers; absent callbacks make their chord a no-op
#[derive(Clone, Default)]
pub struct KeyboardOptions {
    pub on_refresh: Option<KeyCallback>,
    pub on_force_start: Option<KeyCallback>,
    pub on_force_stop: Option<KeyCallback>,
    pub on_run_evaluation: Option<KeyCallback>,
}

impl KeyboardOptions {
    pub fn on_refresh(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_refresh = Some(Arc::new(f));
        self
    }

    pub fn on_force_start(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_force_start = Some(Arc::new(f));
        self
    }

    pub fn on_force_stop(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_force_stop = Some(Arc::new(f));
        self
    }

    pub fn on_run_evaluation(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_run_evaluation = Some(Arc::new(f));
        self
    }

    fn callback(&self, command: KeyCommand) -> Option<KeyCallback> {
        match command {
            KeyCommand::Navigate(_) => None,
            KeyCommand::Refresh => self.on_refresh.clone(),
            KeyCommand::ForceStart => self.on_force_start.clone(),
            KeyCommand::ForceStop => self.on_force_stop.clone(),
            KeyCommand::RunEvaluation => self.on_run_evaluation.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Navigate(Route),
    Refresh,
    ForceStart,
    ForceStop,
    RunEvaluation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Not a command; the driver handles the key normally
    Ignored,
    Handled {
        command: KeyCommand,
        prevent_default: bool,
    },
}

impl KeyOutcome {
    /// Whether the native action for this key must be swallowed
    pub fn prevents_default(&self) -> bool {
        matches!(self, KeyOutcome::Handled { prevent_default: true, .. })
    }

    pub fn command(&self) -> Option<KeyCommand> {
        match self {
            KeyOutcome::Ignored => None,
            KeyOutcome::Handled { command, .. } => Some(*command),
        }
    }
}

/// Map a key to a command without side effects
///
/// `route` gates the engine control keys.
pub fn resolve(input: &KeyInput, route: Route) -> Option<KeyCommand> {
    if input.target.is_text_entry() {
        return None;
    }

    let mods = input.modifiers;

    if mods == KeyModifiers::ALT {
        return match input.code {
            KeyCode::Char(c) => Route::from_digit(c).map(KeyCommand::Navigate),
            _ => None,
        };
    }

    let command_key = mods.intersects(KeyModifiers::CONTROL | KeyModifiers::SUPER);
    if command_key {
        if !mods.contains(KeyModifiers::SHIFT) && input.lowercase_char() == Some('r') {
            return Some(KeyCommand::Refresh);
        }
        return None;
    }

    let bare = !mods.intersects(
        KeyModifiers::ALT | KeyModifiers::META | KeyModifiers::HYPER,
    );
    if bare && route.has_engine_controls() {
        return match input.lowercase_char() {
            Some('f') => Some(KeyCommand::ForceStart),
            Some('s') => Some(KeyCommand::ForceStop),
            Some('e') => Some(KeyCommand::RunEvaluation),
            _ => None,
        };
    }

    None
}

// =============================================================================
// ROUTER
// =============================================================================

type Registrations = Mutex<BTreeMap<u64, KeyboardOptions>>;

pub struct KeyboardCommandRouter {
    navigator: Arc<dyn Navigator>,
    registrations: Arc<Registrations>,
    next_id: AtomicU64,
}

/// Keeps a set of callbacks registered; dropping it removes them
pub struct KeyboardRegistration {
    id: u64,
    registrations: Weak<Registrations>,
}

impl Drop for KeyboardRegistration {
    fn drop(&mut self) {
        if let Some(registrations) = self.registrations.upgrade() {
            registrations.lock().remove(&self.id);
            logger::debug(LogTag::Keyboard, &format!("Keyboard registration {} removed", self.id));
        }
    }
}

impl KeyboardCommandRouter {
    pub fn new(navigator: Arc<dyn Navigator>) -> Self {
        Self {
            navigator,
            registrations: Arc::new(Mutex::new(BTreeMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn register(&self, options: KeyboardOptions) -> KeyboardRegistration {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.registrations.lock().insert(id, options);
        logger::debug(LogTag::Keyboard, &format!("Keyboard registration {} added", id));
        KeyboardRegistration {
            id,
            registrations: Arc::downgrade(&self.registrations),
        }
    }

    pub fn registration_count(&self) -> usize {
        self.registrations.lock().len()
    }

    /// Route one key press; callbacks run after the registry lock is released
    pub fn dispatch(&self, input: KeyInput) -> KeyOutcome {
        if self.registrations.lock().is_empty() {
            return KeyOutcome::Ignored;
        }

        let route = self.navigator.current_route();
        let Some(command) = resolve(&input, route) else {
            return KeyOutcome::Ignored;
        };

        logger::debug(LogTag::Keyboard, &format!("{:?} on {}", command, route));

        match command {
            KeyCommand::Navigate(target) => self.navigator.navigate(target),
            _ => {
                let callbacks: Vec<KeyCallback> = self
                    .registrations
                    .lock()
                    .values()
                    .filter_map(|options| options.callback(command))
                    .collect();
                for callback in callbacks {
                    callback();
                }
            }
        }

        KeyOutcome::Handled {
            command,
            prevent_default: true,
        }
    }
}
