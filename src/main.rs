use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tradedeck::{
    actions::{report, ActionType},
    app::{logger_config, DashboardClient},
    config::{load_config_from_path, CONFIG_FILE_PATH},
    keyboard::{KeyInput, Navigator, Route},
    logger::{self, LogTag},
    terminal::{self, DriverInput, Screen},
};

const REDRAW_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Parser, Debug)]
#[command(name = "tradedeck", version, about = "Operator console for the trading engine")]
struct Args {
    /// Configuration file
    #[arg(long, default_value = CONFIG_FILE_PATH)]
    config: PathBuf,

    /// Engine API base URL (overrides the config file)
    #[arg(long)]
    base_url: Option<String>,

    /// Sign in as USER before starting; the password is read from
    /// TRADEDECK_PASSWORD or prompted for on stdin
    #[arg(long, value_name = "USER")]
    login: Option<String>,

    /// View to open first: overview, dashboard, positions, queue, risk, analytics, settings
    #[arg(long, default_value = "overview")]
    view: Route,

    /// Enable debug output for a subsystem (repeatable): api, store, polling, ...
    #[arg(long = "debug", value_name = "TAG")]
    debug: Vec<String>,

    /// Print verbose output
    #[arg(long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print warnings and errors
    #[arg(long)]
    quiet: bool,
}

/// Entry point for the tradedeck terminal client
///
/// Loads configuration, restores the session, then runs the event loop until
/// the operator quits. Console logging is switched off while the screen is
/// in raw mode; configure `logging.file_path` to keep logs.
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config_from_path(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(base_url) = args.base_url {
        config.api.base_url = base_url;
    }

    logger::init(logger_config(&config.logging, &args.debug, args.verbose, args.quiet));
    logger::info(
        LogTag::System,
        &format!("🚀 tradedeck starting against {}", config.api.base_url),
    );

    let client = DashboardClient::from_config(config).context("initializing client")?;
    if let Some(username) = &args.login {
        let password = read_password(username)?;
        client
            .login(username, &password)
            .await
            .map_err(|e| anyhow::anyhow!("login failed: {}", e.user_message()))?;
    }
    if !client.session().is_authenticated() {
        logger::warning(LogTag::Session, "No stored session; requests are sent unauthenticated");
    }

    client.routes.navigate(args.view);
    let result = run(&client).await;

    logger::set_console_enabled(true);
    match &result {
        Ok(()) => logger::info(LogTag::System, "✅ tradedeck stopped"),
        Err(e) => logger::error(LogTag::System, &format!("tradedeck failed: {:#}", e)),
    }
    logger::flush();
    result
}

fn read_password(username: &str) -> Result<String> {
    if let Ok(password) = std::env::var("TRADEDECK_PASSWORD") {
        return Ok(password);
    }
    eprint!("Password for {}: ", username);
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line).context("reading password")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn run(client: &DashboardClient) -> Result<()> {
    let mut screen = Screen::enter().context("entering raw mode")?;
    logger::set_console_enabled(false);

    let mut inputs = terminal::spawn_input_reader();
    let mut routes = client.routes.subscribe();
    let mut redraw = tokio::time::interval(REDRAW_INTERVAL);

    let mut mount = Some(client.mount(client.routes.current_route()));

    loop {
        if routes.has_changed().unwrap_or(false) {
            let route = *routes.borrow_and_update();
            // Old pollers and registrations go first
            drop(mount.take());
            mount = Some(client.mount(route));
        }

        let route = mount.as_ref().map(|m| m.route()).unwrap_or_default();
        screen.draw(&terminal::render(client, route))?;

        tokio::select! {
            _ = redraw.tick() => {}
            input = inputs.recv() => {
                let Some(input) = input else {
                    logger::warning(LogTag::System, "Input stream closed");
                    break;
                };
                if !handle_input(client, route, input) {
                    break;
                }
            }
        }
    }

    drop(mount);
    screen.leave()?;
    Ok(())
}

/// Returns false when the operator asked to quit
fn handle_input(client: &DashboardClient, route: Route, input: DriverInput) -> bool {
    match input {
        DriverInput::Visibility(visibility) => client.visibility.publish(visibility),
        DriverInput::Resize => {}
        DriverInput::Key(key) => return handle_key(client, route, key),
    }
    true
}

fn handle_key(client: &DashboardClient, route: Route, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return false;
    }

    if client.gate.is_open() {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                client.gate.confirm();
            }
            KeyCode::Char('n') => {
                client.gate.cancel();
            }
            KeyCode::Esc => {
                client.gate.dismiss();
            }
            _ => {}
        }
        return true;
    }

    if client.keyboard.dispatch(KeyInput::from(key)).prevents_default() {
        return true;
    }

    if key.modifiers.is_empty() {
        match key.code {
            KeyCode::Char('q') => return false,
            KeyCode::Char('p') if route == Route::Queue => spawn_signal_action(client, true),
            KeyCode::Char('x') if route == Route::Queue => spawn_signal_action(client, false),
            KeyCode::Char('c') if route == Route::Positions => spawn_close_first_position(client),
            _ => {}
        }
    }
    true
}

fn spawn_signal_action(client: &DashboardClient, promote: bool) {
    let first = client
        .queue
        .state()
        .data
        .and_then(|d| d.signals)
        .and_then(|signals| signals.into_iter().next());
    let Some(signal) = first else {
        client.notifications.info("Queue is empty");
        return;
    };

    let actions = client.actions.clone();
    let notifications = client.notifications.clone();
    tokio::spawn(async move {
        let (action, result) = if promote {
            (ActionType::PromoteSignal, actions.promote_signal(&signal.id).await)
        } else {
            (ActionType::RemoveSignal, actions.remove_signal(&signal.id).await)
        };
        report(&notifications, action.success_message(), &result);
    });
}

fn spawn_close_first_position(client: &DashboardClient) {
    let first = client
        .engine
        .state()
        .data
        .and_then(|d| d.positions)
        .and_then(|positions| positions.into_iter().next());
    let Some(position) = first else {
        client.notifications.info("No open positions");
        return;
    };

    let actions = client.actions.clone();
    let notifications = client.notifications.clone();
    tokio::spawn(async move {
        let result = actions.force_close_position(&position.id).await;
        report(&notifications, ActionType::ForceClosePosition.success_message(), &result);
    });
}
