//! Terminal driver glue
//!
//! Puts the terminal into raw/alternate-screen mode, forwards input and
//! focus events from a reader thread, and paints a plain status frame built
//! from the client's current state.

use crate::app::{stores_for, DashboardClient, StoreKind};
use crate::confirm::ConfirmPrompt;
use crate::keyboard::Route;
use crate::notifications::NotificationKind;
use crate::store::StoreSnapshot;
use crate::visibility::Visibility;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, DisableFocusChange, EnableFocusChange, Event, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, SetTitle},
};
use std::io::{self, stdout, Stdout, Write};
use tokio::sync::mpsc;

/// Input the driver reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverInput {
    Key(KeyEvent),
    Visibility(Visibility),
    Resize,
}

/// Map a raw crossterm event; key releases and mouse input are dropped
pub fn map_event(event: Event) -> Option<DriverInput> {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => Some(DriverInput::Key(key)),
        Event::FocusLost => Some(DriverInput::Visibility(Visibility::Hidden)),
        Event::FocusGained => Some(DriverInput::Visibility(Visibility::Visible)),
        Event::Resize(_, _) => Some(DriverInput::Resize),
        _ => None,
    }
}

/// Read events on a dedicated thread; the channel closes when reading fails
pub fn spawn_input_reader() -> mpsc::UnboundedReceiver<DriverInput> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || loop {
        match event::read() {
            Ok(event) => {
                if let Some(input) = map_event(event) {
                    if tx.send(input).is_err() {
                        break;
                    }
                }
            }
            Err(_) => break,
        }
    });
    rx
}

// =============================================================================
// SCREEN
// =============================================================================

/// Raw-mode alternate screen, restored on drop
pub struct Screen<W: Write = Stdout> {
    out: W,
    active: bool,
}

impl Screen<Stdout> {
    pub fn enter() -> io::Result<Self> {
        Self::enter_on(stdout())
    }
}

impl<W: Write> Screen<W> {
    /// Take over `out`; on any setup error the partial setup is undone
    pub fn enter_on(out: W) -> io::Result<Self> {
        let mut screen = Self { out, active: true };
        execute!(
            screen.out,
            EnterAlternateScreen,
            EnableFocusChange,
            Hide,
            Clear(ClearType::All),
            SetTitle("tradedeck")
        )?;
        terminal::enable_raw_mode()?;
        Ok(screen)
    }

    pub fn draw(&mut self, lines: &[FrameLine]) -> io::Result<()> {
        let (width, height) = terminal::size()?;
        queue!(self.out, Clear(ClearType::All))?;
        for (row, line) in lines.iter().take(height as usize).enumerate() {
            let text: String = line.text.chars().take(width as usize).collect();
            queue!(
                self.out,
                MoveTo(0, row as u16),
                SetForegroundColor(line.color),
                Print(text),
                ResetColor
            )?;
        }
        self.out.flush()
    }

    pub fn leave(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        let raw = terminal::disable_raw_mode();
        execute!(self.out, Show, DisableFocusChange, LeaveAlternateScreen)?;
        raw
    }
}

impl<W: Write> Drop for Screen<W> {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

// =============================================================================
// FRAME
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct FrameLine {
    pub color: Color,
    pub text: String,
}

impl FrameLine {
    fn new(color: Color, text: impl Into<String>) -> Self {
        Self {
            color,
            text: text.into(),
        }
    }
}

fn status<T>(snapshot: &StoreSnapshot<T>) -> String {
    if snapshot.loading {
        return "loading...".to_string();
    }
    if let Some(error) = &snapshot.error {
        return format!("error: {}", error);
    }
    match snapshot.updated_at {
        Some(at) => format!("updated {}", at.with_timezone(&chrono::Local).format("%H:%M:%S")),
        None => "no data".to_string(),
    }
}

fn store_lines(client: &DashboardClient, kind: StoreKind) -> Vec<FrameLine> {
    let mut lines = Vec::new();
    match kind {
        StoreKind::Dashboard => {
            let state = client.dashboard.state();
            lines.push(FrameLine::new(Color::Cyan, format!("Dashboard  [{}]", status(&state))));
            if let Some(metrics) = state.data.as_ref().and_then(|d| d.metrics.as_ref()) {
                lines.push(FrameLine::new(
                    Color::White,
                    format!(
                        "  trades {}  win rate {:.1}%  P&L {:+.2}  open {}  signals today {}",
                        metrics.total_trades,
                        metrics.win_rate,
                        metrics.total_pnl,
                        metrics.open_positions,
                        metrics.signals_today
                    ),
                ));
            }
        }
        StoreKind::Engine => {
            let state = client.engine.state();
            lines.push(FrameLine::new(Color::Cyan, format!("Engine  [{}]", status(&state))));
            if let Some(data) = &state.data {
                if let Some(account) = &data.account {
                    lines.push(FrameLine::new(
                        Color::White,
                        format!(
                            "  equity {:.2} {}  balance {:.2}  margin {:.2}",
                            account.equity, account.currency, account.balance, account.margin_used
                        ),
                    ));
                }
                for position in data.positions.iter().flatten().take(8) {
                    let color = if position.unrealized_pnl >= 0.0 { Color::Green } else { Color::Red };
                    lines.push(FrameLine::new(
                        color,
                        format!(
                            "  {:<10} {:?} qty {} entry {:.4} mark {:.4} uPnL {:+.2}",
                            position.symbol,
                            position.side,
                            position.quantity,
                            position.entry_price,
                            position.mark_price,
                            position.unrealized_pnl
                        ),
                    ));
                }
            }
        }
        StoreKind::Queue => {
            let state = client.queue.state();
            lines.push(FrameLine::new(Color::Cyan, format!("Queue  [{}]", status(&state))));
            if let Some(data) = &state.data {
                for signal in data.signals.iter().flatten().take(8) {
                    lines.push(FrameLine::new(
                        Color::White,
                        format!(
                            "  #{:<3} {:<10} {:<5} score {:.2}",
                            signal.position, signal.symbol, signal.direction, signal.score
                        ),
                    ));
                }
                if let Some(rules) = &data.priority_rules {
                    let enabled = rules.iter().filter(|r| r.enabled).count();
                    lines.push(FrameLine::new(
                        Color::DarkGrey,
                        format!("  priority rules: {} ({} enabled)", rules.len(), enabled),
                    ));
                }
            }
        }
        StoreKind::Logs => {
            let state = client.logs.state();
            lines.push(FrameLine::new(Color::Cyan, format!("Engine logs  [{}]", status(&state))));
            if let Some(data) = &state.data {
                for entry in data.entries.iter().rev().take(12) {
                    lines.push(FrameLine::new(
                        Color::DarkGrey,
                        format!("  {:<7} {:<10} {}", entry.level, entry.source, entry.message),
                    ));
                }
            }
        }
    }
    lines
}

fn prompt_lines(prompt: &ConfirmPrompt) -> Vec<FrameLine> {
    let mut lines = vec![
        FrameLine::new(Color::Yellow, format!("== {} ==", prompt.title)),
    ];
    if !prompt.message.is_empty() {
        lines.push(FrameLine::new(Color::Yellow, prompt.message.clone()));
    }
    lines.push(FrameLine::new(
        Color::Yellow,
        format!("(y) {}   (n) {}   (esc) dismiss", prompt.confirm_text, prompt.cancel_text),
    ));
    lines
}

/// Build the full frame for `route`
pub fn render(client: &DashboardClient, route: Route) -> Vec<FrameLine> {
    let user = client
        .session()
        .profile()
        .map(|p| p.display_name.unwrap_or(p.username))
        .unwrap_or_else(|| "not signed in".to_string());

    let mut lines = vec![
        FrameLine::new(
            Color::Magenta,
            format!("tradedeck | {} | {}", route.title(), user),
        ),
        FrameLine::new(Color::DarkGrey, String::new()),
    ];

    for kind in stores_for(route) {
        lines.extend(store_lines(client, *kind));
        lines.push(FrameLine::new(Color::DarkGrey, String::new()));
    }

    if let Some(prompt) = client.gate.current() {
        lines.extend(prompt_lines(&prompt));
        lines.push(FrameLine::new(Color::DarkGrey, String::new()));
    }

    for notification in client.notifications.list().iter().rev() {
        let color = match notification.kind {
            NotificationKind::Success => Color::Green,
            NotificationKind::Error => Color::Red,
            NotificationKind::Warning => Color::Yellow,
            NotificationKind::Info => Color::Blue,
        };
        lines.push(FrameLine::new(
            color,
            format!("{} {}", notification.kind.icon(), notification.message),
        ));
    }

    lines.push(FrameLine::new(
        Color::DarkGrey,
        "Alt+1..7 views | Ctrl+R refresh | f/s/e engine (risk, overview) | p/x promote/remove top signal | c close first position | q quit",
    ));
    lines
}
