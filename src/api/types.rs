//! Wire types returned by the engine API
//!
//! Every struct tolerates missing fields (`#[serde(default)]`) so an older
//! or newer engine does not break the client. Aggregated snapshots keep one
//! `Option` per sub-request: `None` means that part has never loaded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// DASHBOARD
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardMetrics {
    pub total_trades: u64,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub open_positions: u32,
    pub signals_today: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PnlPoint {
    pub date: String,
    pub pnl: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Analytics {
    pub daily_pnl: Vec<PnlPoint>,
    pub best_symbol: Option<String>,
    pub worst_symbol: Option<String>,
    pub avg_hold_minutes: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSnapshot {
    pub metrics: Option<DashboardMetrics>,
    pub analytics: Option<Analytics>,
}

// =============================================================================
// ENGINE
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountSummary {
    pub balance: f64,
    pub equity: f64,
    pub margin_used: f64,
    pub currency: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PnlSummary {
    pub realized: f64,
    pub unrealized: f64,
    pub today: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupCounts {
    pub active: u32,
    pub pending: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeStats {
    pub wins: u32,
    pub losses: u32,
    pub avg_win: f64,
    pub avg_loss: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    #[default]
    Long,
    Short,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Position {
    pub id: String,
    pub symbol: String,
    pub side: PositionSide,
    pub quantity: f64,
    pub entry_price: f64,
    pub mark_price: f64,
    pub unrealized_pnl: f64,
    pub opened_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineSnapshot {
    pub account: Option<AccountSummary>,
    pub pnl: Option<PnlSummary>,
    pub groups: Option<GroupCounts>,
    pub trade_stats: Option<TradeStats>,
    pub positions: Option<Vec<Position>>,
}

// =============================================================================
// QUEUE & PRIORITY RULES
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueuedSignal {
    pub id: String,
    pub symbol: String,
    pub direction: String,
    pub score: f64,
    pub position: u32,
    pub received_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalHistoryEntry {
    pub id: String,
    pub symbol: String,
    /// promoted | removed | expired | executed
    pub outcome: String,
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityRule {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub order: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueSnapshot {
    pub signals: Option<Vec<QueuedSignal>>,
    pub history: Option<Vec<SignalHistoryEntry>>,
    pub priority_rules: Option<Vec<PriorityRule>>,
}

// =============================================================================
// LOGS
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineLogEntry {
    pub timestamp: Option<DateTime<Utc>>,
    pub level: String,
    pub source: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogsSnapshot {
    pub entries: Vec<EngineLogEntry>,
}

// =============================================================================
// AUTH
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub username: String,
    pub display_name: Option<String>,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub user: UserProfile,
}
