//! Snapshot sources for the four data domains
//!
//! Each source fans out to its sub-requests concurrently. A sub-request that
//! succeeds produces a patch for its own field only.

use super::data_store::{Patch, SnapshotSource, SubResult};
use crate::api::endpoints;
use crate::api::types::{
    AccountSummary, Analytics, DashboardMetrics, DashboardSnapshot, EngineLogEntry,
    EngineSnapshot, GroupCounts, LogsSnapshot, PnlSummary, Position, PriorityRule,
    QueueSnapshot, QueuedSignal, SignalHistoryEntry, TradeStats,
};
use crate::api::{get_as, EngineApi};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// GET one document and turn it into a patch for field `assign`
async fn fetch_field<T, V, F>(api: &dyn EngineApi, path: String, assign: F) -> SubResult<T>
where
    T: 'static,
    V: DeserializeOwned + Send + 'static,
    F: FnOnce(&mut T, V) + Send + 'static,
{
    let outcome = get_as::<V>(api, &path)
        .await
        .map(|value| Box::new(move |snapshot: &mut T| assign(snapshot, value)) as Patch<T>);
    SubResult {
        endpoint: path,
        outcome,
    }
}

// =============================================================================
// DASHBOARD
// =============================================================================

pub struct DashboardSource {
    api: Arc<dyn EngineApi>,
}

impl DashboardSource {
    pub fn new(api: Arc<dyn EngineApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl SnapshotSource for DashboardSource {
    type Snapshot = DashboardSnapshot;

    fn name(&self) -> &'static str {
        "dashboard"
    }

    async fn load(&self) -> Vec<SubResult<DashboardSnapshot>> {
        let api = self.api.as_ref();
        let (metrics, analytics) = futures::join!(
            fetch_field(
                api,
                endpoints::DASHBOARD_METRICS.to_string(),
                |s: &mut DashboardSnapshot, v: DashboardMetrics| s.metrics = Some(v),
            ),
            fetch_field(
                api,
                endpoints::DASHBOARD_ANALYTICS.to_string(),
                |s: &mut DashboardSnapshot, v: Analytics| s.analytics = Some(v),
            ),
        );
        vec![metrics, analytics]
    }
}

// =============================================================================
// ENGINE
// =============================================================================

/// Account, P&L, groups, trade statistics and open positions
pub struct EngineSource {
    api: Arc<dyn EngineApi>,
}

impl EngineSource {
    pub fn new(api: Arc<dyn EngineApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl SnapshotSource for EngineSource {
    type Snapshot = EngineSnapshot;

    fn name(&self) -> &'static str {
        "engine"
    }

    async fn load(&self) -> Vec<SubResult<EngineSnapshot>> {
        let api = self.api.as_ref();
        let (account, pnl, groups, trade_stats, positions) = futures::join!(
            fetch_field(
                api,
                endpoints::ENGINE_ACCOUNT.to_string(),
                |s: &mut EngineSnapshot, v: AccountSummary| s.account = Some(v),
            ),
            fetch_field(
                api,
                endpoints::ENGINE_PNL.to_string(),
                |s: &mut EngineSnapshot, v: PnlSummary| s.pnl = Some(v),
            ),
            fetch_field(
                api,
                endpoints::ENGINE_GROUPS.to_string(),
                |s: &mut EngineSnapshot, v: GroupCounts| s.groups = Some(v),
            ),
            fetch_field(
                api,
                endpoints::ENGINE_TRADE_STATS.to_string(),
                |s: &mut EngineSnapshot, v: TradeStats| s.trade_stats = Some(v),
            ),
            fetch_field(
                api,
                endpoints::POSITIONS.to_string(),
                |s: &mut EngineSnapshot, v: Vec<Position>| s.positions = Some(v),
            ),
        );
        vec![account, pnl, groups, trade_stats, positions]
    }
}

// =============================================================================
// QUEUE
// =============================================================================

pub struct QueueSource {
    api: Arc<dyn EngineApi>,
}

impl QueueSource {
    pub fn new(api: Arc<dyn EngineApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl SnapshotSource for QueueSource {
    type Snapshot = QueueSnapshot;

    fn name(&self) -> &'static str {
        "queue"
    }

    async fn load(&self) -> Vec<SubResult<QueueSnapshot>> {
        let api = self.api.as_ref();
        let (signals, history, rules) = futures::join!(
            fetch_field(
                api,
                endpoints::QUEUE.to_string(),
                |s: &mut QueueSnapshot, v: Vec<QueuedSignal>| s.signals = Some(v),
            ),
            fetch_field(
                api,
                endpoints::QUEUE_HISTORY.to_string(),
                |s: &mut QueueSnapshot, v: Vec<SignalHistoryEntry>| s.history = Some(v),
            ),
            fetch_field(
                api,
                endpoints::PRIORITY_RULES.to_string(),
                |s: &mut QueueSnapshot, mut v: Vec<PriorityRule>| {
                    v.sort_by_key(|rule| rule.order);
                    s.priority_rules = Some(v)
                },
            ),
        );
        vec![signals, history, rules]
    }
}

// =============================================================================
// LOGS
// =============================================================================

pub struct LogsSource {
    api: Arc<dyn EngineApi>,
    tail_limit: usize,
}

impl LogsSource {
    pub fn new(api: Arc<dyn EngineApi>, tail_limit: usize) -> Self {
        Self { api, tail_limit }
    }

    pub fn path(&self) -> String {
        endpoints::logs_tail(self.tail_limit)
    }
}

#[async_trait]
impl SnapshotSource for LogsSource {
    type Snapshot = LogsSnapshot;

    fn name(&self) -> &'static str {
        "logs"
    }

    async fn load(&self) -> Vec<SubResult<LogsSnapshot>> {
        let entries = fetch_field(
            self.api.as_ref(),
            self.path(),
            |s: &mut LogsSnapshot, v: Vec<EngineLogEntry>| s.entries = v,
        )
        .await;
        vec![entries]
    }
}
