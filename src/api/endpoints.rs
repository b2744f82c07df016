//! Engine API paths
//!
//! Paths are relative to `api.base_url`. Ids are percent-encoded as a
//! single path segment by the helpers below.

pub const DASHBOARD_METRICS: &str = "/api/dashboard/metrics";
pub const DASHBOARD_ANALYTICS: &str = "/api/dashboard/analytics";

pub const ENGINE_ACCOUNT: &str = "/api/engine/account";
pub const ENGINE_PNL: &str = "/api/engine/pnl";
pub const ENGINE_GROUPS: &str = "/api/engine/groups/active";
pub const ENGINE_TRADE_STATS: &str = "/api/engine/trades/stats";
pub const ENGINE_FORCE_START: &str = "/api/engine/force-start";
pub const ENGINE_FORCE_STOP: &str = "/api/engine/force-stop";

pub const POSITIONS: &str = "/api/positions";

pub const QUEUE: &str = "/api/queue";
pub const QUEUE_HISTORY: &str = "/api/queue/history";

pub const PRIORITY_RULES: &str = "/api/risk/priority-rules";
pub const PRIORITY_RULES_ORDER: &str = "/api/risk/priority-rules/order";
pub const RISK_EVALUATE: &str = "/api/risk/evaluate";

pub const LOGS: &str = "/api/logs";

pub const AUTH_LOGIN: &str = "/api/auth/login";

pub fn logs_tail(limit: usize) -> String {
    format!("{}?limit={}", LOGS, limit)
}

pub fn promote_signal(signal_id: &str) -> String {
    format!("{}/{}/promote", QUEUE, urlencoding::encode(signal_id))
}

pub fn remove_signal(signal_id: &str) -> String {
    format!("{}/{}/remove", QUEUE, urlencoding::encode(signal_id))
}

pub fn close_position(position_id: &str) -> String {
    format!("{}/{}/close", POSITIONS, urlencoding::encode(position_id))
}

pub fn toggle_priority_rule(rule_id: &str) -> String {
    format!("{}/{}/toggle", PRIORITY_RULES, urlencoding::encode(rule_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_encoded() {
        assert_eq!(promote_signal("sig-42"), "/api/queue/sig-42/promote");
        assert_eq!(close_position("BTC/USDT 1"), "/api/positions/BTC%2FUSDT%201/close");
        assert_eq!(toggle_priority_rule("rule#1"), "/api/risk/priority-rules/rule%231/toggle");
        assert_eq!(logs_tail(50), "/api/logs?limit=50");
    }
}
