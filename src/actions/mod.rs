//! Operator commands against the engine
//!
//! Irreversible commands (promote, remove, force close, force stop) pass
//! through the confirmation gate first. After the engine accepts a command,
//! the store it affects is refreshed in the background. Failures propagate
//! to the caller, which reports them with `report`.

mod types;

pub use types::{ActionOutcome, ActionType, AffectedStore};

use crate::api::{endpoints, EngineApi};
use crate::confirm::{ConfirmOptions, ConfirmationGate};
use crate::errors::ClientResult;
use crate::logger::{self, LogTag};
use crate::notifications::{NotificationId, NotificationQueue};
use crate::store::{FetchMode, Refreshable};
use serde_json::{json, Value};
use std::sync::Arc;

pub struct OperatorActions {
    api: Arc<dyn EngineApi>,
    gate: Arc<ConfirmationGate>,
    engine: Arc<dyn Refreshable>,
    queue: Arc<dyn Refreshable>,
}

impl OperatorActions {
    pub fn new(
        api: Arc<dyn EngineApi>,
        gate: Arc<ConfirmationGate>,
        engine: Arc<dyn Refreshable>,
        queue: Arc<dyn Refreshable>,
    ) -> Self {
        Self {
            api,
            gate,
            engine,
            queue,
        }
    }

    pub async fn promote_signal(&self, signal_id: &str) -> ClientResult<ActionOutcome> {
        self.execute(ActionType::PromoteSignal, signal_id, endpoints::promote_signal(signal_id), json!({}))
            .await
    }

    pub async fn remove_signal(&self, signal_id: &str) -> ClientResult<ActionOutcome> {
        self.execute(ActionType::RemoveSignal, signal_id, endpoints::remove_signal(signal_id), json!({}))
            .await
    }

    pub async fn force_close_position(&self, position_id: &str) -> ClientResult<ActionOutcome> {
        self.execute(
            ActionType::ForceClosePosition,
            position_id,
            endpoints::close_position(position_id),
            json!({}),
        )
        .await
    }

    pub async fn force_stop_engine(&self) -> ClientResult<ActionOutcome> {
        self.execute(ActionType::ForceStopEngine, "", endpoints::ENGINE_FORCE_STOP.to_string(), json!({}))
            .await
    }

    pub async fn force_start_engine(&self) -> ClientResult<ActionOutcome> {
        self.execute(ActionType::ForceStartEngine, "", endpoints::ENGINE_FORCE_START.to_string(), json!({}))
            .await
    }

    pub async fn run_evaluation(&self) -> ClientResult<ActionOutcome> {
        self.execute(ActionType::RunEvaluation, "", endpoints::RISK_EVALUATE.to_string(), json!({}))
            .await
    }

    pub async fn toggle_priority_rule(&self, rule_id: &str, enabled: bool) -> ClientResult<ActionOutcome> {
        self.execute(
            ActionType::TogglePriorityRule,
            rule_id,
            endpoints::toggle_priority_rule(rule_id),
            json!({ "enabled": enabled }),
        )
        .await
    }

    /// Persist a new rule order; `rule_ids` is the full list, first = highest priority
    pub async fn reorder_priority_rules(&self, rule_ids: &[String]) -> ClientResult<ActionOutcome> {
        self.execute(
            ActionType::ReorderPriorityRules,
            "",
            endpoints::PRIORITY_RULES_ORDER.to_string(),
            json!({ "rule_ids": rule_ids }),
        )
        .await
    }

    /// Post `action`, asking the operator first when the action requires it
    async fn execute(
        &self,
        action: ActionType,
        target: &str,
        path: String,
        body: Value,
    ) -> ClientResult<ActionOutcome> {
        if !action.requires_confirmation() {
            return self.perform(action, &path, body).await.map(ActionOutcome::Completed);
        }

        let accepted = self
            .gate
            .run_confirmed(prompt(action, target), || self.perform(action, &path, body))
            .await?;

        match accepted {
            Some(ack) => Ok(ActionOutcome::Completed(ack)),
            None => {
                logger::info(LogTag::Actions, &format!("{} cancelled by operator", action));
                Ok(ActionOutcome::Cancelled)
            }
        }
    }

    async fn perform(&self, action: ActionType, path: &str, body: Value) -> ClientResult<Value> {
        logger::info(LogTag::Actions, &format!("{} -> POST {}", action, path));

        let ack = self.api.post(path, body).await.map_err(|e| {
            logger::error(LogTag::Actions, &format!("{} failed: {}", action, e));
            e
        })?;

        let store = match action.affected_store() {
            AffectedStore::Engine => &self.engine,
            AffectedStore::Queue => &self.queue,
        };
        drop(store.refresh(FetchMode::Background));

        Ok(ack)
    }
}

/// Prompt shown before a gated action on `target`
fn prompt(action: ActionType, target: &str) -> ConfirmOptions {
    match action {
        ActionType::PromoteSignal => ConfirmOptions::titled("Promote Signal")
            .message(format!("Move signal {} to the front of the queue?", target))
            .confirm_text("Promote"),
        ActionType::RemoveSignal => ConfirmOptions::titled("Remove Signal")
            .message(format!("Remove signal {} from the queue? This cannot be undone.", target))
            .confirm_text("Remove"),
        ActionType::ForceClosePosition => ConfirmOptions::titled("Force Close Position")
            .message(format!("Close position {} at market now?", target))
            .confirm_text("Close Position"),
        ActionType::ForceStopEngine => ConfirmOptions::titled("Force Stop Engine")
            .message("Stop the engine? No new signals will be executed until it is started again.")
            .confirm_text("Stop Engine"),
        other => ConfirmOptions::titled(other.success_message()),
    }
}

/// Turn an action result into a notification; nothing is shown on cancel
pub fn report(
    notifications: &NotificationQueue,
    label: &str,
    result: &ClientResult<ActionOutcome>,
) -> Option<NotificationId> {
    match result {
        Ok(ActionOutcome::Completed(_)) => Some(notifications.success(label)),
        Ok(ActionOutcome::Cancelled) => None,
        Err(e) => Some(notifications.error(e.user_message())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockEngineApi;
    use crate::notifications::NotificationKind;
    use crate::store::{DataStore, EngineSource, QueueSource};

    struct Fixture {
        api: Arc<MockEngineApi>,
        gate: Arc<ConfirmationGate>,
        queue: Arc<DataStore<QueueSource>>,
        actions: Arc<OperatorActions>,
    }

    fn fixture() -> Fixture {
        let api = Arc::new(MockEngineApi::new());
        let gate = Arc::new(ConfirmationGate::new());
        let engine = Arc::new(DataStore::new(EngineSource::new(api.clone())));
        let queue = Arc::new(DataStore::new(QueueSource::new(api.clone())));
        api.respond(endpoints::QUEUE, json!([]));
        api.respond(endpoints::QUEUE_HISTORY, json!([]));
        api.respond(endpoints::PRIORITY_RULES, json!([]));
        let actions = Arc::new(OperatorActions::new(api.clone(), gate.clone(), engine, queue.clone()));
        Fixture {
            api,
            gate,
            queue,
            actions,
        }
    }

    async fn wait_for_prompt(gate: &ConfirmationGate) {
        while !gate.is_open() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_confirmed_promote_posts_and_refreshes() {
        let f = fixture();
        let path = endpoints::promote_signal("sig-7");
        f.api.respond(&path, json!({ "status": "ok" }));

        let task = {
            let actions = f.actions.clone();
            tokio::spawn(async move { actions.promote_signal("sig-7").await })
        };
        wait_for_prompt(&f.gate).await;
        assert_eq!(f.gate.current().map(|p| p.title).as_deref(), Some("Promote Signal"));
        assert!(f.api.posts().is_empty());

        f.gate.confirm();
        let outcome = task.await.unwrap().unwrap();

        assert_eq!(outcome, ActionOutcome::Completed(json!({ "status": "ok" })));
        assert_eq!(f.api.posts(), vec![(path, json!({}))]);
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(f.api.calls_to(endpoints::QUEUE), 1);
        assert!(f.queue.state().data.is_some());
    }

    #[tokio::test]
    async fn test_cancelled_remove_never_posts() {
        let f = fixture();
        let notifications = NotificationQueue::default();

        let task = {
            let actions = f.actions.clone();
            tokio::spawn(async move { actions.remove_signal("sig-9").await })
        };
        wait_for_prompt(&f.gate).await;
        f.gate.cancel();

        let result = task.await.unwrap();
        assert_eq!(result, Ok(ActionOutcome::Cancelled));
        assert!(f.api.posts().is_empty());
        assert_eq!(report(&notifications, "Signal removed", &result), None);
        assert!(notifications.is_empty());
    }

    #[tokio::test]
    async fn test_failed_close_reports_server_message() {
        let f = fixture();
        let notifications = NotificationQueue::default();
        f.api.fail(&endpoints::close_position("p-1"), 409, Some("Position locked"));

        let task = {
            let actions = f.actions.clone();
            tokio::spawn(async move { actions.force_close_position("p-1").await })
        };
        wait_for_prompt(&f.gate).await;
        f.gate.confirm();

        let result = task.await.unwrap();
        assert!(result.is_err());
        report(&notifications, ActionType::ForceClosePosition.success_message(), &result);

        let shown = notifications.list();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].kind, NotificationKind::Error);
        assert_eq!(shown[0].message, "Position locked");
    }

    #[tokio::test]
    async fn test_ungated_actions_post_immediately() {
        let f = fixture();
        let toggle = endpoints::toggle_priority_rule("r1");
        f.api.respond(&toggle, json!({}));
        f.api.respond(endpoints::PRIORITY_RULES_ORDER, json!({}));
        f.api.respond(endpoints::ENGINE_FORCE_START, json!({ "running": true }));

        f.actions.toggle_priority_rule("r1", false).await.unwrap();
        let ids = vec!["r2".to_string(), "r1".to_string()];
        f.actions.reorder_priority_rules(&ids).await.unwrap();
        let started = f.actions.force_start_engine().await.unwrap();

        assert!(started.is_completed());
        assert!(!f.gate.is_open());
        assert_eq!(
            f.api.posts(),
            vec![
                (toggle, json!({ "enabled": false })),
                (endpoints::PRIORITY_RULES_ORDER.to_string(), json!({ "rule_ids": ["r2", "r1"] })),
                (endpoints::ENGINE_FORCE_START.to_string(), json!({})),
            ]
        );
    }

    #[tokio::test]
    async fn test_report_success() {
        let notifications = NotificationQueue::default();
        let id = report(
            &notifications,
            "Engine started",
            &Ok(ActionOutcome::Completed(Value::Null)),
        );
        assert!(id.is_some());
        assert_eq!(notifications.list()[0].kind, NotificationKind::Success);
    }

    #[tokio::test]
    async fn test_force_stop_prompts_before_posting() {
        let f = fixture();
        f.api.respond(endpoints::ENGINE_FORCE_STOP, json!({}));

        let task = {
            let actions = f.actions.clone();
            tokio::spawn(async move { actions.force_stop_engine().await })
        };
        wait_for_prompt(&f.gate).await;
        assert!(ActionType::ForceStopEngine.requires_confirmation());
        assert_eq!(f.gate.current().map(|p| p.confirm_text).as_deref(), Some("Stop Engine"));
        assert!(f.api.posts().is_empty());

        f.gate.dismiss();
        assert_eq!(task.await.unwrap(), Ok(ActionOutcome::Cancelled));
        assert!(f.api.posts().is_empty());
    }

    #[test]
    fn test_gating_table() {
        assert!(ActionType::ForceStopEngine.requires_confirmation());
        assert!(!ActionType::ForceStartEngine.requires_confirmation());
        assert!(!ActionType::ReorderPriorityRules.requires_confirmation());
        assert_eq!(ActionType::ForceClosePosition.affected_store(), AffectedStore::Engine);
    }
}
