//! Operator action type definitions

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Commands an operator can issue against the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    PromoteSignal,
    RemoveSignal,
    ForceClosePosition,
    ForceStartEngine,
    ForceStopEngine,
    RunEvaluation,
    TogglePriorityRule,
    ReorderPriorityRules,
}

/// Store whose snapshot an action changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AffectedStore {
    Engine,
    Queue,
}

impl ActionType {
    /// Irreversible actions wait for operator confirmation
    pub fn requires_confirmation(&self) -> bool {
        matches!(
            self,
            ActionType::PromoteSignal
                | ActionType::RemoveSignal
                | ActionType::ForceClosePosition
                | ActionType::ForceStopEngine
        )
    }

    pub fn affected_store(&self) -> AffectedStore {
        match self {
            ActionType::ForceClosePosition
            | ActionType::ForceStartEngine
            | ActionType::ForceStopEngine => AffectedStore::Engine,
            ActionType::PromoteSignal
            | ActionType::RemoveSignal
            | ActionType::RunEvaluation
            | ActionType::TogglePriorityRule
            | ActionType::ReorderPriorityRules => AffectedStore::Queue,
        }
    }

    /// Text of the success notification
    pub fn success_message(&self) -> &'static str {
        match self {
            ActionType::PromoteSignal => "Signal promoted",
            ActionType::RemoveSignal => "Signal removed",
            ActionType::ForceClosePosition => "Position closed",
            ActionType::ForceStartEngine => "Engine started",
            ActionType::ForceStopEngine => "Engine stopped",
            ActionType::RunEvaluation => "Evaluation started",
            ActionType::TogglePriorityRule => "Priority rule updated",
            ActionType::ReorderPriorityRules => "Priority rules reordered",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ActionType::PromoteSignal => "promote_signal",
            ActionType::RemoveSignal => "remove_signal",
            ActionType::ForceClosePosition => "force_close_position",
            ActionType::ForceStartEngine => "force_start_engine",
            ActionType::ForceStopEngine => "force_stop_engine",
            ActionType::RunEvaluation => "run_evaluation",
            ActionType::TogglePriorityRule => "toggle_priority_rule",
            ActionType::ReorderPriorityRules => "reorder_priority_rules",
        };
        write!(f, "{}", name)
    }
}

/// Result of an action that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// The engine accepted the command; carries its acknowledgement
    Completed(Value),
    /// The operator declined the confirmation
    Cancelled,
}

impl ActionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ActionOutcome::Completed(_))
    }
}
