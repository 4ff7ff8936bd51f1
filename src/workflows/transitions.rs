// Transition table - the declarative part of the workflow, validated once at start-up

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use super::states::{Action, WorkflowState};
use crate::access::{Actor, Role};

/// A permitted `(state, action) -> next_state` move, gated by one role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRule {
    pub state: WorkflowState,
    pub action: Action,
    pub next_state: WorkflowState,
    /// Role required to take this transition
    pub allowed: Role,
    /// Reaching `next_state` through this rule submits a still-draft record
    #[serde(default)]
    pub triggers_submission: bool,
}

impl TransitionRule {
    pub fn new(state: WorkflowState, action: Action, next_state: WorkflowState, allowed: Role) -> Self {
        Self {
            state,
            action,
            next_state,
            allowed,
            triggers_submission: false,
        }
    }

    pub fn submitting(mut self) -> Self {
        self.triggers_submission = true;
        self
    }
}

/// What an actor may do from a given state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableAction {
    pub action: Action,
    pub next_state: WorkflowState,
    pub allowed_role: Role,
}

impl From<&TransitionRule> for AvailableAction {
    fn from(rule: &TransitionRule) -> Self {
        Self {
            action: rule.action,
            next_state: rule.next_state,
            allowed_role: rule.allowed.clone(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("Workflow '{workflow}' defines more than one rule for action '{action}' in state '{state}'")]
    DuplicateRule {
        workflow: String,
        state: WorkflowState,
        action: Action,
    },
    #[error("Workflow '{workflow}' defines action '{action}' from terminal state '{state}'")]
    TerminalSource {
        workflow: String,
        state: WorkflowState,
        action: Action,
    },
}

/// Deterministic transition table: at most one rule per `(state, action)`.
#[derive(Debug, Clone)]
pub struct TransitionTable {
    name: String,
    rules: BTreeMap<(WorkflowState, Action), TransitionRule>,
}

impl TransitionTable {
    pub fn new(name: impl Into<String>, rules: impl IntoIterator<Item = TransitionRule>) -> Result<Self, TableError> {
        let name = name.into();
        let mut table = BTreeMap::new();

        for rule in rules {
            if rule.state.is_terminal() {
                return Err(TableError::TerminalSource {
                    workflow: name,
                    state: rule.state,
                    action: rule.action,
                });
            }
            let key = (rule.state, rule.action);
            if table.contains_key(&key) {
                return Err(TableError::DuplicateRule {
                    workflow: name,
                    state: rule.state,
                    action: rule.action,
                });
            }
            table.insert(key, rule);
        }

        Ok(Self { name, rules: table })
    }

    /// The asset movement workflow as shipped
    pub fn asset_movement() -> Self {
        Self {
            name: DEFAULT_WORKFLOW_NAME.to_string(),
            rules: default_rules()
                .into_iter()
                .map(|rule| ((rule.state, rule.action), rule))
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn lookup(&self, state: WorkflowState, action: Action) -> Option<&TransitionRule> {
        self.rules.get(&(state, action))
    }

    /// All rules leaving `state`, in action order
    pub fn rules_from(&self, state: WorkflowState) -> impl Iterator<Item = &TransitionRule> {
        self.rules.values().filter(move |rule| rule.state == state)
    }

    pub fn rules(&self) -> impl Iterator<Item = &TransitionRule> {
        self.rules.values()
    }

    /// Rules leaving `state` whose role the actor holds
    pub fn available_for(&self, state: WorkflowState, actor: &Actor) -> Vec<AvailableAction> {
        self.rules_from(state)
            .filter(|rule| actor.has_role(&rule.allowed))
            .map(AvailableAction::from)
            .collect()
    }
}

pub const DEFAULT_WORKFLOW_NAME: &str = "Asset Movement Workflow";

/// Transition rules of the asset movement workflow
pub fn default_rules() -> Vec<TransitionRule> {
    use Action::*;
    use WorkflowState::*;

    vec![
        TransitionRule::new(Draft, Submit, AwaitingTransportAllocation, Role::AssetCustodian),
        TransitionRule::new(
            AwaitingTransportAllocation,
            AssignTransport,
            HodApprovalPending,
            Role::TransportAdministrator,
        )
        .submitting(),
        TransitionRule::new(
            AwaitingTransportAllocation,
            RequestExternalTransport,
            ExternalTransportRequired,
            Role::TransportAdministrator,
        ),
        TransitionRule::new(
            ExternalTransportRequired,
            ProvideTransportDetails,
            HodApprovalPending,
            Role::AssetCustodian,
        )
        .submitting(),
        TransitionRule::new(HodApprovalPending, Approve, HodApproved, Role::HodFinance),
        TransitionRule::new(HodApprovalPending, Reject, HodRejected, Role::HodFinance),
        TransitionRule::new(HodApproved, Approve, RequestApproved, Role::AssetManager).submitting(),
        TransitionRule::new(HodApproved, Reject, AssetManagerRejected, Role::AssetManager),
        TransitionRule::new(RequestApproved, Collect, Collected, Role::TransportAdministrator),
        TransitionRule::new(Collected, Deliver, Delivered, Role::TransportAdministrator),
        TransitionRule::new(Delivered, Close, Closed, Role::AssetCustodian),
    ]
}
