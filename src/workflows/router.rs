// Workflow Action Router
//
// Matches (state, action) against the transition table, checks the actor's
// role, then hands one atomic commit to the store. The store only applies it
// if the record is still in the state we validated against.

use std::sync::Arc;
use tracing::{info, warn};

use super::states::{Action, DocStatus, WorkflowState};
use super::transitions::{AvailableAction, TransitionRule, TransitionTable};
use crate::access::Actor;
use crate::error::ApiError;
use crate::observability::api_metrics;
use crate::store::{CommentType, DocumentStore, MovementRecord, NewComment, StoreError, TransitionCommit};

/// A validated transition, ready to commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    pub record: String,
    pub from: WorkflowState,
    pub rule: TransitionRule,
    /// The commit will also flip docstatus Draft -> Submitted
    pub submit: bool,
    pub actor: String,
}

impl TransitionPlan {
    fn audit_note(&self) -> String {
        format!(
            "Workflow state changed to {} by {}",
            self.rule.next_state, self.actor
        )
    }
}

pub struct WorkflowRouter {
    table: Arc<TransitionTable>,
    store: Arc<dyn DocumentStore>,
}

impl WorkflowRouter {
    pub fn new(table: Arc<TransitionTable>, store: Arc<dyn DocumentStore>) -> Self {
        Self { table, store }
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    /// Validate `action` against a record snapshot. Pure; touches nothing.
    pub fn plan(
        &self,
        record: &MovementRecord,
        action: &str,
        actor: &Actor,
        expected_state: Option<WorkflowState>,
    ) -> Result<TransitionPlan, ApiError> {
        let current = record.current_state();
        let invalid = || ApiError::InvalidTransition {
            action: action.to_string(),
            state: current,
        };

        if expected_state.is_some_and(|expected| expected != current) {
            return Err(invalid());
        }
        // Cancelled documents are frozen
        if record.docstatus == DocStatus::Cancelled {
            return Err(invalid());
        }

        let parsed: Action = action.parse().map_err(|_| invalid())?;
        let rule = self.table.lookup(current, parsed).ok_or_else(invalid)?;

        if !actor.has_role(&rule.allowed) {
            return Err(ApiError::Unauthorized {
                action: action.to_string(),
                required_role: rule.allowed.clone(),
            });
        }

        Ok(TransitionPlan {
            record: record.name.clone(),
            from: current,
            rule: rule.clone(),
            submit: rule.triggers_submission && record.docstatus == DocStatus::Draft,
            actor: actor.user().to_string(),
        })
    }

    /// Apply a plan. State change, audit note and submission land together or not at all.
    pub async fn commit(&self, plan: TransitionPlan) -> Result<MovementRecord, ApiError> {
        let commit = TransitionCommit {
            name: plan.record.clone(),
            expected_state: plan.from,
            next_state: plan.rule.next_state,
            submit: plan.submit,
            modified_by: plan.actor.clone(),
            note: NewComment {
                reference_name: plan.record.clone(),
                comment_type: CommentType::Workflow,
                content: plan.audit_note(),
                owner: plan.actor.clone(),
            },
        };

        match self.store.commit_transition(commit).await {
            Ok(record) => {
                api_metrics().record_transition();
                info!(
                    record = %plan.record,
                    action = %plan.rule.action,
                    from = %plan.from,
                    to = %plan.rule.next_state,
                    submitted = plan.submit,
                    actor = %plan.actor,
                    "Workflow transition applied"
                );
                Ok(record)
            }
            Err(StoreError::StateConflict { actual, .. }) => {
                api_metrics().record_conflict();
                warn!(
                    record = %plan.record,
                    action = %plan.rule.action,
                    expected = %plan.from,
                    actual = %actual,
                    "Record moved on before the transition could be committed"
                );
                Err(ApiError::InvalidTransition {
                    action: plan.rule.action.to_string(),
                    state: actual,
                })
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Load, validate and commit in one call
    pub async fn apply_action(
        &self,
        record_id: &str,
        action: &str,
        actor: &Actor,
        expected_state: Option<WorkflowState>,
    ) -> Result<MovementRecord, ApiError> {
        let record = self.load(record_id).await?;
        let plan = self.plan(&record, action, actor, expected_state).inspect_err(|err| {
            warn!(
                record = %record_id,
                action = %action,
                actor = %actor.user(),
                reason = %err,
                "Workflow action refused"
            );
        })?;
        self.commit(plan).await
    }

    /// Actions the actor may take from the record's current state. Advisory only.
    pub async fn available_actions(
        &self,
        record_id: &str,
        actor: &Actor,
    ) -> Result<Vec<AvailableAction>, ApiError> {
        let record = self.load(record_id).await?;
        Ok(self.table.available_for(record.current_state(), actor))
    }

    async fn load(&self, record_id: &str) -> Result<MovementRecord, ApiError> {
        self.store
            .get_movement(record_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Asset Movement", record_id))
    }
}
