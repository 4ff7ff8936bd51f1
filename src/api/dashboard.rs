// Per-role dashboard aggregation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::access::{Actor, Role, VisibilityScope};
use crate::error::ApiError;
use crate::store::{DocumentStore, MovementFilter, MovementOrder, MovementQuery, MovementRecord};
use crate::workflows::WorkflowState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentMovement {
    pub name: String,
    pub asset: String,
    pub from_location: String,
    pub to_location: String,
    pub workflow_state: WorkflowState,
    pub creation: DateTime<Utc>,
}

impl From<MovementRecord> for RecentMovement {
    fn from(record: MovementRecord) -> Self {
        Self {
            workflow_state: record.current_state(),
            name: record.name,
            asset: record.asset,
            from_location: record.from_location,
            to_location: record.to_location,
            creation: record.creation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardData {
    pub total_requests: usize,
    /// Count for every workflow state, zeros included
    pub states_breakdown: BTreeMap<WorkflowState, usize>,
    pub recent_movements: Vec<RecentMovement>,
    pub user_roles: Vec<Role>,

    // Transport Administrator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_transport_allocation: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_transit: Option<usize>,

    // HOD (Finance)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_hod_approval: Option<usize>,

    // Asset Manager
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_manager_approval: Option<usize>,

    // Asset Custodian
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub my_requests: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_collection: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_closure: Option<usize>,
}

pub(super) async fn build_dashboard(
    store: &dyn DocumentStore,
    actor: &Actor,
    scope: &VisibilityScope,
    recent_limit: usize,
) -> Result<DashboardData, ApiError> {
    let owner = scope.owner_filter(actor);

    let mut states_breakdown = BTreeMap::new();
    for state in WorkflowState::ALL {
        let filter = MovementFilter {
            owner: owner.clone(),
            workflow_state: Some(state),
        };
        states_breakdown.insert(state, store.count_movements(&filter).await?);
    }
    let count = |state: WorkflowState| states_breakdown.get(&state).copied().unwrap_or(0);

    let recent_movements = store
        .list_movements(&MovementQuery {
            filter: MovementFilter {
                owner: owner.clone(),
                workflow_state: None,
            },
            order_by: MovementOrder::CreationDesc,
            limit: Some(recent_limit),
        })
        .await?
        .into_iter()
        .map(RecentMovement::from)
        .collect();

    let mut data = DashboardData {
        total_requests: states_breakdown.values().sum(),
        states_breakdown: BTreeMap::new(),
        recent_movements,
        user_roles: actor.roles().iter().cloned().collect(),
        pending_transport_allocation: None,
        in_transit: None,
        pending_hod_approval: None,
        pending_manager_approval: None,
        my_requests: None,
        pending_collection: None,
        pending_closure: None,
    };

    if actor.has_role(&Role::TransportAdministrator) {
        data.pending_transport_allocation = Some(count(WorkflowState::AwaitingTransportAllocation));
        data.in_transit = Some(count(WorkflowState::Collected));
    }
    if actor.has_role(&Role::HodFinance) {
        data.pending_hod_approval = Some(count(WorkflowState::HodApprovalPending));
    }
    if actor.has_role(&Role::AssetManager) {
        data.pending_manager_approval = Some(count(WorkflowState::HodApproved));
    }
    if actor.has_role(&Role::AssetCustodian) {
        let mine = MovementFilter {
            owner: Some(actor.user().to_string()),
            workflow_state: None,
        };
        data.my_requests = Some(store.count_movements(&mine).await?);
        data.pending_collection = Some(count(WorkflowState::RequestApproved));
        data.pending_closure = Some(count(WorkflowState::Delivered));
    }

    data.states_breakdown = states_breakdown;
    Ok(data)
}
