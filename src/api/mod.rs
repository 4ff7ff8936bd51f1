// Asset Movement API - the exposed operations
//
// Every operation takes an explicit actor, runs inside its own span and
// always answers with an `ApiResponse` envelope. Failures never escape as
// faults; internal ones are logged at error level.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn, Instrument};

pub mod dashboard;
pub mod envelope;

pub use dashboard::{DashboardData, RecentMovement};
pub use envelope::{ApiResponse, Status};

use crate::access::{
    Actor, CapabilityChecker, IdentityProvider, Operation, ResourceType, Role, StoreIdentityProvider,
    VisibilityScope,
};
use crate::config::{ApiConfig, MoveItRightConfig};
use crate::error::ApiError;
use crate::observability::{api_metrics, OperationTimer};
use crate::store::{
    Asset, AssetCategory, AssetQuery, CommentType, DocumentStore, Location, MovementFilter,
    MovementItem, MovementQuery, MovementRecord, NewComment, NewMovement, NewRejectionReason,
    RejectionReason, Transporter,
};
use crate::telemetry::{create_operation_span, generate_correlation_id};
use crate::workflows::{AvailableAction, TableError, TransitionTable, WorkflowRouter, WorkflowState};

const ITEM_READ_DENIED: &str = "Insufficient permissions for Asset Movement Item";

/// A movement record as listed: header, items, asset details and next steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementWithItems {
    #[serde(flatten)]
    pub record: MovementRecord,
    pub items: Vec<MovementItem>,
    /// Set when the items could not be shown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub asset_name: Option<String>,
    pub asset_category: Option<String>,
    pub item_code: Option<String>,
    pub available_actions: Vec<AvailableAction>,
}

/// Arguments of `create_asset_movement`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateMovementRequest {
    pub asset: String,
    pub from_location: String,
    pub to_location: String,
    pub expected_date: NaiveDate,
    #[serde(default)]
    pub remarks: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportDetails {
    #[serde(default)]
    pub vehicle_type: String,
    #[serde(default)]
    pub transporter: Option<String>,
    #[serde(default)]
    pub driver: Option<String>,
}

impl TransportDetails {
    /// `Transport Details: <vehicle>[, Transporter: <t>][, Driver: <d>]`
    pub fn summary(&self) -> String {
        let mut line = format!("Transport Details: {}", self.vehicle_type);
        if let Some(transporter) = self.transporter.as_deref().filter(|t| !t.is_empty()) {
            line.push_str(&format!(", Transporter: {transporter}"));
        }
        if let Some(driver) = self.driver.as_deref().filter(|d| !d.is_empty()) {
            line.push_str(&format!(", Driver: {driver}"));
        }
        line
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub user: String,
    pub full_name: String,
    pub email: Option<String>,
    pub roles: Vec<Role>,
    pub is_administrator: bool,
}

pub struct MovementApi {
    store: Arc<dyn DocumentStore>,
    router: WorkflowRouter,
    checker: Arc<dyn CapabilityChecker>,
    identity: Arc<dyn IdentityProvider>,
    scope: VisibilityScope,
    settings: ApiConfig,
}

impl MovementApi {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        table: Arc<TransitionTable>,
        checker: Arc<dyn CapabilityChecker>,
        scope: VisibilityScope,
        settings: ApiConfig,
    ) -> Self {
        Self {
            router: WorkflowRouter::new(table, store.clone()),
            identity: Arc::new(StoreIdentityProvider::new(store.clone())),
            store,
            checker,
            scope,
            settings,
        }
    }

    /// Wire the API from configuration; fails if the transition table is invalid
    pub fn from_config(config: &MoveItRightConfig, store: Arc<dyn DocumentStore>) -> Result<Self, TableError> {
        let table = config.transition_table()?;
        info!(
            workflow = %table.name(),
            rules = table.len(),
            "Transition table validated"
        );
        Ok(Self::new(
            store,
            Arc::new(table),
            Arc::new(config.role_policy()),
            config.visibility_scope(),
            config.api.clone(),
        ))
    }

    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = identity;
        self
    }

    pub fn router(&self) -> &WorkflowRouter {
        &self.router
    }

    pub fn identity(&self) -> &dyn IdentityProvider {
        self.identity.as_ref()
    }

    async fn run<T, F>(&self, operation: &'static str, actor: &Actor, body: F) -> ApiResponse<T>
    where
        F: Future<Output = Result<ApiResponse<T>, ApiError>>,
    {
        let span = create_operation_span(operation, actor.user(), &generate_correlation_id());
        async {
            let timer = OperationTimer::new(operation);
            api_metrics().record_call();

            let response = match body.await {
                Ok(response) => response,
                Err(err) => {
                    api_metrics().record_error();
                    match &err {
                        ApiError::InternalFailure(_) => {
                            error!(operation, kind = err.kind(), error = %err, "Operation failed")
                        }
                        _ => warn!(operation, kind = err.kind(), error = %err, "Operation refused"),
                    }
                    ApiResponse::failure(err)
                }
            };
            timer.finish();
            response
        }
        .instrument(span)
        .await
    }

    /// List the movements visible to `actor`, newest modification first
    pub async fn get_asset_movements_with_items(&self, actor: &Actor) -> ApiResponse<Vec<MovementWithItems>> {
        self.run("get_asset_movements_with_items", actor, async {
            self.checker.ensure(actor, ResourceType::AssetMovement, Operation::Read)?;

            let records = self
                .store
                .list_movements(&MovementQuery {
                    filter: MovementFilter {
                        owner: self.scope.owner_filter(actor),
                        workflow_state: None,
                    },
                    limit: Some(self.settings.list_page_length),
                    ..MovementQuery::default()
                })
                .await?;

            let items_visible = self
                .checker
                .is_permitted(actor, ResourceType::AssetMovementItem, Operation::Read);

            let mut movements = Vec::with_capacity(records.len());
            for record in records {
                movements.push(self.enrich(record, actor, items_visible).await?);
            }
            Ok(ApiResponse::success(movements))
        })
        .await
    }

    async fn enrich(
        &self,
        record: MovementRecord,
        actor: &Actor,
        items_visible: bool,
    ) -> Result<MovementWithItems, ApiError> {
        let (items, error) = if items_visible {
            (self.store.movement_items(&record.name).await?, None)
        } else {
            (Vec::new(), Some(ITEM_READ_DENIED.to_string()))
        };
        let asset = self.store.get_asset(&record.asset).await?;
        let available_actions = self
            .router
            .table()
            .available_for(record.current_state(), actor);

        Ok(MovementWithItems {
            record,
            items,
            error,
            asset_name: asset.as_ref().map(|a| a.asset_name.clone()),
            asset_category: asset.as_ref().and_then(|a| a.asset_category.clone()),
            item_code: asset.and_then(|a| a.item_code),
            available_actions,
        })
    }

    /// Actions `actor` may take; uses `state` when given instead of reading the record
    pub async fn get_workflow_actions_for_user(
        &self,
        actor: &Actor,
        record_id: &str,
        state: Option<WorkflowState>,
    ) -> ApiResponse<Vec<AvailableAction>> {
        self.run("get_workflow_actions_for_user", actor, async {
            let actions = match state {
                Some(state) => self.router.table().available_for(state, actor),
                None => self.router.available_actions(record_id, actor).await?,
            };
            Ok(ApiResponse::success(actions))
        })
        .await
    }

    pub async fn create_asset_movement(
        &self,
        actor: &Actor,
        request: CreateMovementRequest,
    ) -> ApiResponse<MovementRecord> {
        self.run("create_asset_movement", actor, async {
            self.checker.ensure(actor, ResourceType::AssetMovement, Operation::Create)?;

            for (field, value) in [
                ("asset", &request.asset),
                ("from_location", &request.from_location),
                ("to_location", &request.to_location),
            ] {
                if value.trim().is_empty() {
                    return Err(ApiError::Validation(format!("{field} is required")));
                }
            }

            let asset = self
                .store
                .get_asset(&request.asset)
                .await?
                .ok_or_else(|| ApiError::not_found("Asset", &request.asset))?;

            let record = self
                .store
                .insert_movement(NewMovement {
                    asset: request.asset,
                    asset_name: Some(asset.asset_name),
                    from_location: request.from_location,
                    to_location: request.to_location,
                    expected_date: request.expected_date,
                    remarks: request.remarks,
                    owner: actor.user().to_string(),
                })
                .await?;

            info!(record = %record.name, asset = %record.asset, owner = %record.owner, "Asset movement created");
            let message = format!("Asset Movement {} created successfully", record.name);
            Ok(ApiResponse::success(record).with_message(message))
        })
        .await
    }

    pub async fn apply_workflow_action(
        &self,
        actor: &Actor,
        record_id: &str,
        action: &str,
        expected_state: Option<WorkflowState>,
    ) -> ApiResponse<MovementRecord> {
        self.run("apply_workflow_action", actor, async {
            let record = self
                .router
                .apply_action(record_id, action, actor, expected_state)
                .await?;
            let message = format!(
                "Action '{}' applied successfully. New state: {}",
                action,
                record.current_state()
            );
            Ok(ApiResponse::success(record).with_message(message))
        })
        .await
    }

    pub async fn get_user_dashboard_data(&self, actor: &Actor) -> ApiResponse<DashboardData> {
        self.run("get_user_dashboard_data", actor, async {
            let data = dashboard::build_dashboard(
                self.store.as_ref(),
                actor,
                &self.scope,
                self.settings.dashboard_recent_limit,
            )
            .await?;
            Ok(ApiResponse::success(data))
        })
        .await
    }

    pub async fn get_locations(&self, actor: &Actor) -> ApiResponse<Vec<Location>> {
        self.run("get_locations", actor, async {
            Ok(ApiResponse::success(self.store.list_locations().await?))
        })
        .await
    }

    pub async fn get_assets_by_location(
        &self,
        actor: &Actor,
        location: &str,
        category: Option<&str>,
    ) -> ApiResponse<Vec<Asset>> {
        self.run("get_assets_by_location", actor, async {
            if location.trim().is_empty() {
                return Err(ApiError::Validation("location is required".to_string()));
            }
            let assets = self
                .store
                .list_assets(&AssetQuery {
                    location: Some(location.to_string()),
                    category: category.filter(|c| !c.is_empty()).map(str::to_string),
                    search: None,
                    limit: None,
                })
                .await?;
            Ok(ApiResponse::success(assets))
        })
        .await
    }

    pub async fn get_asset_categories(&self, actor: &Actor) -> ApiResponse<Vec<AssetCategory>> {
        self.run("get_asset_categories", actor, async {
            Ok(ApiResponse::success(self.store.list_asset_categories().await?))
        })
        .await
    }

    pub async fn search_assets(
        &self,
        actor: &Actor,
        term: &str,
        location: Option<&str>,
        category: Option<&str>,
    ) -> ApiResponse<Vec<Asset>> {
        self.run("search_assets", actor, async {
            let assets = self
                .store
                .list_assets(&AssetQuery {
                    location: location.filter(|l| !l.is_empty()).map(str::to_string),
                    category: category.filter(|c| !c.is_empty()).map(str::to_string),
                    search: Some(term.to_string()),
                    limit: Some(self.settings.search_limit),
                })
                .await?;
            Ok(ApiResponse::success(assets))
        })
        .await
    }

    pub async fn save_rejection_reason(
        &self,
        actor: &Actor,
        record_id: &str,
        reason: &str,
    ) -> ApiResponse<RejectionReason> {
        self.run("save_rejection_reason", actor, async {
            self.checker.ensure(actor, ResourceType::RejectionReason, Operation::Create)?;

            let reason = reason.trim();
            if reason.is_empty() {
                return Err(ApiError::Validation("Rejection reason cannot be empty".to_string()));
            }

            let record = self
                .store
                .get_movement(record_id)
                .await?
                .ok_or_else(|| ApiError::not_found("Asset Movement", record_id))?;

            let saved = self
                .store
                .insert_rejection_reason(NewRejectionReason {
                    reference_document: record.name,
                    rejected_by: actor.user().to_string(),
                    data: record.workflow_state.unwrap_or_default(),
                    reason: reason.to_string(),
                })
                .await?;

            // Info note on the record alongside the stored reason
            self.store
                .add_comment(NewComment {
                    reference_name: saved.reference_document.clone(),
                    comment_type: CommentType::Info,
                    content: format!("Rejection Reason: {}", saved.reason),
                    owner: actor.user().to_string(),
                })
                .await?;

            info!(record = %saved.reference_document, state = %saved.data, "Rejection reason saved");
            Ok(ApiResponse::success(saved).with_message("Rejection reason saved"))
        })
        .await
    }

    pub async fn get_current_user_info(&self, actor: &Actor) -> ApiResponse<UserInfo> {
        self.run("get_current_user_info", actor, async {
            let profile = self.identity.profile(actor.user()).await?;
            Ok(ApiResponse::success(UserInfo {
                user: actor.user().to_string(),
                full_name: profile.full_name,
                email: profile.email,
                roles: actor.roles().iter().cloned().collect(),
                is_administrator: actor.is_administrator(),
            }))
        })
        .await
    }

    pub async fn get_transporters(&self, actor: &Actor) -> ApiResponse<Vec<Transporter>> {
        self.run("get_transporters", actor, async {
            Ok(ApiResponse::success(self.store.list_transporters().await?))
        })
        .await
    }

    /// Append a transport summary line to the record's remarks
    pub async fn assign_transport_details(
        &self,
        actor: &Actor,
        record_id: &str,
        details: TransportDetails,
    ) -> ApiResponse<MovementRecord> {
        self.run("assign_transport_details", actor, async {
            self.checker.ensure(actor, ResourceType::AssetMovement, Operation::Write)?;

            let record = self
                .store
                .get_movement(record_id)
                .await?
                .ok_or_else(|| ApiError::not_found("Asset Movement", record_id))?;

            if let Some(name) = details.transporter.as_deref().filter(|t| !t.is_empty()) {
                let known = self
                    .store
                    .list_transporters()
                    .await?
                    .iter()
                    .any(|t| t.name == name);
                if !known {
                    return Err(ApiError::not_found("Transporter", name));
                }
            }

            let remarks = format!("{}\n{}", record.remarks, details.summary())
                .trim()
                .to_string();
            let updated = self
                .store
                .update_remarks(&record.name, &remarks, actor.user())
                .await?;

            info!(record = %updated.name, "Transport details assigned");
            Ok(ApiResponse::success(updated).with_message("Transport details assigned successfully"))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MockDocumentStore, StoreError, UserProfile};

    fn custodian() -> Actor {
        Actor::new("custodian@example.com", [Role::AssetCustodian])
    }

    fn api_with(store: MockDocumentStore) -> MovementApi {
        MovementApi::from_config(&MoveItRightConfig::default(), Arc::new(store)).unwrap()
    }

    #[test]
    fn test_transport_summary_skips_missing_parts() {
        let details = TransportDetails {
            vehicle_type: "Truck".to_string(),
            transporter: Some("SUP-001".to_string()),
            driver: None,
        };
        assert_eq!(details.summary(), "Transport Details: Truck, Transporter: SUP-001");

        let details = TransportDetails {
            vehicle_type: "Van".to_string(),
            transporter: Some(String::new()),
            driver: Some("Sam".to_string()),
        };
        assert_eq!(details.summary(), "Transport Details: Van, Driver: Sam");
    }

    #[tokio::test]
    async fn test_store_failure_becomes_internal_failure_envelope() {
        let mut store = MockDocumentStore::new();
        store
            .expect_list_locations()
            .returning(|| Err(StoreError::Corrupt("bad row".to_string())));

        let response = api_with(store).get_locations(&custodian()).await;
        assert_eq!(response.status, Status::Error);
        assert_eq!(response.message.as_deref(), Some("Internal failure: Corrupt record: bad row"));
        assert!(matches!(response.error, Some(ApiError::InternalFailure(_))));
    }

    #[tokio::test]
    async fn test_permission_checked_before_store_is_touched() {
        // No expectations: any store call would panic the mock
        let store = MockDocumentStore::new();
        let outsider = Actor::new("guest@example.com", [Role::from("Guest")]);

        let response = api_with(store).get_asset_movements_with_items(&outsider).await;
        assert_eq!(
            response.error,
            Some(ApiError::PermissionDenied {
                resource: ResourceType::AssetMovement,
                operation: Operation::Read,
            })
        );
    }

    #[tokio::test]
    async fn test_blank_rejection_reason_is_validation_error() {
        let store = MockDocumentStore::new();
        let hod = Actor::new("hod@example.com", [Role::HodFinance]);

        let response = api_with(store).save_rejection_reason(&hod, "ACC-ASM-2026-00001", "   ").await;
        assert!(matches!(response.error, Some(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn test_custodian_list_is_owner_scoped() {
        let mut store = MockDocumentStore::new();
        store
            .expect_list_movements()
            .withf(|query| {
                query.filter.owner.as_deref() == Some("custodian@example.com") && query.limit == Some(50)
            })
            .returning(|_| Ok(Vec::new()));

        let response = api_with(store).get_asset_movements_with_items(&custodian()).await;
        assert_eq!(response.into_result(), Ok(Vec::new()));
    }

    struct Directory(Vec<UserProfile>);

    #[async_trait::async_trait]
    impl IdentityProvider for Directory {
        async fn profile(&self, user: &str) -> Result<UserProfile, ApiError> {
            self.0
                .iter()
                .find(|p| p.user == user)
                .cloned()
                .ok_or_else(|| ApiError::not_found("User", user))
        }
    }

    #[tokio::test]
    async fn test_identity_provider_can_be_replaced() {
        let directory = Directory(vec![UserProfile {
            user: "sso:42".to_string(),
            full_name: "Jamie Ops".to_string(),
            email: None,
            roles: vec![Role::SystemManager],
        }]);
        // The store's user table is never consulted
        let api = api_with(MockDocumentStore::new()).with_identity(Arc::new(directory));

        let actor = api.identity().resolve_actor("sso:42").await.unwrap();
        let info = api.get_current_user_info(&actor).await.into_result().unwrap();
        assert_eq!(info.full_name, "Jamie Ops");
        assert!(info.is_administrator);

        let unknown = api.identity().resolve_actor("custodian@example.com").await;
        assert!(matches!(unknown, Err(ApiError::NotFound { .. })));
    }
}
