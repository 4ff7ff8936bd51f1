//! Shared fixtures: a store seeded from the demo data, the API wired with the
//! default configuration, and one actor per seeded user.

#![allow(dead_code)]

use chrono::NaiveDate;
use std::sync::Arc;

use moveitright::api::CreateMovementRequest;
use moveitright::store::UserProfile;
use moveitright::{Actor, MemoryStore, MoveItRightConfig, MovementApi, MovementRecord, SeedData, WorkflowState};

pub const CUSTODIAN: &str = "custodian@example.com";
pub const OTHER_CUSTODIAN: &str = "custodian2@example.com";
pub const TRANSPORT: &str = "transport@example.com";
pub const HOD: &str = "hod@example.com";
pub const MANAGER: &str = "manager@example.com";
pub const ADMIN: &str = "admin@example.com";

pub const SEED_JSON: &str = include_str!("../../demos/seed.json");

pub fn seed() -> SeedData {
    serde_json::from_str(SEED_JSON).expect("demo seed parses")
}

pub fn seed_path() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/seed.json")
}

pub fn seeded_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::from_seed(seed()))
}

pub fn api_for(store: Arc<MemoryStore>) -> MovementApi {
    api_with_config(store, &MoveItRightConfig::default())
}

pub fn api_with_config(store: Arc<MemoryStore>, config: &MoveItRightConfig) -> MovementApi {
    MovementApi::from_config(config, store).expect("default table is valid")
}

pub fn profile(user: &str) -> UserProfile {
    seed()
        .users
        .into_iter()
        .find(|u| u.user == user)
        .unwrap_or_else(|| panic!("no seeded user {user}"))
}

pub fn actor(user: &str) -> Actor {
    let profile = profile(user);
    Actor::new(profile.user, profile.roles)
}

pub fn request(asset: &str) -> CreateMovementRequest {
    CreateMovementRequest {
        asset: asset.to_string(),
        from_location: "Head Office".to_string(),
        to_location: "Warehouse".to_string(),
        expected_date: NaiveDate::from_ymd_opt(2026, 11, 20).unwrap(),
        remarks: "Quarterly rebalancing".to_string(),
    }
}

pub async fn create_as(api: &MovementApi, user: &str, asset: &str) -> MovementRecord {
    api.create_asset_movement(&actor(user), request(asset))
        .await
        .into_result()
        .expect("request is created")
}

/// Main path from Draft to Closed: (state reached, action, acting user)
pub const HAPPY_PATH: [(WorkflowState, &str, &str); 7] = [
    (WorkflowState::AwaitingTransportAllocation, "Submit", CUSTODIAN),
    (WorkflowState::HodApprovalPending, "Assign Transport", TRANSPORT),
    (WorkflowState::HodApproved, "Approve", HOD),
    (WorkflowState::RequestApproved, "Approve", MANAGER),
    (WorkflowState::Collected, "Collect", TRANSPORT),
    (WorkflowState::Delivered, "Deliver", TRANSPORT),
    (WorkflowState::Closed, "Close", CUSTODIAN),
];

/// Drive a record along the main path until it reaches `target`
pub async fn advance_to(api: &MovementApi, record: &str, target: WorkflowState) -> MovementRecord {
    let mut current = api
        .router()
        .apply_action(record, "Submit", &actor(CUSTODIAN), Some(WorkflowState::Draft))
        .await
        .expect("submit");
    for (reached, action, user) in HAPPY_PATH.iter().skip(1) {
        if current.current_state() == target {
            break;
        }
        current = api
            .router()
            .apply_action(record, action, &actor(user), None)
            .await
            .unwrap_or_else(|e| panic!("{action} by {user} failed: {e}"));
        assert_eq!(current.current_state(), *reached);
    }
    assert_eq!(current.current_state(), target);
    current
}
