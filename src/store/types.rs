// Record types held by the document store

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::access::Role;
use crate::workflows::{DocStatus, WorkflowState};

/// An asset transfer request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementRecord {
    pub name: String,
    pub asset: String,
    pub from_location: String,
    pub to_location: String,
    pub expected_date: NaiveDate,
    #[serde(default)]
    pub remarks: String,
    pub purpose: String,
    pub transaction_date: DateTime<Utc>,
    /// Unset is read as Draft
    #[serde(default)]
    pub workflow_state: Option<WorkflowState>,
    #[serde(default)]
    pub docstatus: DocStatus,
    pub owner: String,
    pub creation: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub modified_by: String,
}

impl MovementRecord {
    pub fn current_state(&self) -> WorkflowState {
        self.workflow_state.unwrap_or_default()
    }
}

/// Fields a caller supplies when creating a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMovement {
    pub asset: String,
    pub asset_name: Option<String>,
    pub from_location: String,
    pub to_location: String,
    pub expected_date: NaiveDate,
    pub remarks: String,
    pub owner: String,
}

pub const TRANSFER_PURPOSE: &str = "Transfer";

/// Child row of a movement record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementItem {
    pub parent: String,
    pub idx: u32,
    pub source_location: String,
    pub target_location: String,
    pub asset: String,
    pub asset_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    pub asset_name: String,
    pub asset_category: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub item_code: Option<String>,
    #[serde(default)]
    pub docstatus: DocStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub location_name: String,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetCategory {
    pub name: String,
    pub asset_category_name: String,
    #[serde(default)]
    pub disabled: bool,
}

/// A supplier that can be booked for transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transporter {
    pub name: String,
    pub supplier_name: String,
    pub mobile_no: Option<String>,
    pub email_id: Option<String>,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user: String,
    pub full_name: String,
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommentType {
    Workflow,
    Info,
}

impl CommentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentType::Workflow => "Workflow",
            CommentType::Info => "Info",
        }
    }
}

/// Audit note attached to a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub name: String,
    pub reference_name: String,
    pub comment_type: CommentType,
    pub content: String,
    pub owner: String,
    pub creation: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub reference_name: String,
    pub comment_type: CommentType,
    pub content: String,
    pub owner: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionReason {
    pub name: String,
    pub reference_document: String,
    pub rejected_by: String,
    /// Workflow state of the record when the reason was recorded
    pub data: WorkflowState,
    pub reason: String,
    pub datetime: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRejectionReason {
    pub reference_document: String,
    pub rejected_by: String,
    pub data: WorkflowState,
    pub reason: String,
}

/// Equality filters over movement records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovementFilter {
    pub owner: Option<String>,
    pub workflow_state: Option<WorkflowState>,
}

impl MovementFilter {
    pub fn matches(&self, record: &MovementRecord) -> bool {
        self.owner.as_ref().is_none_or(|owner| &record.owner == owner)
            && self
                .workflow_state
                .is_none_or(|state| record.current_state() == state)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MovementOrder {
    #[default]
    ModifiedDesc,
    CreationDesc,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovementQuery {
    pub filter: MovementFilter,
    pub order_by: MovementOrder,
    pub limit: Option<usize>,
}

/// Asset lookup. Only submitted assets are ever returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetQuery {
    pub location: Option<String>,
    pub category: Option<String>,
    /// Matched as `like %term%` against asset name, item code and id
    pub search: Option<String>,
    pub limit: Option<usize>,
}

/// One atomic workflow step: CAS on the state, optional submission, one audit note
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionCommit {
    pub name: String,
    pub expected_state: WorkflowState,
    pub next_state: WorkflowState,
    pub submit: bool,
    pub modified_by: String,
    pub note: NewComment,
}
