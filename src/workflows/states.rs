// Workflow states, actions and the submission flag

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown {kind} '{value}'")]
pub struct ParseLabelError {
    kind: &'static str,
    value: String,
}

/// Stage of a movement record within its approval and fulfilment lifecycle
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum WorkflowState {
    #[default]
    #[serde(rename = "Draft")]
    Draft,
    #[serde(rename = "Awaiting Transport Allocation")]
    AwaitingTransportAllocation,
    #[serde(rename = "External Transport Required")]
    ExternalTransportRequired,
    #[serde(rename = "HOD Approval Pending")]
    HodApprovalPending,
    #[serde(rename = "HOD Approved")]
    HodApproved,
    #[serde(rename = "Request Approved")]
    RequestApproved,
    #[serde(rename = "Collected")]
    Collected,
    #[serde(rename = "Delivered")]
    Delivered,
    #[serde(rename = "Closed")]
    Closed,
    #[serde(rename = "HOD Rejected")]
    HodRejected,
    #[serde(rename = "Asset Manager Rejected")]
    AssetManagerRejected,
}

impl WorkflowState {
    /// Every state, in lifecycle order
    pub const ALL: [WorkflowState; 11] = [
        WorkflowState::Draft,
        WorkflowState::AwaitingTransportAllocation,
        WorkflowState::ExternalTransportRequired,
        WorkflowState::HodApprovalPending,
        WorkflowState::HodApproved,
        WorkflowState::RequestApproved,
        WorkflowState::Collected,
        WorkflowState::Delivered,
        WorkflowState::Closed,
        WorkflowState::HodRejected,
        WorkflowState::AssetManagerRejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Draft => "Draft",
            WorkflowState::AwaitingTransportAllocation => "Awaiting Transport Allocation",
            WorkflowState::ExternalTransportRequired => "External Transport Required",
            WorkflowState::HodApprovalPending => "HOD Approval Pending",
            WorkflowState::HodApproved => "HOD Approved",
            WorkflowState::RequestApproved => "Request Approved",
            WorkflowState::Collected => "Collected",
            WorkflowState::Delivered => "Delivered",
            WorkflowState::Closed => "Closed",
            WorkflowState::HodRejected => "HOD Rejected",
            WorkflowState::AssetManagerRejected => "Asset Manager Rejected",
        }
    }

    /// No rule may leave a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowState::Closed | WorkflowState::HodRejected | WorkflowState::AssetManagerRejected
        )
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowState {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        WorkflowState::ALL
            .into_iter()
            .find(|state| state.as_str() == trimmed)
            .ok_or_else(|| ParseLabelError {
                kind: "workflow state",
                value: s.to_string(),
            })
    }
}

/// Labels a caller may request against a movement record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "Submit")]
    Submit,
    #[serde(rename = "Assign Transport")]
    AssignTransport,
    #[serde(rename = "Request External Transport")]
    RequestExternalTransport,
    #[serde(rename = "Provide Transport Details")]
    ProvideTransportDetails,
    #[serde(rename = "Approve")]
    Approve,
    #[serde(rename = "Reject")]
    Reject,
    #[serde(rename = "Collect")]
    Collect,
    #[serde(rename = "Deliver")]
    Deliver,
    #[serde(rename = "Close")]
    Close,
}

impl Action {
    pub const ALL: [Action; 9] = [
        Action::Submit,
        Action::AssignTransport,
        Action::RequestExternalTransport,
        Action::ProvideTransportDetails,
        Action::Approve,
        Action::Reject,
        Action::Collect,
        Action::Deliver,
        Action::Close,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Submit => "Submit",
            Action::AssignTransport => "Assign Transport",
            Action::RequestExternalTransport => "Request External Transport",
            Action::ProvideTransportDetails => "Provide Transport Details",
            Action::Approve => "Approve",
            Action::Reject => "Reject",
            Action::Collect => "Collect",
            Action::Deliver => "Deliver",
            Action::Close => "Close",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ParseLabelError;

    /// Exact label match; padded or differently cased labels are refused
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| ParseLabelError {
                kind: "action",
                value: s.to_string(),
            })
    }
}

/// Submission status (docstatus). A one-way lock-in, separate from the workflow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum DocStatus {
    #[default]
    Draft,
    Submitted,
    Cancelled,
}

impl DocStatus {
    /// Draft -> Submitted. Any other status is left as it is.
    pub fn submitted(self) -> DocStatus {
        match self {
            DocStatus::Draft => DocStatus::Submitted,
            other => other,
        }
    }
}

impl From<DocStatus> for u8 {
    fn from(status: DocStatus) -> Self {
        match status {
            DocStatus::Draft => 0,
            DocStatus::Submitted => 1,
            DocStatus::Cancelled => 2,
        }
    }
}

impl TryFrom<u8> for DocStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DocStatus::Draft),
            1 => Ok(DocStatus::Submitted),
            2 => Ok(DocStatus::Cancelled),
            other => Err(format!("invalid docstatus {other}")),
        }
    }
}
