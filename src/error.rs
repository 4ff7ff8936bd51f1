use thiserror::Error;

use crate::access::{Operation, ResourceType, Role};
use crate::store::StoreError;
use crate::workflows::WorkflowState;

/// Failures an exposed operation can report.
///
/// Every variant is caught at the operation boundary and rendered into the
/// `{status: "error", message}` envelope; none escape to the caller as a fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Actor lacks the capability on the record type
    #[error("Insufficient permissions to {operation} {resource}")]
    PermissionDenied {
        resource: ResourceType,
        operation: Operation,
    },

    /// Referenced record does not exist
    #[error("{kind} {name} does not exist")]
    NotFound { kind: String, name: String },

    /// No transition rule for the current state and action
    #[error("Invalid action '{action}' for current state '{state}'")]
    InvalidTransition { action: String, state: WorkflowState },

    /// Rule exists but the actor lacks its role
    #[error("You don't have permission to perform action '{action}'. Required role: {required_role}")]
    Unauthorized { action: String, required_role: Role },

    /// Malformed arguments
    #[error("{0}")]
    Validation(String),

    /// Unexpected fault in a collaborator
    #[error("Internal failure: {0}")]
    InternalFailure(String),
}

impl ApiError {
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        ApiError::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Short machine-readable label, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::PermissionDenied { .. } => "permission_denied",
            ApiError::NotFound { .. } => "not_found",
            ApiError::InvalidTransition { .. } => "invalid_transition",
            ApiError::Unauthorized { .. } => "unauthorized",
            ApiError::Validation(_) => "validation",
            ApiError::InternalFailure(_) => "internal_failure",
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, name } => ApiError::NotFound { kind, name },
            // Only reachable when the router did not attach the action label
            StoreError::StateConflict { actual, .. } => ApiError::InvalidTransition {
                action: String::new(),
                state: actual,
            },
            other => ApiError::InternalFailure(other.to_string()),
        }
    }
}
