// MoveItRight Library - asset transfer requests routed through an approval workflow
// This exposes the core components for testing and integration

pub mod access;
pub mod api;
pub mod cli;
pub mod config;
#[cfg(feature = "database")]
pub mod database;
pub mod error;
pub mod observability;
pub mod store;
pub mod telemetry;
pub mod workflows;

// Re-export key types for easy access
pub use access::{Actor, CapabilityChecker, IdentityProvider, Role, RolePolicy, VisibilityScope};
pub use api::{ApiResponse, DashboardData, MovementApi, MovementWithItems, Status};
pub use config::{config, MoveItRightConfig};
pub use error::ApiError;
pub use observability::{api_metrics, ApiMetrics, OperationTimer};
pub use store::{DocumentStore, MemoryStore, MovementRecord, SeedData, StoreError};
pub use telemetry::{create_operation_span, generate_correlation_id, init_telemetry};
pub use workflows::{Action, DocStatus, TransitionRule, TransitionTable, WorkflowRouter, WorkflowState};
