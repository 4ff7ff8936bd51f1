// Document store - the persistence collaborator behind every operation
//
// The workflow core never touches storage directly; it talks to this trait.
// `MemoryStore` is the default back-end, `SqliteStore` sits behind the
// `database` feature.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use thiserror::Error;

use crate::workflows::WorkflowState;

pub mod like;
pub mod memory;
pub mod seed;
#[cfg(feature = "database")]
pub mod sqlite;
pub mod types;

pub use like::LikePattern;
pub use memory::{MemoryStore, SnapshotLock, Tables};
pub use seed::SeedData;
#[cfg(feature = "database")]
pub use sqlite::SqliteStore;
pub use types::*;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {name} does not exist")]
    NotFound { kind: String, name: String },

    /// Compare-and-swap on the workflow state lost
    #[error("{name} is in state '{actual}', expected '{expected}'")]
    StateConflict {
        name: String,
        expected: WorkflowState,
        actual: WorkflowState,
    },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Lock acquisition failed: {0}")]
    Lock(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn movement_not_found(name: &str) -> Self {
        StoreError::NotFound {
            kind: "Asset Movement".to_string(),
            name: name.to_string(),
        }
    }
}

/// Document store interface
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a movement record (state Draft, docstatus Draft) and its single item
    async fn insert_movement(&self, movement: NewMovement) -> Result<MovementRecord, StoreError>;

    async fn get_movement(&self, name: &str) -> Result<Option<MovementRecord>, StoreError>;

    async fn list_movements(&self, query: &MovementQuery) -> Result<Vec<MovementRecord>, StoreError>;

    async fn count_movements(&self, filter: &MovementFilter) -> Result<usize, StoreError>;

    async fn movement_items(&self, parent: &str) -> Result<Vec<MovementItem>, StoreError>;

    /// Apply a workflow step atomically.
    ///
    /// Fails with `StateConflict` (and changes nothing) when the stored state
    /// is no longer `commit.expected_state`.
    async fn commit_transition(&self, commit: TransitionCommit) -> Result<MovementRecord, StoreError>;

    async fn update_remarks(
        &self,
        name: &str,
        remarks: &str,
        modified_by: &str,
    ) -> Result<MovementRecord, StoreError>;

    async fn add_comment(&self, comment: NewComment) -> Result<Comment, StoreError>;

    async fn comments(&self, reference_name: &str) -> Result<Vec<Comment>, StoreError>;

    async fn insert_rejection_reason(
        &self,
        reason: NewRejectionReason,
    ) -> Result<RejectionReason, StoreError>;

    async fn rejection_reasons(&self, reference_document: &str) -> Result<Vec<RejectionReason>, StoreError>;

    async fn get_asset(&self, name: &str) -> Result<Option<Asset>, StoreError>;

    /// Submitted assets matching the query, ordered by asset name
    async fn list_assets(&self, query: &AssetQuery) -> Result<Vec<Asset>, StoreError>;

    /// Enabled locations ordered by location name
    async fn list_locations(&self) -> Result<Vec<Location>, StoreError>;

    /// Enabled categories ordered by category name
    async fn list_asset_categories(&self) -> Result<Vec<AssetCategory>, StoreError>;

    /// Enabled transporters ordered by supplier name
    async fn list_transporters(&self) -> Result<Vec<Transporter>, StoreError>;

    async fn get_user(&self, user: &str) -> Result<Option<UserProfile>, StoreError>;
}

/// Movement naming series: `ACC-ASM-<year>-<seq:05>`
pub fn movement_name(at: DateTime<Utc>, seq: u64) -> String {
    format!("ACC-ASM-{}-{:05}", at.year(), seq)
}

pub fn naming_prefix(at: DateTime<Utc>) -> String {
    format!("ACC-ASM-{}", at.year())
}
