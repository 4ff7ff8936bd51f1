// In-process document store with optional JSON snapshot persistence

use async_trait::async_trait;
use chrono::Utc;
use fd_lock::{RwLock as FileLock, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::like::LikePattern;
use super::seed::SeedData;
use super::types::*;
use super::{movement_name, naming_prefix, DocumentStore, StoreError};
use crate::workflows::{DocStatus, WorkflowState};

/// Everything the memory store holds. Also the snapshot file format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tables {
    pub movements: BTreeMap<String, MovementRecord>,
    pub items: Vec<MovementItem>,
    pub comments: Vec<Comment>,
    pub rejection_reasons: Vec<RejectionReason>,
    pub assets: BTreeMap<String, Asset>,
    pub locations: BTreeMap<String, Location>,
    pub asset_categories: BTreeMap<String, AssetCategory>,
    pub transporters: BTreeMap<String, Transporter>,
    pub users: BTreeMap<String, UserProfile>,
    /// Last number issued per naming prefix
    pub naming_series: BTreeMap<String, u64>,
    pub comment_seq: u64,
    pub rejection_seq: u64,
}

impl Tables {
    fn from_seed(seed: SeedData) -> Self {
        Self {
            assets: seed.assets.into_iter().map(|a| (a.name.clone(), a)).collect(),
            locations: seed.locations.into_iter().map(|l| (l.name.clone(), l)).collect(),
            asset_categories: seed
                .asset_categories
                .into_iter()
                .map(|c| (c.name.clone(), c))
                .collect(),
            transporters: seed
                .transporters
                .into_iter()
                .map(|t| (t.name.clone(), t))
                .collect(),
            users: seed.users.into_iter().map(|u| (u.user.clone(), u)).collect(),
            ..Self::default()
        }
    }

    fn push_comment(&mut self, comment: NewComment) -> Comment {
        self.comment_seq += 1;
        let comment = Comment {
            name: format!("CMT-{:06}", self.comment_seq),
            reference_name: comment.reference_name,
            comment_type: comment.comment_type,
            content: comment.content,
            owner: comment.owner,
            creation: Utc::now(),
        };
        self.comments.push(comment.clone());
        comment
    }
}

/// Single-writer document store. One write guard covers every mutation, so a
/// transition's CAS, submission and audit note are applied together.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: SeedData) -> Self {
        Self::from_tables(Tables::from_seed(seed))
    }

    pub fn from_tables(tables: Tables) -> Self {
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Load a snapshot, or start from `seed` when the snapshot does not exist yet
    pub async fn open_snapshot(path: impl AsRef<Path>, seed: Option<SeedData>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if tokio::fs::try_exists(path).await? {
            let raw = tokio::fs::read_to_string(path).await?;
            let tables: Tables = serde_json::from_str(&raw)?;
            debug!(
                path = %path.display(),
                movements = tables.movements.len(),
                "Loaded store snapshot"
            );
            return Ok(Self::from_tables(tables));
        }

        info!(path = %path.display(), "No snapshot yet, starting from seed data");
        Ok(Self::from_seed(seed.unwrap_or_default()))
    }

    /// Write the snapshot via a temp file and rename
    pub async fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let json = {
            let tables = self.tables.read().await;
            serde_json::to_string_pretty(&*tables)?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let temp = path.with_extension("json.tmp");
        tokio::fs::write(&temp, json).await?;
        tokio::fs::rename(&temp, path).await?;
        debug!(path = %path.display(), "Saved store snapshot");
        Ok(())
    }

    /// Copy of the current tables
    pub async fn tables(&self) -> Tables {
        self.tables.read().await.clone()
    }
}

fn write_blocking(lock: &'static mut FileLock<File>) -> Result<RwLockWriteGuard<'static, File>, StoreError> {
    Ok(lock.write()?)
}

/// Exclusive cross-process lock on a snapshot file, held for one command.
pub struct SnapshotLock {
    path: PathBuf,
    _guard: RwLockWriteGuard<'static, File>,
}

impl SnapshotLock {
    /// Wait until no other process holds the snapshot, then take it
    pub async fn acquire(snapshot: impl AsRef<Path>) -> Result<Self, StoreError> {
        let (path, lock) = Self::open(snapshot.as_ref())?;
        let guard = tokio::task::spawn_blocking(move || write_blocking(lock))
            .await
            .map_err(|err| StoreError::Lock(format!("lock task failed: {err}")))??;
        Ok(Self {
            path,
            _guard: guard,
        })
    }

    /// Take the snapshot only if nobody holds it
    pub fn try_acquire(snapshot: impl AsRef<Path>) -> Result<Self, StoreError> {
        let (path, lock) = Self::open(snapshot.as_ref())?;
        let guard = lock.try_write().map_err(|_| {
            StoreError::Lock(format!(
                "another process is using the snapshot ({})",
                path.display()
            ))
        })?;
        Ok(Self {
            path,
            _guard: guard,
        })
    }

    fn open(snapshot: &Path) -> Result<(PathBuf, &'static mut FileLock<File>), StoreError> {
        let path = snapshot.with_extension("lock");
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)?;
        // Leaked so the guard is 'static; dropping the guard still unlocks
        Ok((path, Box::leak(Box::new(FileLock::new(file)))))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_movement(&self, movement: NewMovement) -> Result<MovementRecord, StoreError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        let seq = tables.naming_series.entry(naming_prefix(now)).or_insert(0);
        *seq += 1;
        let name = movement_name(now, *seq);

        let record = MovementRecord {
            name: name.clone(),
            asset: movement.asset.clone(),
            from_location: movement.from_location.clone(),
            to_location: movement.to_location.clone(),
            expected_date: movement.expected_date,
            remarks: movement.remarks,
            purpose: TRANSFER_PURPOSE.to_string(),
            transaction_date: now,
            workflow_state: Some(WorkflowState::Draft),
            docstatus: DocStatus::Draft,
            owner: movement.owner.clone(),
            creation: now,
            modified: now,
            modified_by: movement.owner,
        };
        tables.items.push(MovementItem {
            parent: name.clone(),
            idx: 1,
            source_location: movement.from_location,
            target_location: movement.to_location,
            asset: movement.asset,
            asset_name: movement.asset_name,
        });
        tables.movements.insert(name, record.clone());
        Ok(record)
    }

    async fn get_movement(&self, name: &str) -> Result<Option<MovementRecord>, StoreError> {
        Ok(self.tables.read().await.movements.get(name).cloned())
    }

    async fn list_movements(&self, query: &MovementQuery) -> Result<Vec<MovementRecord>, StoreError> {
        let tables = self.tables.read().await;
        let mut records: Vec<MovementRecord> = tables
            .movements
            .values()
            .filter(|record| query.filter.matches(record))
            .cloned()
            .collect();

        match query.order_by {
            MovementOrder::ModifiedDesc => {
                records.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.name.cmp(&a.name)))
            }
            MovementOrder::CreationDesc => {
                records.sort_by(|a, b| b.creation.cmp(&a.creation).then_with(|| b.name.cmp(&a.name)))
            }
        }
        if let Some(limit) = query.limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    async fn count_movements(&self, filter: &MovementFilter) -> Result<usize, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.movements.values().filter(|r| filter.matches(r)).count())
    }

    async fn movement_items(&self, parent: &str) -> Result<Vec<MovementItem>, StoreError> {
        let tables = self.tables.read().await;
        let mut items: Vec<MovementItem> = tables
            .items
            .iter()
            .filter(|item| item.parent == parent)
            .cloned()
            .collect();
        items.sort_by_key(|item| item.idx);
        Ok(items)
    }

    async fn commit_transition(&self, commit: TransitionCommit) -> Result<MovementRecord, StoreError> {
        let mut tables = self.tables.write().await;

        let record = tables
            .movements
            .get_mut(&commit.name)
            .ok_or_else(|| StoreError::movement_not_found(&commit.name))?;

        let actual = record.current_state();
        if actual != commit.expected_state {
            return Err(StoreError::StateConflict {
                name: commit.name,
                expected: commit.expected_state,
                actual,
            });
        }

        record.workflow_state = Some(commit.next_state);
        if commit.submit {
            record.docstatus = record.docstatus.submitted();
        }
        record.modified = Utc::now();
        record.modified_by = commit.modified_by;
        let updated = record.clone();

        tables.push_comment(commit.note);
        Ok(updated)
    }

    async fn update_remarks(
        &self,
        name: &str,
        remarks: &str,
        modified_by: &str,
    ) -> Result<MovementRecord, StoreError> {
        let mut tables = self.tables.write().await;
        let record = tables
            .movements
            .get_mut(name)
            .ok_or_else(|| StoreError::movement_not_found(name))?;

        record.remarks = remarks.to_string();
        record.modified = Utc::now();
        record.modified_by = modified_by.to_string();
        Ok(record.clone())
    }

    async fn add_comment(&self, comment: NewComment) -> Result<Comment, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.movements.contains_key(&comment.reference_name) {
            return Err(StoreError::movement_not_found(&comment.reference_name));
        }
        Ok(tables.push_comment(comment))
    }

    async fn comments(&self, reference_name: &str) -> Result<Vec<Comment>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .iter()
            .filter(|c| c.reference_name == reference_name)
            .cloned()
            .collect())
    }

    async fn insert_rejection_reason(
        &self,
        reason: NewRejectionReason,
    ) -> Result<RejectionReason, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.movements.contains_key(&reason.reference_document) {
            return Err(StoreError::movement_not_found(&reason.reference_document));
        }

        tables.rejection_seq += 1;
        let stored = RejectionReason {
            name: format!("RJR-{:05}", tables.rejection_seq),
            reference_document: reason.reference_document,
            rejected_by: reason.rejected_by,
            data: reason.data,
            reason: reason.reason,
            datetime: Utc::now(),
        };
        tables.rejection_reasons.push(stored.clone());
        Ok(stored)
    }

    async fn rejection_reasons(&self, reference_document: &str) -> Result<Vec<RejectionReason>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .rejection_reasons
            .iter()
            .filter(|r| r.reference_document == reference_document)
            .cloned()
            .collect())
    }

    async fn get_asset(&self, name: &str) -> Result<Option<Asset>, StoreError> {
        Ok(self.tables.read().await.assets.get(name).cloned())
    }

    async fn list_assets(&self, query: &AssetQuery) -> Result<Vec<Asset>, StoreError> {
        let pattern = query.search.as_deref().map(LikePattern::containing).transpose()?;
        let tables = self.tables.read().await;

        let mut assets: Vec<Asset> = tables
            .assets
            .values()
            .filter(|asset| asset.docstatus == DocStatus::Submitted)
            .filter(|asset| {
                query
                    .location
                    .as_ref()
                    .is_none_or(|loc| asset.location.as_ref() == Some(loc))
            })
            .filter(|asset| {
                query
                    .category
                    .as_ref()
                    .is_none_or(|cat| asset.asset_category.as_ref() == Some(cat))
            })
            .filter(|asset| {
                pattern.as_ref().is_none_or(|p| {
                    p.matches(&asset.asset_name)
                        || asset.item_code.as_deref().is_some_and(|code| p.matches(code))
                        || p.matches(&asset.name)
                })
            })
            .cloned()
            .collect();

        assets.sort_by(|a, b| a.asset_name.cmp(&b.asset_name));
        if let Some(limit) = query.limit {
            assets.truncate(limit);
        }
        Ok(assets)
    }

    async fn list_locations(&self) -> Result<Vec<Location>, StoreError> {
        let tables = self.tables.read().await;
        let mut locations: Vec<Location> = tables.locations.values().filter(|l| !l.disabled).cloned().collect();
        locations.sort_by(|a, b| a.location_name.cmp(&b.location_name));
        Ok(locations)
    }

    async fn list_asset_categories(&self) -> Result<Vec<AssetCategory>, StoreError> {
        let tables = self.tables.read().await;
        let mut categories: Vec<AssetCategory> = tables
            .asset_categories
            .values()
            .filter(|c| !c.disabled)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.asset_category_name.cmp(&b.asset_category_name));
        Ok(categories)
    }

    async fn list_transporters(&self) -> Result<Vec<Transporter>, StoreError> {
        let tables = self.tables.read().await;
        let mut transporters: Vec<Transporter> =
            tables.transporters.values().filter(|t| !t.disabled).cloned().collect();
        transporters.sort_by(|a, b| a.supplier_name.cmp(&b.supplier_name));
        Ok(transporters)
    }

    async fn get_user(&self, user: &str) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.tables.read().await.users.get(user).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn new_movement(owner: &str) -> NewMovement {
        NewMovement {
            asset: "AST-0001".to_string(),
            asset_name: Some("Laptop".to_string()),
            from_location: "HQ".to_string(),
            to_location: "Depot".to_string(),
            expected_date: NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
            remarks: "urgent".to_string(),
            owner: owner.to_string(),
        }
    }

    fn commit(name: &str, from: WorkflowState, to: WorkflowState, submit: bool) -> TransitionCommit {
        TransitionCommit {
            name: name.to_string(),
            expected_state: from,
            next_state: to,
            submit,
            modified_by: "tester".to_string(),
            note: NewComment {
                reference_name: name.to_string(),
                comment_type: CommentType::Workflow,
                content: format!("Workflow state changed to {to} by tester"),
                owner: "tester".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_series_and_item() {
        let store = MemoryStore::new();
        let first = store.insert_movement(new_movement("a")).await.unwrap();
        let second = store.insert_movement(new_movement("a")).await.unwrap();

        assert!(first.name.ends_with("-00001"));
        assert!(second.name.ends_with("-00002"));
        assert_eq!(first.purpose, "Transfer");
        assert_eq!(first.current_state(), WorkflowState::Draft);

        let items = store.movement_items(&first.name).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source_location, "HQ");
        assert_eq!(items[0].target_location, "Depot");
    }

    #[tokio::test]
    async fn test_commit_transition_is_compare_and_swap() {
        let store = MemoryStore::new();
        let record = store.insert_movement(new_movement("a")).await.unwrap();

        let updated = store
            .commit_transition(commit(
                &record.name,
                WorkflowState::Draft,
                WorkflowState::HodApprovalPending,
                true,
            ))
            .await
            .unwrap();
        assert_eq!(updated.docstatus, DocStatus::Submitted);

        let err = store
            .commit_transition(commit(
                &record.name,
                WorkflowState::Draft,
                WorkflowState::AwaitingTransportAllocation,
                false,
            ))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::StateConflict {
                actual: WorkflowState::HodApprovalPending,
                ..
            }
        ));

        // The losing commit left no audit note behind
        assert_eq!(store.comments(&record.name).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unset_state_matches_draft() {
        let store = MemoryStore::new();
        let record = store.insert_movement(new_movement("a")).await.unwrap();
        store
            .tables
            .write()
            .await
            .movements
            .get_mut(&record.name)
            .unwrap()
            .workflow_state = None;

        let updated = store
            .commit_transition(commit(
                &record.name,
                WorkflowState::Draft,
                WorkflowState::AwaitingTransportAllocation,
                false,
            ))
            .await
            .unwrap();
        assert_eq!(updated.workflow_state, Some(WorkflowState::AwaitingTransportAllocation));
    }

    #[tokio::test]
    async fn test_list_scoping_and_ordering() {
        let store = MemoryStore::new();
        let a1 = store.insert_movement(new_movement("a")).await.unwrap();
        store.insert_movement(new_movement("b")).await.unwrap();
        let a2 = store.insert_movement(new_movement("a")).await.unwrap();
        store.update_remarks(&a1.name, "touched", "a").await.unwrap();

        let mine = store
            .list_movements(&MovementQuery {
                filter: MovementFilter {
                    owner: Some("a".to_string()),
                    workflow_state: None,
                },
                order_by: MovementOrder::ModifiedDesc,
                limit: None,
            })
            .await
            .unwrap();
        let names: Vec<_> = mine.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec![a1.name.as_str(), a2.name.as_str()]);

        let newest = store
            .list_movements(&MovementQuery {
                order_by: MovementOrder::CreationDesc,
                limit: Some(1),
                ..MovementQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(newest[0].name, a2.name);

        assert_eq!(store.count_movements(&MovementFilter::default()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state/store.json");

        let store = MemoryStore::open_snapshot(&path, None).await.unwrap();
        let record = store.insert_movement(new_movement("a")).await.unwrap();
        store.save_snapshot(&path).await.unwrap();

        let reopened = MemoryStore::open_snapshot(&path, None).await.unwrap();
        let loaded = reopened.get_movement(&record.name).await.unwrap().unwrap();
        assert_eq!(loaded, record);
        assert_eq!(reopened.movement_items(&record.name).await.unwrap().len(), 1);
        assert_eq!(reopened.tables().await, store.tables().await);
    }

    #[test]
    fn test_snapshot_lock_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let held = SnapshotLock::try_acquire(&path).unwrap();
        assert!(held.path().ends_with("store.lock"));
        assert!(matches!(SnapshotLock::try_acquire(&path), Err(StoreError::Lock(_))));

        drop(held);
        assert!(SnapshotLock::try_acquire(&path).is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_acquire_waits_for_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let held = SnapshotLock::try_acquire(&path).unwrap();

        let waiter = tokio::spawn({
            let path = path.clone();
            async move { SnapshotLock::acquire(&path).await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        assert!(!waiter.is_finished());

        drop(held);
        let taken = tokio::time::timeout(std::time::Duration::from_secs(5), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(taken.is_ok());
    }
}
