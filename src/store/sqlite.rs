// SQLite document store (feature `database`)

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::{debug, info};

use super::seed::SeedData;
use super::types::*;
use super::{movement_name, naming_prefix, DocumentStore, StoreError};
use crate::access::Role;
use crate::database::DatabaseManager;
use crate::workflows::{DocStatus, WorkflowState};

pub struct SqliteStore {
    db: DatabaseManager,
}

impl SqliteStore {
    pub fn new(db: DatabaseManager) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &DatabaseManager {
        &self.db
    }

    /// Upsert reference data
    pub async fn seed(&self, seed: &SeedData) -> Result<(), StoreError> {
        let mut tx = self.db.pool().begin().await?;

        for asset in &seed.assets {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO assets (name, asset_name, asset_category, location, status, item_code, docstatus)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&asset.name)
            .bind(&asset.asset_name)
            .bind(&asset.asset_category)
            .bind(&asset.location)
            .bind(&asset.status)
            .bind(&asset.item_code)
            .bind(u8::from(asset.docstatus) as i64)
            .execute(&mut *tx)
            .await?;
        }

        for location in &seed.locations {
            sqlx::query(
                "INSERT OR REPLACE INTO locations (name, location_name, is_group, disabled) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(&location.name)
            .bind(&location.location_name)
            .bind(location.is_group)
            .bind(location.disabled)
            .execute(&mut *tx)
            .await?;
        }

        for category in &seed.asset_categories {
            sqlx::query(
                "INSERT OR REPLACE INTO asset_categories (name, asset_category_name, disabled) VALUES (?1, ?2, ?3)",
            )
            .bind(&category.name)
            .bind(&category.asset_category_name)
            .bind(category.disabled)
            .execute(&mut *tx)
            .await?;
        }

        for transporter in &seed.transporters {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO transporters (name, supplier_name, mobile_no, email_id, disabled)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(&transporter.name)
            .bind(&transporter.supplier_name)
            .bind(&transporter.mobile_no)
            .bind(&transporter.email_id)
            .bind(transporter.disabled)
            .execute(&mut *tx)
            .await?;
        }

        for user in &seed.users {
            sqlx::query("INSERT OR REPLACE INTO users (user, full_name, email, roles) VALUES (?1, ?2, ?3, ?4)")
                .bind(&user.user)
                .bind(&user.full_name)
                .bind(&user.email)
                .bind(serde_json::to_string(&user.roles)?)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        info!(
            assets = seed.assets.len(),
            locations = seed.locations.len(),
            users = seed.users.len(),
            "Seeded reference data"
        );
        Ok(())
    }

    async fn state_of(&self, name: &str) -> Result<Option<WorkflowState>, StoreError> {
        let row = sqlx::query("SELECT workflow_state FROM movements WHERE name = ?1")
            .bind(name)
            .fetch_optional(self.db.pool())
            .await?;
        row.map(|row| parse_state(row.try_get("workflow_state")?))
            .transpose()
    }

    async fn fetch_movement(&self, name: &str) -> Result<MovementRecord, StoreError> {
        self.get_movement(name)
            .await?
            .ok_or_else(|| StoreError::movement_not_found(name))
    }
}

fn parse_state(raw: Option<String>) -> Result<WorkflowState, StoreError> {
    match raw {
        None => Ok(WorkflowState::default()),
        Some(label) => label
            .parse::<WorkflowState>()
            .map_err(|e| StoreError::Corrupt(e.to_string())),
    }
}

fn parse_docstatus(raw: i64) -> Result<DocStatus, StoreError> {
    u8::try_from(raw)
        .map_err(|_| StoreError::Corrupt(format!("invalid docstatus {raw}")))?
        .try_into()
        .map_err(StoreError::Corrupt)
}

fn movement_from_row(row: &SqliteRow) -> Result<MovementRecord, StoreError> {
    let workflow_state: Option<String> = row.try_get("workflow_state")?;
    Ok(MovementRecord {
        name: row.try_get("name")?,
        asset: row.try_get("asset")?,
        from_location: row.try_get("from_location")?,
        to_location: row.try_get("to_location")?,
        expected_date: row.try_get::<NaiveDate, _>("expected_date")?,
        remarks: row.try_get("remarks")?,
        purpose: row.try_get("purpose")?,
        transaction_date: row.try_get::<DateTime<Utc>, _>("transaction_date")?,
        workflow_state: workflow_state.map(|s| parse_state(Some(s))).transpose()?,
        docstatus: parse_docstatus(row.try_get("docstatus")?)?,
        owner: row.try_get("owner")?,
        creation: row.try_get("creation")?,
        modified: row.try_get("modified")?,
        modified_by: row.try_get("modified_by")?,
    })
}

fn comment_from_row(row: &SqliteRow) -> Result<Comment, StoreError> {
    let comment_type: String = row.try_get("comment_type")?;
    Ok(Comment {
        name: format!("CMT-{:06}", row.try_get::<i64, _>("id")?),
        reference_name: row.try_get("reference_name")?,
        comment_type: match comment_type.as_str() {
            "Workflow" => CommentType::Workflow,
            "Info" => CommentType::Info,
            other => return Err(StoreError::Corrupt(format!("unknown comment type {other}"))),
        },
        content: row.try_get("content")?,
        owner: row.try_get("owner")?,
        creation: row.try_get("creation")?,
    })
}

fn asset_from_row(row: &SqliteRow) -> Result<Asset, StoreError> {
    Ok(Asset {
        name: row.try_get("name")?,
        asset_name: row.try_get("asset_name")?,
        asset_category: row.try_get("asset_category")?,
        location: row.try_get("location")?,
        status: row.try_get("status")?,
        item_code: row.try_get("item_code")?,
        docstatus: parse_docstatus(row.try_get("docstatus")?)?,
    })
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn insert_movement(&self, movement: NewMovement) -> Result<MovementRecord, StoreError> {
        let now = Utc::now();
        let mut tx = self.db.pool().begin().await?;

        let seq: i64 = sqlx::query(
            r#"
            INSERT INTO naming_series (prefix, current) VALUES (?1, 1)
            ON CONFLICT(prefix) DO UPDATE SET current = current + 1
            RETURNING current
            "#,
        )
        .bind(naming_prefix(now))
        .fetch_one(&mut *tx)
        .await?
        .try_get("current")?;
        let name = movement_name(now, seq as u64);

        sqlx::query(
            r#"
            INSERT INTO movements (name, asset, from_location, to_location, expected_date, remarks,
                                   purpose, transaction_date, workflow_state, docstatus, owner,
                                   creation, modified, modified_by)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10, ?8, ?8, ?10)
            "#,
        )
        .bind(&name)
        .bind(&movement.asset)
        .bind(&movement.from_location)
        .bind(&movement.to_location)
        .bind(movement.expected_date)
        .bind(&movement.remarks)
        .bind(TRANSFER_PURPOSE)
        .bind(now)
        .bind(WorkflowState::Draft.as_str())
        .bind(&movement.owner)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO movement_items (parent, idx, source_location, target_location, asset, asset_name)
            VALUES (?1, 1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&name)
        .bind(&movement.from_location)
        .bind(&movement.to_location)
        .bind(&movement.asset)
        .bind(&movement.asset_name)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(record = %name, "Inserted movement");
        self.fetch_movement(&name).await
    }

    async fn get_movement(&self, name: &str) -> Result<Option<MovementRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM movements WHERE name = ?1")
            .bind(name)
            .fetch_optional(self.db.pool())
            .await?;
        row.as_ref().map(movement_from_row).transpose()
    }

    async fn list_movements(&self, query: &MovementQuery) -> Result<Vec<MovementRecord>, StoreError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM movements WHERE 1 = 1");
        push_filter(&mut builder, &query.filter);
        builder.push(match query.order_by {
            MovementOrder::ModifiedDesc => " ORDER BY modified DESC, name DESC",
            MovementOrder::CreationDesc => " ORDER BY creation DESC, name DESC",
        });
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows = builder.build().fetch_all(self.db.pool()).await?;
        rows.iter().map(movement_from_row).collect()
    }

    async fn count_movements(&self, filter: &MovementFilter) -> Result<usize, StoreError> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) AS total FROM movements WHERE 1 = 1");
        push_filter(&mut builder, filter);
        let total: i64 = builder
            .build()
            .fetch_one(self.db.pool())
            .await?
            .try_get("total")?;
        Ok(total as usize)
    }

    async fn movement_items(&self, parent: &str) -> Result<Vec<MovementItem>, StoreError> {
        let rows = sqlx::query("SELECT * FROM movement_items WHERE parent = ?1 ORDER BY idx")
            .bind(parent)
            .fetch_all(self.db.pool())
            .await?;

        rows.iter()
            .map(|row| -> Result<MovementItem, StoreError> {
                Ok(MovementItem {
                    parent: row.try_get("parent")?,
                    idx: row.try_get::<i64, _>("idx")? as u32,
                    source_location: row.try_get("source_location")?,
                    target_location: row.try_get("target_location")?,
                    asset: row.try_get("asset")?,
                    asset_name: row.try_get("asset_name")?,
                })
            })
            .collect()
    }

    async fn commit_transition(&self, commit: TransitionCommit) -> Result<MovementRecord, StoreError> {
        let now = Utc::now();
        let mut tx = self.db.pool().begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE movements
            SET workflow_state = ?1,
                docstatus = CASE WHEN ?2 AND docstatus = 0 THEN 1 ELSE docstatus END,
                modified = ?3,
                modified_by = ?4
            WHERE name = ?5 AND COALESCE(workflow_state, ?6) = ?7
            "#,
        )
        .bind(commit.next_state.as_str())
        .bind(commit.submit)
        .bind(now)
        .bind(&commit.modified_by)
        .bind(&commit.name)
        .bind(WorkflowState::default().as_str())
        .bind(commit.expected_state.as_str())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return match self.state_of(&commit.name).await? {
                None => Err(StoreError::movement_not_found(&commit.name)),
                Some(actual) => Err(StoreError::StateConflict {
                    name: commit.name,
                    expected: commit.expected_state,
                    actual,
                }),
            };
        }

        sqlx::query(
            r#"
            INSERT INTO comments (reference_name, comment_type, content, owner, creation)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&commit.note.reference_name)
        .bind(commit.note.comment_type.as_str())
        .bind(&commit.note.content)
        .bind(&commit.note.owner)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.fetch_movement(&commit.name).await
    }

    async fn update_remarks(
        &self,
        name: &str,
        remarks: &str,
        modified_by: &str,
    ) -> Result<MovementRecord, StoreError> {
        let updated = sqlx::query(
            "UPDATE movements SET remarks = ?1, modified = ?2, modified_by = ?3 WHERE name = ?4",
        )
        .bind(remarks)
        .bind(Utc::now())
        .bind(modified_by)
        .bind(name)
        .execute(self.db.pool())
        .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::movement_not_found(name));
        }
        self.fetch_movement(name).await
    }

    async fn add_comment(&self, comment: NewComment) -> Result<Comment, StoreError> {
        if self.state_of(&comment.reference_name).await?.is_none() {
            return Err(StoreError::movement_not_found(&comment.reference_name));
        }

        let row = sqlx::query(
            r#"
            INSERT INTO comments (reference_name, comment_type, content, owner, creation)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING *
            "#,
        )
        .bind(&comment.reference_name)
        .bind(comment.comment_type.as_str())
        .bind(&comment.content)
        .bind(&comment.owner)
        .bind(Utc::now())
        .fetch_one(self.db.pool())
        .await?;
        comment_from_row(&row)
    }

    async fn comments(&self, reference_name: &str) -> Result<Vec<Comment>, StoreError> {
        let rows = sqlx::query("SELECT * FROM comments WHERE reference_name = ?1 ORDER BY id")
            .bind(reference_name)
            .fetch_all(self.db.pool())
            .await?;
        rows.iter().map(comment_from_row).collect()
    }

    async fn insert_rejection_reason(
        &self,
        reason: NewRejectionReason,
    ) -> Result<RejectionReason, StoreError> {
        if self.state_of(&reason.reference_document).await?.is_none() {
            return Err(StoreError::movement_not_found(&reason.reference_document));
        }

        let now = Utc::now();
        let id: i64 = sqlx::query(
            r#"
            INSERT INTO rejection_reasons (reference_document, rejected_by, data, reason, datetime)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id
            "#,
        )
        .bind(&reason.reference_document)
        .bind(&reason.rejected_by)
        .bind(reason.data.as_str())
        .bind(&reason.reason)
        .bind(now)
        .fetch_one(self.db.pool())
        .await?
        .try_get("id")?;

        Ok(RejectionReason {
            name: format!("RJR-{id:05}"),
            reference_document: reason.reference_document,
            rejected_by: reason.rejected_by,
            data: reason.data,
            reason: reason.reason,
            datetime: now,
        })
    }

    async fn rejection_reasons(&self, reference_document: &str) -> Result<Vec<RejectionReason>, StoreError> {
        let rows = sqlx::query("SELECT * FROM rejection_reasons WHERE reference_document = ?1 ORDER BY id")
            .bind(reference_document)
            .fetch_all(self.db.pool())
            .await?;

        rows.iter()
            .map(|row| -> Result<RejectionReason, StoreError> {
                Ok(RejectionReason {
                    name: format!("RJR-{:05}", row.try_get::<i64, _>("id")?),
                    reference_document: row.try_get("reference_document")?,
                    rejected_by: row.try_get("rejected_by")?,
                    data: parse_state(row.try_get("data")?)?,
                    reason: row.try_get("reason")?,
                    datetime: row.try_get("datetime")?,
                })
            })
            .collect()
    }

    async fn get_asset(&self, name: &str) -> Result<Option<Asset>, StoreError> {
        let row = sqlx::query("SELECT * FROM assets WHERE name = ?1")
            .bind(name)
            .fetch_optional(self.db.pool())
            .await?;
        row.as_ref().map(asset_from_row).transpose()
    }

    async fn list_assets(&self, query: &AssetQuery) -> Result<Vec<Asset>, StoreError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM assets WHERE docstatus = 1");
        if let Some(location) = &query.location {
            builder.push(" AND location = ").push_bind(location.clone());
        }
        if let Some(category) = &query.category {
            builder.push(" AND asset_category = ").push_bind(category.clone());
        }
        if let Some(term) = &query.search {
            let pattern = format!("%{term}%");
            builder
                .push(" AND (asset_name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR item_code LIKE ")
                .push_bind(pattern.clone())
                .push(" OR name LIKE ")
                .push_bind(pattern)
                .push(")");
        }
        builder.push(" ORDER BY asset_name");
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows = builder.build().fetch_all(self.db.pool()).await?;
        rows.iter().map(asset_from_row).collect()
    }

    async fn list_locations(&self) -> Result<Vec<Location>, StoreError> {
        let rows = sqlx::query("SELECT * FROM locations WHERE disabled = 0 ORDER BY location_name")
            .fetch_all(self.db.pool())
            .await?;
        rows.iter()
            .map(|row| -> Result<Location, StoreError> {
                Ok(Location {
                    name: row.try_get("name")?,
                    location_name: row.try_get("location_name")?,
                    is_group: row.try_get("is_group")?,
                    disabled: row.try_get("disabled")?,
                })
            })
            .collect()
    }

    async fn list_asset_categories(&self) -> Result<Vec<AssetCategory>, StoreError> {
        let rows = sqlx::query("SELECT * FROM asset_categories WHERE disabled = 0 ORDER BY asset_category_name")
            .fetch_all(self.db.pool())
            .await?;
        rows.iter()
            .map(|row| -> Result<AssetCategory, StoreError> {
                Ok(AssetCategory {
                    name: row.try_get("name")?,
                    asset_category_name: row.try_get("asset_category_name")?,
                    disabled: row.try_get("disabled")?,
                })
            })
            .collect()
    }

    async fn list_transporters(&self) -> Result<Vec<Transporter>, StoreError> {
        let rows = sqlx::query("SELECT * FROM transporters WHERE disabled = 0 ORDER BY supplier_name")
            .fetch_all(self.db.pool())
            .await?;
        rows.iter()
            .map(|row| -> Result<Transporter, StoreError> {
                Ok(Transporter {
                    name: row.try_get("name")?,
                    supplier_name: row.try_get("supplier_name")?,
                    mobile_no: row.try_get("mobile_no")?,
                    email_id: row.try_get("email_id")?,
                    disabled: row.try_get("disabled")?,
                })
            })
            .collect()
    }

    async fn get_user(&self, user: &str) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query("SELECT * FROM users WHERE user = ?1")
            .bind(user)
            .fetch_optional(self.db.pool())
            .await?;

        row.map(|row| -> Result<UserProfile, StoreError> {
            let roles: String = row.try_get("roles")?;
            Ok(UserProfile {
                user: row.try_get("user")?,
                full_name: row.try_get("full_name")?,
                email: row.try_get("email")?,
                roles: serde_json::from_str::<Vec<Role>>(&roles)?,
            })
        })
        .transpose()
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &MovementFilter) {
    if let Some(owner) = &filter.owner {
        builder.push(" AND owner = ").push_bind(owner.clone());
    }
    if let Some(state) = filter.workflow_state {
        builder
            .push(" AND COALESCE(workflow_state, ")
            .push_bind(WorkflowState::default().as_str())
            .push(") = ")
            .push_bind(state.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteStore {
        let db = DatabaseManager::new("sqlite::memory:", 1, true).await.unwrap();
        SqliteStore::new(db)
    }

    fn new_movement() -> NewMovement {
        NewMovement {
            asset: "AST-0001".to_string(),
            asset_name: Some("Laptop".to_string()),
            from_location: "HQ".to_string(),
            to_location: "Depot".to_string(),
            expected_date: NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
            remarks: String::new(),
            owner: "custodian@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_commit_transition() {
        let store = store().await;
        let record = store.insert_movement(new_movement()).await.unwrap();
        assert!(record.name.ends_with("-00001"));
        assert_eq!(store.movement_items(&record.name).await.unwrap().len(), 1);

        let note = NewComment {
            reference_name: record.name.clone(),
            comment_type: CommentType::Workflow,
            content: "moved".to_string(),
            owner: "admin".to_string(),
        };
        let updated = store
            .commit_transition(TransitionCommit {
                name: record.name.clone(),
                expected_state: WorkflowState::Draft,
                next_state: WorkflowState::HodApprovalPending,
                submit: true,
                modified_by: "admin".to_string(),
                note: note.clone(),
            })
            .await
            .unwrap();
        assert_eq!(updated.workflow_state, Some(WorkflowState::HodApprovalPending));
        assert_eq!(updated.docstatus, DocStatus::Submitted);

        let err = store
            .commit_transition(TransitionCommit {
                name: record.name.clone(),
                expected_state: WorkflowState::Draft,
                next_state: WorkflowState::AwaitingTransportAllocation,
                submit: false,
                modified_by: "admin".to_string(),
                note,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::StateConflict { .. }));
        assert_eq!(store.comments(&record.name).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_seeded_assets_search() {
        let store = store().await;
        store
            .seed(&SeedData {
                assets: vec![
                    Asset {
                        name: "AST-0001".to_string(),
                        asset_name: "Dell Laptop".to_string(),
                        asset_category: Some("IT".to_string()),
                        location: Some("HQ".to_string()),
                        status: None,
                        item_code: Some("LAP-01".to_string()),
                        docstatus: DocStatus::Submitted,
                    },
                    Asset {
                        name: "AST-0002".to_string(),
                        asset_name: "Draft Laptop".to_string(),
                        asset_category: None,
                        location: None,
                        status: None,
                        item_code: None,
                        docstatus: DocStatus::Draft,
                    },
                ],
                ..SeedData::default()
            })
            .await
            .unwrap();

        let found = store
            .list_assets(&AssetQuery {
                search: Some("laptop".to_string()),
                ..AssetQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "AST-0001");
    }
}
