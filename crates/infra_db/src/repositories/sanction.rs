//! Sanction request and approval ledger repository
//!
//! Requests carry an optimistic `version`. Every state change goes through
//! [`SanctionRepository::commit`], which updates the request only if the
//! version still matches and appends the ledger row in the same transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::DatabaseError;

/// Database row for a sanction request
#[derive(Debug, Clone, FromRow)]
pub struct SanctionRequestRow {
    pub request_id: Uuid,
    pub claim_ref: Uuid,
    pub claimed_amount: Decimal,
    pub sanctioned_amount: Option<Decimal>,
    pub current_step: i32,
    pub status: String,
    pub assigned_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

/// Database row for an approval ledger entry
#[derive(Debug, Clone, FromRow)]
pub struct ApprovalLogRow {
    pub entry_id: Uuid,
    pub request_id: Uuid,
    pub sequence: i64,
    pub step_order: i32,
    pub actor_id: Uuid,
    pub action: String,
    pub comments: String,
    pub approved_amount_at_stage: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

const REQUEST_COLUMNS: &str = r#"
    request_id, claim_ref, claimed_amount, sanctioned_amount, current_step,
    status, assigned_to, created_at, updated_at, version
"#;

/// Repository for sanction requests and their ledger
#[derive(Debug, Clone)]
pub struct SanctionRepository {
    pool: PgPool,
}

impl SanctionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Inserts a newly submitted request
    ///
    /// A second request for the same claim fails with `DuplicateEntry`.
    pub async fn insert(&self, row: &SanctionRequestRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO sanction_requests
                (request_id, claim_ref, claimed_amount, sanctioned_amount, current_step,
                 status, assigned_to, created_at, updated_at, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(row.request_id)
        .bind(row.claim_ref)
        .bind(row.claimed_amount)
        .bind(row.sanctioned_amount)
        .bind(row.current_step)
        .bind(&row.status)
        .bind(row.assigned_to)
        .bind(row.created_at)
        .bind(row.updated_at)
        .bind(row.version)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Retrieves a request by its identifier
    pub async fn get_by_id(&self, request_id: Uuid) -> Result<SanctionRequestRow, DatabaseError> {
        let sql = format!("SELECT {} FROM sanction_requests WHERE request_id = $1", REQUEST_COLUMNS);
        sqlx::query_as::<_, SanctionRequestRow>(&sql)
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("SanctionRequest", request_id))
    }

    pub async fn find_by_claim(&self, claim_ref: Uuid) -> Result<Option<SanctionRequestRow>, DatabaseError> {
        let sql = format!("SELECT {} FROM sanction_requests WHERE claim_ref = $1", REQUEST_COLUMNS);
        Ok(sqlx::query_as::<_, SanctionRequestRow>(&sql)
            .bind(claim_ref)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Requests filtered by step and status, oldest first
    ///
    /// `None` for a filter means "any".
    pub async fn find(
        &self,
        step_orders: Option<Vec<i32>>,
        statuses: Option<Vec<String>>,
    ) -> Result<Vec<SanctionRequestRow>, DatabaseError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM sanction_requests
            WHERE ($1::INTEGER[] IS NULL OR current_step = ANY($1))
              AND ($2::TEXT[] IS NULL OR status = ANY($2))
            ORDER BY created_at ASC, request_id ASC
            "#,
            REQUEST_COLUMNS
        );
        Ok(sqlx::query_as::<_, SanctionRequestRow>(&sql)
            .bind(step_orders)
            .bind(statuses)
            .fetch_all(&self.pool)
            .await?)
    }

    /// All ledger rows for a request in append order
    pub async fn log_entries(&self, request_id: Uuid) -> Result<Vec<ApprovalLogRow>, DatabaseError> {
        Ok(sqlx::query_as::<_, ApprovalLogRow>(
            r#"
            SELECT entry_id, request_id, sequence, step_order, actor_id, action,
                   comments, approved_amount_at_stage, created_at
            FROM approval_log
            WHERE request_id = $1
            ORDER BY sequence ASC
            "#,
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn exists(&self, request_id: Uuid) -> Result<bool, DatabaseError> {
        Ok(sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM sanction_requests WHERE request_id = $1)",
        )
        .bind(request_id)
        .fetch_one(&self.pool)
        .await?)
    }

    /// Stores the request state and appends the ledger row atomically
    ///
    /// # Errors
    ///
    /// - `NotFound` if the request does not exist
    /// - `VersionConflict` if the stored version is not `expected_version`
    pub async fn commit(
        &self,
        row: &SanctionRequestRow,
        expected_version: i64,
        entry: &ApprovalLogRow,
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE sanction_requests
            SET claimed_amount = $2,
                sanctioned_amount = $3,
                current_step = $4,
                status = $5,
                assigned_to = $6,
                updated_at = $7,
                version = $8
            WHERE request_id = $1 AND version = $9
            "#,
        )
        .bind(row.request_id)
        .bind(row.claimed_amount)
        .bind(row.sanctioned_amount)
        .bind(row.current_step)
        .bind(&row.status)
        .bind(row.assigned_to)
        .bind(row.updated_at)
        .bind(row.version)
        .bind(expected_version)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            tx.rollback().await?;
            if !self.exists(row.request_id).await? {
                return Err(DatabaseError::not_found("SanctionRequest", row.request_id));
            }
            return Err(DatabaseError::VersionConflict(format!(
                "sanction request {} is no longer at version {}",
                row.request_id, expected_version
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO approval_log
                (entry_id, request_id, sequence, step_order, actor_id, action,
                 comments, approved_amount_at_stage, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(entry.entry_id)
        .bind(entry.request_id)
        .bind(entry.sequence)
        .bind(entry.step_order)
        .bind(entry.actor_id)
        .bind(&entry.action)
        .bind(&entry.comments)
        .bind(entry.approved_amount_at_stage)
        .bind(entry.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Overwrites the stored claimed amount, leaving the version alone
    pub async fn update_claimed_amount(&self, request_id: Uuid, amount: Decimal) -> Result<(), DatabaseError> {
        let updated = sqlx::query(
            "UPDATE sanction_requests SET claimed_amount = $2, updated_at = NOW() WHERE request_id = $1",
        )
        .bind(request_id)
        .bind(amount)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(DatabaseError::not_found("SanctionRequest", request_id));
        }
        Ok(())
    }
}
