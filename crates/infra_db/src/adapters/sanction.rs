//! PostgreSQL Sanction Store
//!
//! Implements `SanctionStore` on top of [`SanctionRepository`]. Row types use
//! the database's signed integers and text codes; the conversions here are
//! the only place those meet the domain's enums and unsigned counters.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresSanctionStore;
//! use domain_workflow::SanctionStore;
//! use std::sync::Arc;
//!
//! let store: Arc<dyn SanctionStore> = Arc::new(PostgresSanctionStore::new(pool));
//! let request = store.get_request(request_id).await?;
//! ```

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{
    AdapterHealth, ClaimRef, DomainPort, HealthCheckResult, HealthCheckable, LogEntryId, PortError,
    ReviewerId, SanctionRequestId,
};
use domain_workflow::{
    ActionCommit, ApprovalAction, ApprovalLogEntry, RequestQuery, RequestStatus, SanctionRequest,
    SanctionStore,
};

use crate::error::DatabaseError;
use crate::repositories::sanction::{ApprovalLogRow, SanctionRepository, SanctionRequestRow};

/// PostgreSQL-backed implementation of `SanctionStore`
///
/// Database errors are translated to `PortError`:
/// - `NotFound` -> `PortError::NotFound`
/// - `DuplicateEntry` and `VersionConflict` -> `PortError::Conflict`
/// - anything else -> connection, validation or internal errors
#[derive(Debug, Clone)]
pub struct PostgresSanctionStore {
    repository: SanctionRepository,
    pool: PgPool,
}

impl PostgresSanctionStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: SanctionRepository::new(pool.clone()),
            pool,
        }
    }

    /// Returns a reference to the underlying repository
    pub fn repository(&self) -> &SanctionRepository {
        &self.repository
    }
}

impl DomainPort for PostgresSanctionStore {}

#[async_trait]
impl HealthCheckable for PostgresSanctionStore {
    /// Runs `SELECT 1` against the pool
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult {
                adapter_id: "postgres-sanction-store".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms,
                message: None,
                checked_at: Utc::now(),
            },
            Err(e) => HealthCheckResult {
                adapter_id: "postgres-sanction-store".to_string(),
                status: AdapterHealth::Unhealthy,
                latency_ms,
                message: Some(format!("Database error: {}", e)),
                checked_at: Utc::now(),
            },
        }
    }
}

#[async_trait]
impl SanctionStore for PostgresSanctionStore {
    #[instrument(skip(self, request), fields(request_id = %request.id))]
    async fn insert_request(&self, request: &SanctionRequest) -> Result<(), PortError> {
        let row = request_to_row(request)?;
        self.repository.insert(&row).await.map_err(|e| match e {
            DatabaseError::DuplicateEntry(_) => PortError::conflict(format!(
                "claim {} already has a sanction request",
                request.claim_ref
            )),
            other => other.into(),
        })
    }

    #[instrument(skip(self))]
    async fn get_request(&self, id: SanctionRequestId) -> Result<SanctionRequest, PortError> {
        let row = self.repository.get_by_id(*id.as_uuid()).await?;
        Ok(request_from_row(row)?)
    }

    #[instrument(skip(self))]
    async fn find_by_claim(&self, claim_ref: ClaimRef) -> Result<Option<SanctionRequest>, PortError> {
        match self.repository.find_by_claim(*claim_ref.as_uuid()).await? {
            Some(row) => Ok(Some(request_from_row(row)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, query))]
    async fn find_requests(&self, query: RequestQuery) -> Result<Vec<SanctionRequest>, PortError> {
        let step_orders = match query.step_orders {
            Some(orders) => Some(
                orders
                    .into_iter()
                    .map(step_to_db)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            None => None,
        };
        let statuses = query
            .statuses
            .map(|s| s.iter().map(|st| st.as_str().to_string()).collect());

        let rows = self.repository.find(step_orders, statuses).await?;
        debug!(count = rows.len(), "Loaded sanction requests");

        rows.into_iter()
            .map(|row| request_from_row(row).map_err(PortError::from))
            .collect()
    }

    #[instrument(skip(self))]
    async fn ledger_entries(&self, id: SanctionRequestId) -> Result<Vec<ApprovalLogEntry>, PortError> {
        if !self.repository.exists(*id.as_uuid()).await? {
            return Err(PortError::not_found("SanctionRequest", id));
        }
        let rows = self.repository.log_entries(*id.as_uuid()).await?;
        rows.into_iter()
            .map(|row| entry_from_row(row).map_err(PortError::from))
            .collect()
    }

    #[instrument(skip(self, commit), fields(request_id = %commit.request.id, version = commit.request.version))]
    async fn commit(&self, commit: ActionCommit) -> Result<(), PortError> {
        let row = request_to_row(&commit.request)?;
        let entry = entry_to_row(&commit.entry)?;
        let expected = version_to_db(commit.expected_version)?;

        self.repository.commit(&row, expected, &entry).await?;
        debug!(action = %commit.entry.action, "Committed sanction action");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn repair_claimed_amount(
        &self,
        id: SanctionRequestId,
        claimed_amount: Decimal,
    ) -> Result<(), PortError> {
        self.repository
            .update_claimed_amount(*id.as_uuid(), claimed_amount)
            .await?;
        Ok(())
    }
}

fn step_to_db(order: u32) -> Result<i32, DatabaseError> {
    i32::try_from(order).map_err(|_| DatabaseError::invalid_data(format!("step order {} out of range", order)))
}

fn step_from_db(order: i32) -> Result<u32, DatabaseError> {
    u32::try_from(order).map_err(|_| DatabaseError::invalid_data(format!("negative step order {}", order)))
}

fn version_to_db(version: u64) -> Result<i64, DatabaseError> {
    i64::try_from(version).map_err(|_| DatabaseError::invalid_data(format!("version {} out of range", version)))
}

fn version_from_db(version: i64) -> Result<u64, DatabaseError> {
    u64::try_from(version).map_err(|_| DatabaseError::invalid_data(format!("negative version {}", version)))
}

fn request_to_row(request: &SanctionRequest) -> Result<SanctionRequestRow, DatabaseError> {
    Ok(SanctionRequestRow {
        request_id: *request.id.as_uuid(),
        claim_ref: *request.claim_ref.as_uuid(),
        claimed_amount: request.claimed_amount,
        sanctioned_amount: request.sanctioned_amount,
        current_step: step_to_db(request.current_step)?,
        status: request.status.as_str().to_string(),
        assigned_to: request.assigned_to.map(|r| *r.as_uuid()),
        created_at: request.created_at,
        updated_at: request.updated_at,
        version: version_to_db(request.version)?,
    })
}

fn request_from_row(row: SanctionRequestRow) -> Result<SanctionRequest, DatabaseError> {
    let status: RequestStatus = row.status.parse().map_err(DatabaseError::InvalidData)?;

    Ok(SanctionRequest {
        id: SanctionRequestId::from_uuid(row.request_id),
        claim_ref: ClaimRef::from_uuid(row.claim_ref),
        claimed_amount: row.claimed_amount,
        sanctioned_amount: row.sanctioned_amount,
        current_step: step_from_db(row.current_step)?,
        status,
        assigned_to: row.assigned_to.map(ReviewerId::from_uuid),
        created_at: row.created_at,
        updated_at: row.updated_at,
        version: version_from_db(row.version)?,
    })
}

fn entry_to_row(entry: &ApprovalLogEntry) -> Result<ApprovalLogRow, DatabaseError> {
    Ok(ApprovalLogRow {
        entry_id: *entry.id.as_uuid(),
        request_id: *entry.request_id.as_uuid(),
        sequence: version_to_db(entry.sequence)?,
        step_order: step_to_db(entry.step_order)?,
        actor_id: *entry.actor.as_uuid(),
        action: entry.action.as_str().to_string(),
        comments: entry.comments.clone(),
        approved_amount_at_stage: entry.approved_amount_at_stage,
        created_at: entry.timestamp,
    })
}

fn entry_from_row(row: ApprovalLogRow) -> Result<ApprovalLogEntry, DatabaseError> {
    let action: ApprovalAction = row.action.parse().map_err(DatabaseError::InvalidData)?;

    Ok(ApprovalLogEntry {
        id: LogEntryId::from_uuid(row.entry_id),
        request_id: SanctionRequestId::from_uuid(row.request_id),
        sequence: version_from_db(row.sequence)?,
        step_order: step_from_db(row.step_order)?,
        actor: ReviewerId::from_uuid(row.actor_id),
        action,
        comments: row.comments,
        approved_amount_at_stage: row.approved_amount_at_stage,
        timestamp: row.created_at,
    })
}
