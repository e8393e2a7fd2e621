//! PostgreSQL Claim Adapter
//!
//! Implements `ClaimPort` over the bill tables. Quantities are stored as
//! `INTEGER` and surfaced to the domain as `u32`.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{BillItemId, ClaimRef, DocumentId, DomainPort, OperationMetadata, PortError};
use domain_workflow::{BillItem, ClaimDocument, ClaimPort, ClaimStatus, DocumentType};

use crate::error::DatabaseError;
use crate::repositories::bills::{BillDocumentRow, BillItemRow, BillRepository};

/// PostgreSQL-backed implementation of `ClaimPort`
#[derive(Debug, Clone)]
pub struct PostgresClaimAdapter {
    repository: BillRepository,
}

impl PostgresClaimAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: BillRepository::new(pool),
        }
    }

    /// Returns a reference to the underlying repository
    ///
    /// Bill intake lives outside the workflow; tests and seeding tools use
    /// the repository directly.
    pub fn repository(&self) -> &BillRepository {
        &self.repository
    }
}

impl DomainPort for PostgresClaimAdapter {}

#[async_trait]
impl ClaimPort for PostgresClaimAdapter {
    #[instrument(skip(self, _metadata))]
    async fn get_claim_amount(
        &self,
        claim_ref: ClaimRef,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Decimal, PortError> {
        Ok(self.repository.claimed_total(*claim_ref.as_uuid()).await?)
    }

    #[instrument(skip(self, _metadata))]
    async fn get_claim_items(
        &self,
        claim_ref: ClaimRef,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<BillItem>, PortError> {
        let rows = self.repository.items(*claim_ref.as_uuid()).await?;
        debug!(count = rows.len(), "Loaded bill items");
        rows.into_iter()
            .map(|row| item_from_row(row).map_err(PortError::from))
            .collect()
    }

    #[instrument(skip(self, item, metadata), fields(item_id = %item.id))]
    async fn save_claim_item(
        &self,
        item: &BillItem,
        metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError> {
        let row = item_to_row(item)?;
        self.repository.update_item_review(&row).await?;
        debug!(
            initiated_by = metadata.as_ref().and_then(|m| m.initiated_by.as_deref()),
            "Saved bill item review"
        );
        Ok(())
    }

    #[instrument(skip(self, _metadata))]
    async fn get_claim_status(
        &self,
        claim_ref: ClaimRef,
        _metadata: Option<OperationMetadata>,
    ) -> Result<ClaimStatus, PortError> {
        let status = self.repository.status(*claim_ref.as_uuid()).await?;
        status
            .parse()
            .map_err(|e: String| DatabaseError::InvalidData(e).into())
    }

    #[instrument(skip(self, _metadata))]
    async fn set_claim_status(
        &self,
        claim_ref: ClaimRef,
        status: ClaimStatus,
        _metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError> {
        self.repository
            .set_status(*claim_ref.as_uuid(), status.as_str())
            .await?;
        Ok(())
    }

    #[instrument(skip(self, _metadata))]
    async fn get_claim_documents(
        &self,
        claim_ref: ClaimRef,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<ClaimDocument>, PortError> {
        let rows = self.repository.documents(*claim_ref.as_uuid()).await?;
        rows.into_iter()
            .map(|row| document_from_row(row).map_err(PortError::from))
            .collect()
    }
}

fn quantity_to_db(quantity: u32) -> Result<i32, DatabaseError> {
    i32::try_from(quantity)
        .map_err(|_| DatabaseError::invalid_data(format!("quantity {} out of range", quantity)))
}

fn quantity_from_db(quantity: i32) -> Result<u32, DatabaseError> {
    u32::try_from(quantity)
        .map_err(|_| DatabaseError::invalid_data(format!("negative quantity {}", quantity)))
}

/// Converts a domain item into its row form
pub fn item_to_row(item: &BillItem) -> Result<BillItemRow, DatabaseError> {
    Ok(BillItemRow {
        item_id: *item.id.as_uuid(),
        claim_ref: *item.claim_ref.as_uuid(),
        description: item.description.clone(),
        claimed_rate: item.claimed_rate,
        claimed_quantity: quantity_to_db(item.claimed_quantity)?,
        claimed_amount: item.claimed_amount,
        approved_rate: item.approved_rate,
        approved_quantity: item.approved_quantity.map(quantity_to_db).transpose()?,
        approved_amount: item.approved_amount,
        comments: item.comments.clone(),
    })
}

fn item_from_row(row: BillItemRow) -> Result<BillItem, DatabaseError> {
    Ok(BillItem {
        id: BillItemId::from_uuid(row.item_id),
        claim_ref: ClaimRef::from_uuid(row.claim_ref),
        description: row.description,
        claimed_rate: row.claimed_rate,
        claimed_quantity: quantity_from_db(row.claimed_quantity)?,
        claimed_amount: row.claimed_amount,
        approved_rate: row.approved_rate,
        approved_quantity: row.approved_quantity.map(quantity_from_db).transpose()?,
        approved_amount: row.approved_amount,
        comments: row.comments,
    })
}

/// Converts a domain document into its row form
pub fn document_to_row(document: &ClaimDocument) -> BillDocumentRow {
    BillDocumentRow {
        document_id: *document.id.as_uuid(),
        claim_ref: *document.claim_ref.as_uuid(),
        document_type: document.document_type.as_str().to_string(),
        file_name: document.file_name.clone(),
        uploaded_at: document.uploaded_at,
    }
}

fn document_from_row(row: BillDocumentRow) -> Result<ClaimDocument, DatabaseError> {
    let document_type: DocumentType = row
        .document_type
        .parse()
        .map_err(DatabaseError::InvalidData)?;

    Ok(ClaimDocument {
        id: DocumentId::from_uuid(row.document_id),
        claim_ref: ClaimRef::from_uuid(row.claim_ref),
        document_type,
        file_name: row.file_name,
        uploaded_at: row.uploaded_at,
    })
}
