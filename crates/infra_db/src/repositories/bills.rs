//! Bill repository
//!
//! Data access for the bill collaborator's tables: bills, line items and
//! supporting documents. The workflow engine reaches these only through
//! `ClaimPort`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::DatabaseError;

/// Database row for a bill line item
#[derive(Debug, Clone, FromRow)]
pub struct BillItemRow {
    pub item_id: Uuid,
    pub claim_ref: Uuid,
    pub description: String,
    pub claimed_rate: Decimal,
    pub claimed_quantity: i32,
    pub claimed_amount: Decimal,
    pub approved_rate: Option<Decimal>,
    pub approved_quantity: Option<i32>,
    pub approved_amount: Option<Decimal>,
    pub comments: String,
}

/// Database row for a supporting document
#[derive(Debug, Clone, FromRow)]
pub struct BillDocumentRow {
    pub document_id: Uuid,
    pub claim_ref: Uuid,
    pub document_type: String,
    pub file_name: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Repository for bills, items and documents
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: PgPool,
}

impl BillRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Registers a bill with the given status
    pub async fn create_bill(&self, claim_ref: Uuid, status: &str) -> Result<(), DatabaseError> {
        sqlx::query("INSERT INTO bills (claim_ref, status) VALUES ($1, $2)")
            .bind(claim_ref)
            .bind(status)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Appends a line item; items are returned in insertion order
    pub async fn insert_item(&self, item: &BillItemRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO bill_items
                (item_id, claim_ref, description, claimed_rate, claimed_quantity, claimed_amount,
                 approved_rate, approved_quantity, approved_amount, comments)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(item.item_id)
        .bind(item.claim_ref)
        .bind(&item.description)
        .bind(item.claimed_rate)
        .bind(item.claimed_quantity)
        .bind(item.claimed_amount)
        .bind(item.approved_rate)
        .bind(item.approved_quantity)
        .bind(item.approved_amount)
        .bind(&item.comments)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn insert_document(&self, document: &BillDocumentRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO bill_documents (document_id, claim_ref, document_type, file_name, uploaded_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(document.document_id)
        .bind(document.claim_ref)
        .bind(&document.document_type)
        .bind(&document.file_name)
        .bind(document.uploaded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Current status of a bill
    pub async fn status(&self, claim_ref: Uuid) -> Result<String, DatabaseError> {
        sqlx::query_scalar::<_, String>("SELECT status FROM bills WHERE claim_ref = $1")
            .bind(claim_ref)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Claim", claim_ref))
    }

    pub async fn set_status(&self, claim_ref: Uuid, status: &str) -> Result<(), DatabaseError> {
        let updated = sqlx::query("UPDATE bills SET status = $2, updated_at = NOW() WHERE claim_ref = $1")
            .bind(claim_ref)
            .bind(status)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if updated == 0 {
            return Err(DatabaseError::not_found("Claim", claim_ref));
        }
        Ok(())
    }

    /// Sum of item claimed amounts; zero for a bill without items
    pub async fn claimed_total(&self, claim_ref: Uuid) -> Result<Decimal, DatabaseError> {
        // Confirms the bill exists
        self.status(claim_ref).await?;

        Ok(sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(claimed_amount), 0) FROM bill_items WHERE claim_ref = $1",
        )
        .bind(claim_ref)
        .fetch_one(&self.pool)
        .await?)
    }

    pub async fn items(&self, claim_ref: Uuid) -> Result<Vec<BillItemRow>, DatabaseError> {
        self.status(claim_ref).await?;

        Ok(sqlx::query_as::<_, BillItemRow>(
            r#"
            SELECT item_id, claim_ref, description, claimed_rate, claimed_quantity, claimed_amount,
                   approved_rate, approved_quantity, approved_amount, comments
            FROM bill_items
            WHERE claim_ref = $1
            ORDER BY line_no ASC
            "#,
        )
        .bind(claim_ref)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Writes the reviewer-editable side of one item
    pub async fn update_item_review(&self, item: &BillItemRow) -> Result<(), DatabaseError> {
        let updated = sqlx::query(
            r#"
            UPDATE bill_items
            SET approved_rate = $2,
                approved_quantity = $3,
                approved_amount = $4,
                comments = $5,
                updated_at = NOW()
            WHERE item_id = $1 AND claim_ref = $6
            "#,
        )
        .bind(item.item_id)
        .bind(item.approved_rate)
        .bind(item.approved_quantity)
        .bind(item.approved_amount)
        .bind(&item.comments)
        .bind(item.claim_ref)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(DatabaseError::not_found("BillItem", item.item_id));
        }
        Ok(())
    }

    pub async fn documents(&self, claim_ref: Uuid) -> Result<Vec<BillDocumentRow>, DatabaseError> {
        Ok(sqlx::query_as::<_, BillDocumentRow>(
            r#"
            SELECT document_id, claim_ref, document_type, file_name, uploaded_at
            FROM bill_documents
            WHERE claim_ref = $1
            ORDER BY uploaded_at ASC
            "#,
        )
        .bind(claim_ref)
        .fetch_all(&self.pool)
        .await?)
    }
}
