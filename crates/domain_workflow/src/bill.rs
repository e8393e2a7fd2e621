//! Bill data owned by the claim collaborator
//!
//! The engine never owns bill content. It reads line items to reconcile
//! amounts and lets reviewers revise the approved side of each item.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{BillItemId, ClaimRef, DocumentId};

/// Status of the claim as tracked by the bill collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimStatus {
    Draft,
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    Clarification,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Draft => "DRAFT",
            ClaimStatus::Submitted => "SUBMITTED",
            ClaimStatus::UnderReview => "UNDER_REVIEW",
            ClaimStatus::Approved => "APPROVED",
            ClaimStatus::Rejected => "REJECTED",
            ClaimStatus::Clarification => "CLARIFICATION",
        }
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(ClaimStatus::Draft),
            "SUBMITTED" => Ok(ClaimStatus::Submitted),
            "UNDER_REVIEW" => Ok(ClaimStatus::UnderReview),
            "APPROVED" => Ok(ClaimStatus::Approved),
            "REJECTED" => Ok(ClaimStatus::Rejected),
            "CLARIFICATION" => Ok(ClaimStatus::Clarification),
            other => Err(format!("unknown claim status '{}'", other)),
        }
    }
}

/// One claimed service line on a bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillItem {
    pub id: BillItemId,
    pub claim_ref: ClaimRef,
    pub description: String,
    pub claimed_rate: Decimal,
    pub claimed_quantity: u32,
    pub claimed_amount: Decimal,
    pub approved_rate: Option<Decimal>,
    pub approved_quantity: Option<u32>,
    pub approved_amount: Option<Decimal>,
    pub comments: String,
}

impl BillItem {
    /// Creates a claimed line item
    ///
    /// When no explicit (non-zero) amount is supplied the claimed amount is
    /// `rate × quantity`.
    pub fn new(
        claim_ref: ClaimRef,
        description: impl Into<String>,
        claimed_rate: Decimal,
        claimed_quantity: u32,
        claimed_amount: Option<Decimal>,
    ) -> Self {
        let claimed_amount = match claimed_amount {
            Some(amount) if !amount.is_zero() => amount,
            _ => claimed_rate * Decimal::from(claimed_quantity),
        };

        Self {
            id: BillItemId::new_v7(),
            claim_ref,
            description: description.into(),
            claimed_rate,
            claimed_quantity,
            claimed_amount,
            approved_rate: None,
            approved_quantity: None,
            approved_amount: None,
            comments: String::new(),
        }
    }

    /// Rate shown to reviewers
    ///
    /// Bills entered with only a total and quantity carry a zero rate; the
    /// rate is back-derived from the amount for display. Nothing is persisted.
    pub fn display_rate(&self) -> Decimal {
        if self.claimed_rate.is_zero()
            && self.claimed_amount > Decimal::ZERO
            && self.claimed_quantity > 0
        {
            self.claimed_amount / Decimal::from(self.claimed_quantity)
        } else {
            self.claimed_rate
        }
    }

    /// Applies a reviewer's revision to this item
    ///
    /// Malformed numeric fields are skipped and reported; the remaining
    /// fields still apply. Returns whether anything changed.
    pub fn apply_update(&mut self, update: &ItemUpdate, warnings: &mut Vec<FieldWarning>) -> bool {
        let mut changed = false;

        if let Some(comments) = &update.comments {
            self.comments = comments.clone();
            changed = true;
        }

        if let Some(rate) = parse_field(self.id, ItemField::ApprovedRate, &update.approved_rate, parse_amount, warnings) {
            self.approved_rate = Some(rate);
            changed = true;
        }

        if let Some(amount) = parse_field(self.id, ItemField::ApprovedAmount, &update.approved_amount, parse_amount, warnings) {
            self.approved_amount = Some(amount);
            changed = true;
        }

        if let Some(quantity) = parse_field(self.id, ItemField::ApprovedQuantity, &update.approved_quantity, parse_quantity, warnings) {
            self.approved_quantity = Some(quantity);
            changed = true;
        }

        if changed {
            self.derive_approved_amount(warnings);
        }
        changed
    }

    /// Mirrors the claimed-side rule: rate and quantity together fix the amount
    ///
    /// A product outside the decimal range leaves the amount as it was and is
    /// reported against [`ItemField::ApprovedAmount`].
    fn derive_approved_amount(&mut self, warnings: &mut Vec<FieldWarning>) {
        let (Some(rate), Some(quantity)) = (self.approved_rate, self.approved_quantity) else {
            return;
        };

        match rate.checked_mul(Decimal::from(quantity)) {
            Some(amount) => self.approved_amount = Some(amount),
            None => {
                let value = format!("{} x {}", rate, quantity);
                tracing::warn!(item_id = %self.id, value, "Approved amount out of range");
                warnings.push(FieldWarning {
                    item_id: self.id,
                    field: ItemField::ApprovedAmount,
                    value,
                    reason: "amount out of range".to_string(),
                });
            }
        }
    }
}

/// Kind of supporting document attached to a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    IdCard,
    CcCard,
    FinalBill,
    DetailBill,
    Pharmacy,
    Invoice,
    Discharge,
    Other,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::IdCard => "ID_CARD",
            DocumentType::CcCard => "CC_CARD",
            DocumentType::FinalBill => "FINAL_BILL",
            DocumentType::DetailBill => "DETAIL_BILL",
            DocumentType::Pharmacy => "PHARMACY",
            DocumentType::Invoice => "INVOICE",
            DocumentType::Discharge => "DISCHARGE",
            DocumentType::Other => "OTHER",
        }
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ID_CARD" => Ok(DocumentType::IdCard),
            "CC_CARD" => Ok(DocumentType::CcCard),
            "FINAL_BILL" => Ok(DocumentType::FinalBill),
            "DETAIL_BILL" => Ok(DocumentType::DetailBill),
            "PHARMACY" => Ok(DocumentType::Pharmacy),
            "INVOICE" => Ok(DocumentType::Invoice),
            "DISCHARGE" => Ok(DocumentType::Discharge),
            "OTHER" => Ok(DocumentType::Other),
            other => Err(format!("unknown document type '{}'", other)),
        }
    }
}

/// A document attached to a claim, surfaced read-only to reviewers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimDocument {
    pub id: DocumentId,
    pub claim_ref: ClaimRef,
    pub document_type: DocumentType,
    pub file_name: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A reviewer's raw revision for one item
///
/// Numeric fields arrive as entered. `None` or blank means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemUpdate {
    pub item_id: BillItemId,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub approved_rate: Option<String>,
    #[serde(default)]
    pub approved_quantity: Option<String>,
    #[serde(default)]
    pub approved_amount: Option<String>,
}

impl ItemUpdate {
    pub fn for_item(item_id: BillItemId) -> Self {
        Self {
            item_id,
            ..Default::default()
        }
    }

    pub fn comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    pub fn approved_rate(mut self, rate: impl Into<String>) -> Self {
        self.approved_rate = Some(rate.into());
        self
    }

    pub fn approved_quantity(mut self, quantity: impl Into<String>) -> Self {
        self.approved_quantity = Some(quantity.into());
        self
    }

    pub fn approved_amount(mut self, amount: impl Into<String>) -> Self {
        self.approved_amount = Some(amount.into());
        self
    }
}

/// Revisable item field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemField {
    ApprovedRate,
    ApprovedQuantity,
    ApprovedAmount,
    Item,
}

/// A skipped field from a reviewer's item revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldWarning {
    pub item_id: BillItemId,
    pub field: ItemField,
    pub value: String,
    pub reason: String,
}

impl FieldWarning {
    pub fn unknown_item(item_id: BillItemId) -> Self {
        Self {
            item_id,
            field: ItemField::Item,
            value: item_id.to_string(),
            reason: "item does not belong to this claim".to_string(),
        }
    }
}

fn parse_field<T>(
    item_id: BillItemId,
    field: ItemField,
    raw: &Option<String>,
    parse: fn(&str) -> Result<T, String>,
    warnings: &mut Vec<FieldWarning>,
) -> Option<T> {
    let value = raw.as_deref().map(str::trim).filter(|v| !v.is_empty())?;
    match parse(value) {
        Ok(parsed) => Some(parsed),
        Err(reason) => {
            tracing::warn!(item_id = %item_id, ?field, value, %reason, "Skipping malformed item field");
            warnings.push(FieldWarning {
                item_id,
                field,
                value: value.to_string(),
                reason,
            });
            None
        }
    }
}

fn parse_amount(value: &str) -> Result<Decimal, String> {
    let amount = Decimal::from_str(value).map_err(|e| e.to_string())?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err("must not be negative".to_string());
    }
    Ok(amount)
}

fn parse_quantity(value: &str) -> Result<u32, String> {
    value.parse::<u32>().map_err(|e| e.to_string())
}
