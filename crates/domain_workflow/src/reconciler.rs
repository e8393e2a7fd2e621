//! Claimed-amount reconciliation
//!
//! A request's stored claimed amount can drift from its bill items (items
//! edited after submission, or a request created before the items were
//! entered). The item total always wins.

use rust_decimal::Decimal;

use crate::bill::BillItem;
use crate::ledger::ApprovalLedger;
use crate::request::SanctionRequest;

/// A correction applied to a request's stored claimed amount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountCorrection {
    pub previous: Decimal,
    pub corrected: Decimal,
}

/// Stateless amount rules shared by the engine and the detail view
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimAmountReconciler;

impl ClaimAmountReconciler {
    /// Sum of the claimed amounts of every item
    pub fn reconcile_claimed_total(items: &[BillItem]) -> Decimal {
        items.iter().map(|item| item.claimed_amount).sum()
    }

    /// Amount a reviewer should start from
    ///
    /// The most recent stated amount in the ledger carries forward; with no
    /// stated amount yet, reviewers start from the claimed total.
    pub fn suggested_amount(ledger: &ApprovalLedger, total: Decimal) -> Decimal {
        ledger
            .latest_stated()
            .and_then(|entry| entry.approved_amount_at_stage)
            .unwrap_or(total)
    }

    /// Brings the request's stored amount in line with its items
    ///
    /// Returns `None` when no correction was needed.
    pub fn heal(request: &mut SanctionRequest, items: &[BillItem]) -> Option<AmountCorrection> {
        let total = Self::reconcile_claimed_total(items);
        request
            .reconcile_claimed_amount(total)
            .map(|previous| AmountCorrection {
                previous,
                corrected: total,
            })
    }
}
