//! Sanction request aggregate and its state machine
//!
//! ```text
//! PENDING ──forward──▶ IN_PROGRESS ──forward──▶ IN_PROGRESS ...
//!    │                      │
//!    ├──clarify──▶ CLARIFICATION ◀──clarify──┤
//!    │                      │
//!    └──approve/reject──▶ APPROVED | REJECTED (terminal)
//! ```
//!
//! # Invariants
//!
//! - `current_step` never decreases
//! - A terminal request accepts no further transitions or ledger entries

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{ClaimRef, ReviewerId, SanctionRequestId};

use crate::bill::ClaimStatus;
use crate::error::WorkflowError;
use crate::ledger::ApprovalAction;
use crate::step::{WorkflowStep, WorkflowStepRegistry};

/// Request status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    /// Submitted, at the first step, never forwarded
    Pending,
    /// Forwarded at least once
    InProgress,
    /// Finally approved
    Approved,
    /// Finally rejected
    Rejected,
    /// Waiting on the claimant; resumes only through resubmission
    Clarification,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Approved | RequestStatus::Rejected)
    }

    /// Statuses a reviewer's queue picks up
    pub fn is_reviewable(&self) -> bool {
        matches!(self, RequestStatus::Pending | RequestStatus::InProgress)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::InProgress => "IN_PROGRESS",
            RequestStatus::Approved => "APPROVED",
            RequestStatus::Rejected => "REJECTED",
            RequestStatus::Clarification => "CLARIFICATION",
        }
    }

    pub fn open_statuses() -> Vec<RequestStatus> {
        vec![
            RequestStatus::Pending,
            RequestStatus::InProgress,
            RequestStatus::Clarification,
        ]
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(RequestStatus::Pending),
            "IN_PROGRESS" => Ok(RequestStatus::InProgress),
            "APPROVED" => Ok(RequestStatus::Approved),
            "REJECTED" => Ok(RequestStatus::Rejected),
            "CLARIFICATION" => Ok(RequestStatus::Clarification),
            other => Err(format!("unknown request status '{}'", other)),
        }
    }
}

/// Outcome of a successful state transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transition {
    Approved {
        sanctioned_amount: Option<Decimal>,
    },
    Rejected,
    Forwarded {
        from_step: u32,
        to_step: u32,
        rejection_recommended: bool,
    },
    ClarificationRequested,
}

impl Transition {
    /// Claim status the bill collaborator must be told about
    pub fn claim_status(&self) -> ClaimStatus {
        match self {
            Transition::Approved { .. } => ClaimStatus::Approved,
            Transition::Rejected => ClaimStatus::Rejected,
            Transition::Forwarded { .. } => ClaimStatus::UnderReview,
            Transition::ClarificationRequested => ClaimStatus::Clarification,
        }
    }
}

/// The workflow-tracking entity for one submitted claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanctionRequest {
    pub id: SanctionRequestId,
    /// The claim this request tracks; the engine owns only its amount and identity
    pub claim_ref: ClaimRef,
    /// Amount currently considered claimed, kept equal to the item total
    pub claimed_amount: Decimal,
    /// Set on final approval
    pub sanctioned_amount: Option<Decimal>,
    /// Order of the step the request sits at
    pub current_step: u32,
    pub status: RequestStatus,
    /// `None` means any eligible reviewer may pick it up
    pub assigned_to: Option<ReviewerId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency token; equals the number of ledger entries
    pub version: u64,
}

impl SanctionRequest {
    /// Creates a request for a newly submitted claim at the first step
    pub fn submit(claim_ref: ClaimRef, claimed_amount: Decimal, first_step: &WorkflowStep) -> Self {
        let now = Utc::now();
        Self {
            id: SanctionRequestId::new_v7(),
            claim_ref,
            claimed_amount,
            sanctioned_amount: None,
            current_step: first_step.order,
            status: RequestStatus::Pending,
            assigned_to: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Fails with `AlreadyTerminal` once a final decision exists
    pub fn ensure_open(&self) -> Result<(), WorkflowError> {
        if self.is_terminal() {
            return Err(WorkflowError::AlreadyTerminal(self.id, self.status));
        }
        Ok(())
    }

    /// Whether `reviewer` may pick this request up given its assignment
    pub fn is_available_to(&self, reviewer: ReviewerId) -> bool {
        self.assigned_to.map_or(true, |assignee| assignee == reviewer)
    }

    /// Replaces the stored claimed amount with `total` when they differ
    ///
    /// Returns the previous amount if a correction was made.
    pub fn reconcile_claimed_amount(&mut self, total: Decimal) -> Option<Decimal> {
        if self.claimed_amount == total {
            return None;
        }
        let previous = self.claimed_amount;
        self.claimed_amount = total;
        Some(previous)
    }

    /// Drives the state machine for one reviewer action
    ///
    /// On error the request is left untouched.
    ///
    /// # Errors
    ///
    /// - `AlreadyTerminal` if a final decision exists
    /// - `Unauthorized` if the current step lacks the terminal permission
    /// - `NoNextStep` when forwarding from the last configured step
    pub fn apply(
        &mut self,
        action: ApprovalAction,
        stated_amount: Option<Decimal>,
        registry: &WorkflowStepRegistry,
    ) -> Result<Transition, WorkflowError> {
        self.ensure_open()?;
        let step = registry.require_step(self.current_step)?;

        let transition = match action {
            ApprovalAction::Approve => {
                if !step.can_approve_final {
                    return Err(WorkflowError::unauthorized(format!(
                        "step '{}' does not permit final approval",
                        step.name
                    )));
                }
                self.status = RequestStatus::Approved;
                self.sanctioned_amount = stated_amount;
                Transition::Approved {
                    sanctioned_amount: stated_amount,
                }
            }
            ApprovalAction::Reject => {
                if !step.can_reject {
                    return Err(WorkflowError::unauthorized(format!(
                        "step '{}' does not permit rejection",
                        step.name
                    )));
                }
                self.status = RequestStatus::Rejected;
                Transition::Rejected
            }
            ApprovalAction::Forward | ApprovalAction::RejectRecommended => {
                let next = registry
                    .next_step_after(step.order)
                    .ok_or(WorkflowError::NoNextStep(step.order))?;
                let from_step = self.current_step;
                self.current_step = next.order;
                self.status = RequestStatus::InProgress;
                self.assigned_to = None;
                Transition::Forwarded {
                    from_step,
                    to_step: next.order,
                    rejection_recommended: action == ApprovalAction::RejectRecommended,
                }
            }
            ApprovalAction::Clarify => {
                self.status = RequestStatus::Clarification;
                Transition::ClarificationRequested
            }
        };

        Ok(transition)
    }

    /// Hands the request to a specific reviewer without moving it
    pub fn assign(&mut self, reviewer: ReviewerId) -> Result<(), WorkflowError> {
        self.ensure_open()?;
        self.assigned_to = Some(reviewer);
        Ok(())
    }

    /// Advances the concurrency token ahead of a commit
    pub(crate) fn bump_version(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn registry() -> WorkflowStepRegistry {
        WorkflowStepRegistry::new(vec![
            WorkflowStep::new(1, "Scrutiny", "JPO"),
            WorkflowStep::new(2, "Review", "PO").with_reject(),
            WorkflowStep::new(3, "Sanction", "DIRECTOR").with_reject().with_final_approval(),
        ])
        .unwrap()
    }

    fn request(registry: &WorkflowStepRegistry) -> SanctionRequest {
        SanctionRequest::submit(ClaimRef::new(), dec!(10000), registry.first_step())
    }

    #[test]
    fn test_submit_starts_pending_at_first_step() {
        let registry = registry();
        let request = request(&registry);
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.current_step, 1);
        assert_eq!(request.assigned_to, None);
        assert_eq!(request.version, 0);
    }

    #[test]
    fn test_forward_clears_assignment() {
        let registry = registry();
        let mut request = request(&registry);
        request.assign(ReviewerId::new()).unwrap();

        let transition = request.apply(ApprovalAction::Forward, None, &registry).unwrap();

        assert_eq!(
            transition,
            Transition::Forwarded { from_step: 1, to_step: 2, rejection_recommended: false }
        );
        assert_eq!(request.status, RequestStatus::InProgress);
        assert_eq!(request.assigned_to, None);
    }

    #[test]
    fn test_approve_without_permission_leaves_state() {
        let registry = registry();
        let mut request = request(&registry);
        let before = request.clone();

        let result = request.apply(ApprovalAction::Approve, Some(dec!(9000)), &registry);

        assert!(matches!(result, Err(WorkflowError::Unauthorized(_))));
        assert_eq!(request, before);
    }

    #[test]
    fn test_forward_from_last_step_fails() {
        let registry = registry();
        let mut request = request(&registry);
        request.apply(ApprovalAction::Forward, None, &registry).unwrap();
        request.apply(ApprovalAction::RejectRecommended, None, &registry).unwrap();

        let result = request.apply(ApprovalAction::Forward, None, &registry);
        assert!(matches!(result, Err(WorkflowError::NoNextStep(3))));
        assert_eq!(request.current_step, 3);
    }

    #[test]
    fn test_clarify_keeps_step() {
        let registry = registry();
        let mut request = request(&registry);
        let transition = request.apply(ApprovalAction::Clarify, None, &registry).unwrap();

        assert_eq!(transition.claim_status(), ClaimStatus::Clarification);
        assert_eq!(request.status, RequestStatus::Clarification);
        assert_eq!(request.current_step, 1);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let registry = registry();
        let mut request = request(&registry);
        request.claimed_amount = dec!(0);

        assert_eq!(request.reconcile_claimed_amount(dec!(10000)), Some(dec!(0)));
        assert_eq!(request.reconcile_claimed_amount(dec!(10000)), None);
        assert_eq!(request.claimed_amount, dec!(10000));
    }
}
