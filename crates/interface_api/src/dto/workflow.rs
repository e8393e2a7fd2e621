//! Workflow DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::{ClaimRef, ReviewerId, SanctionRequestId};
use domain_workflow::{
    ApprovalAction, ApprovalLogEntry, ItemUpdate, RequestStatus, SanctionRequest,
    WorkflowStepRegistry,
};

#[derive(Debug, Deserialize)]
pub struct SubmitClaimRequest {
    pub claim_ref: ClaimRef,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProcessActionRequest {
    pub action: ApprovalAction,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub comments: Option<String>,
    /// Amount the reviewer states at this step
    pub stated_amount: Option<Decimal>,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub item_updates: Vec<ItemUpdate>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AllocateRequest {
    pub assignee_id: ReviewerId,
    #[validate(length(min = 1, max = 64))]
    pub assignee_role: String,
}

/// A request as listed in queues and dashboards
#[derive(Debug, Serialize, Deserialize)]
pub struct RequestSummary {
    pub id: SanctionRequestId,
    pub claim_ref: ClaimRef,
    pub claimed_amount: Decimal,
    pub sanctioned_amount: Option<Decimal>,
    pub current_step: u32,
    /// Display name of the current step, if it is still configured
    pub current_step_name: Option<String>,
    pub status: RequestStatus,
    pub assigned_to: Option<ReviewerId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RequestSummary {
    pub fn new(request: SanctionRequest, registry: &WorkflowStepRegistry) -> Self {
        Self {
            current_step_name: registry.step(request.current_step).map(|s| s.name.clone()),
            id: request.id,
            claim_ref: request.claim_ref,
            claimed_amount: request.claimed_amount,
            sanctioned_amount: request.sanctioned_amount,
            current_step: request.current_step,
            status: request.status,
            assigned_to: request.assigned_to,
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AllocationResponse {
    pub request: RequestSummary,
    pub entry: ApprovalLogEntry,
}
