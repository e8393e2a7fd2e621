//! Workflow domain errors

use thiserror::Error;

use core_kernel::{BillItemId, ClaimRef, PortError, SanctionRequestId};

use crate::bill::ClaimStatus;
use crate::request::RequestStatus;

/// Errors that can occur in the sanction workflow
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Sanction request {0} is already {1}")]
    AlreadyTerminal(SanctionRequestId, RequestStatus),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("No workflow step is configured after step {0}")]
    NoNextStep(u32),

    #[error("Invalid assignee: {0}")]
    InvalidAssignee(String),

    #[error("Claim {claim_ref} already has sanction request {existing}")]
    DuplicateRequest {
        claim_ref: ClaimRef,
        existing: SanctionRequestId,
    },

    #[error("Sanction request {0} was modified concurrently")]
    ConcurrentModification(SanctionRequestId),

    #[error("Invalid workflow configuration: {0}")]
    InvalidRegistry(String),

    #[error("Decision on {request_id} is committed but claim status {status} could not be set: {source}")]
    NotificationFailed {
        request_id: SanctionRequestId,
        status: ClaimStatus,
        #[source]
        source: PortError,
    },

    #[error("Decision on {request_id} is committed but item {item_id} could not be saved: {source}")]
    ItemSaveFailed {
        request_id: SanctionRequestId,
        item_id: BillItemId,
        #[source]
        source: PortError,
    },

    #[error(transparent)]
    Port(#[from] PortError),
}

impl WorkflowError {
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        WorkflowError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        WorkflowError::Unauthorized(message.into())
    }

    pub fn invalid_registry(message: impl Into<String>) -> Self {
        WorkflowError::InvalidRegistry(message.into())
    }

    /// Maps a port error for a specific entity, keeping not-found distinct
    pub(crate) fn from_port(entity: &'static str, id: impl std::fmt::Display, error: PortError) -> Self {
        if error.is_not_found() {
            WorkflowError::not_found(entity, id)
        } else {
            WorkflowError::Port(error)
        }
    }
}
