//! Administrative task allocation
//!
//! An allocator hands a request to a named reviewer within the role of its
//! current step. Allocation never moves the request; it is recorded in the
//! ledger as a `FORWARD` entry without a stated amount.

use std::sync::Arc;

use tracing::{info, warn};

use core_kernel::SanctionRequestId;

use crate::actor::{ReviewerRef, RoleName};
use crate::error::WorkflowError;
use crate::ledger::{ApprovalAction, ApprovalLogEntry};
use crate::locks::RequestLocks;
use crate::ports::{ActionCommit, SanctionStore};
use crate::request::SanctionRequest;
use crate::step::WorkflowStepRegistry;

/// Result of a successful allocation
#[derive(Debug, Clone)]
pub struct Allocation {
    pub request: SanctionRequest,
    pub entry: ApprovalLogEntry,
}

/// Assigns requests to individual reviewers
#[derive(Clone)]
pub struct TaskAllocator {
    registry: Arc<WorkflowStepRegistry>,
    store: Arc<dyn SanctionStore>,
    locks: Arc<RequestLocks>,
    allocator_role: RoleName,
}

impl TaskAllocator {
    pub fn new(
        registry: Arc<WorkflowStepRegistry>,
        store: Arc<dyn SanctionStore>,
        locks: Arc<RequestLocks>,
        allocator_role: RoleName,
    ) -> Self {
        Self {
            registry,
            store,
            locks,
            allocator_role,
        }
    }

    pub fn allocator_role(&self) -> &RoleName {
        &self.allocator_role
    }

    /// Assigns `assignee` to the request on behalf of `admin`
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if `admin` does not hold the allocator role
    /// - `NotFound` if the request does not exist
    /// - `AlreadyTerminal` if the request is finally decided
    /// - `InvalidAssignee` if the assignee's role is not the current step's role
    /// - `ConcurrentModification` if the request changed underneath
    pub async fn allocate(
        &self,
        request_id: SanctionRequestId,
        assignee: &ReviewerRef,
        admin: &ReviewerRef,
    ) -> Result<Allocation, WorkflowError> {
        if !admin.has_role(&self.allocator_role) {
            warn!(request_id = %request_id, admin = %admin, "Allocation attempted without allocator role");
            return Err(WorkflowError::unauthorized(format!(
                "role {} may not allocate tasks",
                admin.role
            )));
        }

        let _guard = self.locks.acquire(request_id).await;

        let mut request = self
            .store
            .get_request(request_id)
            .await
            .map_err(|e| WorkflowError::from_port("SanctionRequest", request_id, e))?;
        request.ensure_open()?;

        let step = self.registry.require_step(request.current_step)?;
        if !assignee.has_role(&step.role_name) {
            return Err(WorkflowError::InvalidAssignee(format!(
                "{} cannot be assigned at step '{}', which requires role {}",
                assignee, step.name, step.role_name
            )));
        }

        let expected_version = request.version;
        request.assign(assignee.id)?;
        request.bump_version();

        let entry = ApprovalLogEntry::record(
            &request,
            step.order,
            admin.id,
            ApprovalAction::Forward,
            format!("Task allocated to {} by {}.", assignee.id, admin.role),
            None,
        );

        self.store
            .commit(ActionCommit {
                request: request.clone(),
                expected_version,
                entry: entry.clone(),
            })
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    WorkflowError::ConcurrentModification(request_id)
                } else {
                    WorkflowError::from_port("SanctionRequest", request_id, e)
                }
            })?;

        info!(
            request_id = %request_id,
            step = step.order,
            assignee = %assignee.id,
            admin = %admin.id,
            "Task allocated"
        );

        Ok(Allocation { request, entry })
    }
}
