//! Reviewer work queues

use core_kernel::ReviewerId;

use crate::actor::ReviewerRef;
use crate::ports::RequestQuery;
use crate::request::{RequestStatus, SanctionRequest};
use crate::step::WorkflowStepRegistry;

/// Selects the requests a reviewer may pick up
///
/// A request qualifies when it sits at a step bound to the reviewer's role,
/// is `PENDING` or `IN_PROGRESS`, and is either unassigned or assigned to
/// the reviewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueFilter {
    step_orders: Vec<u32>,
    reviewer: ReviewerId,
}

impl QueueFilter {
    /// Builds the filter for `actor`, or `None` if no step is bound to their role
    pub fn for_actor(registry: &WorkflowStepRegistry, actor: &ReviewerRef) -> Option<Self> {
        let step_orders: Vec<u32> = registry
            .steps_for_role(&actor.role)
            .into_iter()
            .map(|s| s.order)
            .collect();

        if step_orders.is_empty() {
            return None;
        }

        Some(Self {
            step_orders,
            reviewer: actor.id,
        })
    }

    pub fn step_orders(&self) -> &[u32] {
        &self.step_orders
    }

    /// Store query narrowing candidates by step and status
    pub fn query(&self) -> RequestQuery {
        RequestQuery::at_steps(self.step_orders.clone())
            .with_statuses(vec![RequestStatus::Pending, RequestStatus::InProgress])
    }

    pub fn admits(&self, request: &SanctionRequest) -> bool {
        self.step_orders.contains(&request.current_step)
            && request.status.is_reviewable()
            && request.is_available_to(self.reviewer)
    }

    /// Keeps admitted requests, oldest first
    pub fn apply(&self, requests: Vec<SanctionRequest>) -> Vec<SanctionRequest> {
        let mut queue: Vec<_> = requests.into_iter().filter(|r| self.admits(r)).collect();
        queue.sort_by_key(|r| r.created_at);
        queue
    }
}
