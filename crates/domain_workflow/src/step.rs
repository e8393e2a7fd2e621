//! The fixed, ordered sequence of approval steps
//!
//! Steps are loaded once at start-up and shared immutably for the lifetime of
//! the process. Forwarding always moves to the next-higher configured order;
//! there is no way to jump to an arbitrary step.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::actor::RoleName;
use crate::error::WorkflowError;

/// One stage in the approval sequence, bound to exactly one role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Position in the sequence (1 = first); unique across the registry
    pub order: u32,
    /// Display label
    pub name: String,
    /// The single role authorized to act while a request sits at this step
    pub role_name: RoleName,
    /// Whether a reviewer at this step may terminally reject
    #[serde(default)]
    pub can_reject: bool,
    /// Whether a reviewer at this step may terminally approve
    #[serde(default)]
    pub can_approve_final: bool,
}

impl WorkflowStep {
    /// Creates a step with no terminal permissions
    pub fn new(order: u32, name: impl Into<String>, role_name: impl Into<RoleName>) -> Self {
        Self {
            order,
            name: name.into(),
            role_name: role_name.into(),
            can_reject: false,
            can_approve_final: false,
        }
    }

    /// Grants the terminal reject permission
    pub fn with_reject(mut self) -> Self {
        self.can_reject = true;
        self
    }

    /// Grants the terminal approve permission
    pub fn with_final_approval(mut self) -> Self {
        self.can_approve_final = true;
        self
    }
}

/// Ordered, immutable registry of workflow steps
///
/// # Invariants
///
/// - At least one step is configured
/// - Every order is positive and unique
/// - Steps are held sorted by order
#[derive(Debug, Clone)]
pub struct WorkflowStepRegistry {
    steps: Vec<WorkflowStep>,
}

impl WorkflowStepRegistry {
    /// Builds a registry from step definitions in any order
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::InvalidRegistry` if the list is empty, an order
    /// is zero or duplicated, or a step has a blank name or role.
    pub fn new(mut steps: Vec<WorkflowStep>) -> Result<Self, WorkflowError> {
        if steps.is_empty() {
            return Err(WorkflowError::invalid_registry("at least one workflow step is required"));
        }

        let mut seen = HashSet::with_capacity(steps.len());
        for step in &steps {
            if step.order == 0 {
                return Err(WorkflowError::invalid_registry(format!(
                    "step '{}' has order 0; orders start at 1",
                    step.name
                )));
            }
            if !seen.insert(step.order) {
                return Err(WorkflowError::invalid_registry(format!(
                    "step order {} is configured more than once",
                    step.order
                )));
            }
            if step.name.trim().is_empty() {
                return Err(WorkflowError::invalid_registry(format!(
                    "step {} has an empty name",
                    step.order
                )));
            }
            if step.role_name.is_blank() {
                return Err(WorkflowError::invalid_registry(format!(
                    "step {} has an empty role",
                    step.order
                )));
            }
        }

        steps.sort_by_key(|s| s.order);
        Ok(Self { steps })
    }

    /// The step every new request starts at
    pub fn first_step(&self) -> &WorkflowStep {
        // Non-empty by construction
        &self.steps[0]
    }

    /// The step with the smallest order strictly greater than `order`
    pub fn next_step_after(&self, order: u32) -> Option<&WorkflowStep> {
        let idx = self.steps.partition_point(|s| s.order <= order);
        self.steps.get(idx)
    }

    /// Looks up a step by its exact order
    pub fn step(&self, order: u32) -> Option<&WorkflowStep> {
        self.steps
            .binary_search_by_key(&order, |s| s.order)
            .ok()
            .map(|idx| &self.steps[idx])
    }

    /// Looks up a step by order, failing with `NotFound`
    pub fn require_step(&self, order: u32) -> Result<&WorkflowStep, WorkflowError> {
        self.step(order)
            .ok_or_else(|| WorkflowError::not_found("WorkflowStep", order))
    }

    /// All steps bound to `role`, in order
    pub fn steps_for_role(&self, role: &RoleName) -> Vec<&WorkflowStep> {
        self.steps.iter().filter(|s| &s.role_name == role).collect()
    }

    /// Whether `order` is the last configured step
    pub fn is_last(&self, order: u32) -> bool {
        self.steps.last().map(|s| s.order == order).unwrap_or(false)
    }

    /// All steps, in order
    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sparse() -> WorkflowStepRegistry {
        WorkflowStepRegistry::new(vec![
            WorkflowStep::new(5, "Five", "GMM"),
            WorkflowStep::new(1, "One", "JPO"),
            WorkflowStep::new(7, "Seven", "DIRECTOR").with_final_approval(),
            WorkflowStep::new(3, "Three", "AS"),
            WorkflowStep::new(2, "Two", "PO"),
        ])
        .unwrap()
    }

    #[test]
    fn test_steps_are_sorted() {
        let registry = sparse();
        let orders: Vec<u32> = registry.steps().iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![1, 2, 3, 5, 7]);
        assert_eq!(registry.first_step().order, 1);
    }

    #[test]
    fn test_next_step_skips_gaps() {
        let registry = sparse();
        assert_eq!(registry.next_step_after(3).map(|s| s.order), Some(5));
        assert_eq!(registry.next_step_after(5).map(|s| s.order), Some(7));
        assert_eq!(registry.next_step_after(4).map(|s| s.order), Some(5));
        assert!(registry.next_step_after(7).is_none());
    }

    #[test]
    fn test_step_lookup_is_exact() {
        let registry = sparse();
        assert!(registry.step(4).is_none());
        assert_eq!(registry.step(5).map(|s| s.name.as_str()), Some("Five"));
        assert!(registry.is_last(7));
        assert!(!registry.is_last(5));
    }

    #[test]
    fn test_rejects_duplicate_and_zero_orders() {
        let dup = WorkflowStepRegistry::new(vec![
            WorkflowStep::new(1, "A", "JPO"),
            WorkflowStep::new(1, "B", "PO"),
        ]);
        assert!(matches!(dup, Err(WorkflowError::InvalidRegistry(_))));

        let zero = WorkflowStepRegistry::new(vec![WorkflowStep::new(0, "A", "JPO")]);
        assert!(matches!(zero, Err(WorkflowError::InvalidRegistry(_))));

        let empty = WorkflowStepRegistry::new(vec![]);
        assert!(matches!(empty, Err(WorkflowError::InvalidRegistry(_))));
    }
}
