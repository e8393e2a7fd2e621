//! Custom Test Assertions
//!
//! Assertions over the approval ledger and request state with messages that
//! name the offending entry.

use rust_decimal::Decimal;

use domain_workflow::{
    ApprovalAction, ApprovalLogEntry, RequestStatus, SanctionRequest, WorkflowStepRegistry,
};

/// Asserts ledger sequences run 1..=n in order and match the request version
pub fn assert_ledger_consistent(request: &SanctionRequest, entries: &[ApprovalLogEntry]) {
    for (index, entry) in entries.iter().enumerate() {
        assert_eq!(
            entry.sequence,
            index as u64 + 1,
            "Ledger entry {} has sequence {}",
            index,
            entry.sequence
        );
        assert_eq!(
            entry.request_id, request.id,
            "Ledger entry {} belongs to {}",
            entry.sequence, entry.request_id
        );
    }
    assert_eq!(
        request.version,
        entries.len() as u64,
        "Request version {} does not match {} ledger entries",
        request.version,
        entries.len()
    );
}

/// Asserts the ledger never moves backwards and every reviewer forward is
/// followed by the next forward at the next configured step
pub fn assert_forward_chain(entries: &[ApprovalLogEntry], registry: &WorkflowStepRegistry) {
    let mut last_step = 0;
    for entry in entries {
        assert!(
            entry.step_order >= last_step,
            "Ledger went backwards from step {} to step {} at sequence {}",
            last_step,
            entry.step_order,
            entry.sequence
        );
        last_step = entry.step_order;
    }

    let forwards: Vec<_> = entries
        .iter()
        .filter(|e| matches!(e.action, ApprovalAction::Forward | ApprovalAction::RejectRecommended))
        .filter(|e| !is_allocation(e))
        .collect();
    for pair in forwards.windows(2) {
        let expected = registry
            .next_step_after(pair[0].step_order)
            .map(|s| s.order);
        assert_eq!(
            Some(pair[1].step_order),
            expected,
            "Forward at sequence {} from step {} was not followed at the next step",
            pair[0].sequence,
            pair[0].step_order
        );
    }
}

/// Allocation entries are recorded as forwards that stay at the same step
pub fn is_allocation(entry: &ApprovalLogEntry) -> bool {
    entry.action == ApprovalAction::Forward && entry.comments.starts_with("Task allocated to ")
}

/// Asserts the request reached `status` and is terminal
pub fn assert_terminal(request: &SanctionRequest, status: RequestStatus) {
    assert_eq!(request.status, status, "Request {} status", request.id);
    assert!(
        request.is_terminal(),
        "Request {} in {} is not terminal",
        request.id,
        request.status
    );
}

/// Asserts an optional amount equals `expected`
pub fn assert_amount(actual: Option<Decimal>, expected: Decimal) {
    assert_eq!(
        actual,
        Some(expected),
        "Expected amount {}, got {:?}",
        expected,
        actual
    );
}
