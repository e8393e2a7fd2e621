//! Property-Based Test Generators
//!
//! Proptest strategies that respect the workflow invariants: step orders are
//! positive and unique, amounts are non-negative with at most two decimals.

use proptest::collection::{btree_set, vec};
use proptest::prelude::*;
use rust_decimal::Decimal;

use core_kernel::ClaimRef;
use domain_workflow::{ApprovalAction, BillItem, WorkflowStep, WorkflowStepRegistry};

/// Strategy for sets of distinct positive step orders (possibly sparse)
pub fn step_orders_strategy(max_steps: usize) -> impl Strategy<Value = Vec<u32>> {
    btree_set(1u32..1_000, 1..=max_steps).prop_map(|set| set.into_iter().collect())
}

/// Strategy for valid registries; the highest step may approve and reject
pub fn registry_strategy(max_steps: usize) -> impl Strategy<Value = WorkflowStepRegistry> {
    step_orders_strategy(max_steps).prop_map(|orders| {
        let last = orders.last().copied().unwrap_or(1);
        let steps = orders
            .into_iter()
            .map(|order| {
                let step = WorkflowStep::new(order, format!("Step {}", order), format!("ROLE_{}", order));
                if order == last {
                    step.with_reject().with_final_approval()
                } else {
                    step
                }
            })
            .collect();
        WorkflowStepRegistry::new(steps).expect("generated orders are unique and positive")
    })
}

/// Strategy for money amounts from 0.00 to 1,000,000.00
pub fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000i64).prop_map(|minor| Decimal::new(minor, 2))
}

/// Strategy for the amount a reviewer may or may not state
pub fn stated_amount_strategy() -> impl Strategy<Value = Option<Decimal>> {
    prop::option::of(amount_strategy())
}

/// Strategy for a bill of up to `max_items` items on one claim
pub fn bill_items_strategy(max_items: usize) -> impl Strategy<Value = Vec<BillItem>> {
    let claim_ref = ClaimRef::new();
    vec((amount_strategy(), 0u32..20), 0..=max_items).prop_map(move |lines| {
        lines
            .into_iter()
            .enumerate()
            .map(|(i, (rate, quantity))| {
                BillItem::new(claim_ref, format!("Line {}", i + 1), rate, quantity, None)
            })
            .collect()
    })
}

/// Strategy for any reviewer action
pub fn action_strategy() -> impl Strategy<Value = ApprovalAction> {
    prop_oneof![
        Just(ApprovalAction::Forward),
        Just(ApprovalAction::Approve),
        Just(ApprovalAction::Reject),
        Just(ApprovalAction::RejectRecommended),
        Just(ApprovalAction::Clarify),
    ]
}

/// Strategy for actions that never end the workflow
pub fn non_terminal_action_strategy() -> impl Strategy<Value = ApprovalAction> {
    prop_oneof![
        Just(ApprovalAction::Forward),
        Just(ApprovalAction::RejectRecommended),
        Just(ApprovalAction::Clarify),
    ]
}
