//! Sanction Workflow Domain
//!
//! This crate routes medical-bill reimbursement claims through a fixed,
//! ordered sequence of approval steps, each bound to one organizational
//! role, until a final approval or rejection.
//!
//! # Components
//!
//! - **`WorkflowStepRegistry`**: the immutable, ordered step list
//! - **`ClaimAmountReconciler`**: the authoritative claimed total and the
//!   amount each reviewer starts from
//! - **`ApprovalLedger`**: append-only history of every action
//! - **`SanctionRequest`**: the per-claim state machine
//! - **`TaskAllocator`**: administrative assignment within a step's role
//! - **`SanctionEngine`**: the service tying these to the store and claim ports
//!
//! # Examples
//!
//! ```rust
//! use core_kernel::ClaimRef;
//! use domain_workflow::{
//!     ApprovalAction, RequestStatus, SanctionRequest, WorkflowStep, WorkflowStepRegistry,
//! };
//! use rust_decimal_macros::dec;
//!
//! let registry = WorkflowStepRegistry::new(vec![
//!     WorkflowStep::new(1, "Scrutiny", "JPO"),
//!     WorkflowStep::new(2, "Sanction", "DIRECTOR").with_reject().with_final_approval(),
//! ])
//! .unwrap();
//!
//! let mut request = SanctionRequest::submit(ClaimRef::new(), dec!(10000), registry.first_step());
//! request.apply(ApprovalAction::Forward, Some(dec!(9000)), &registry).unwrap();
//! request.apply(ApprovalAction::Approve, Some(dec!(8500)), &registry).unwrap();
//!
//! assert_eq!(request.status, RequestStatus::Approved);
//! assert_eq!(request.sanctioned_amount, Some(dec!(8500)));
//! ```

pub mod actor;
pub mod allocation;
pub mod bill;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod locks;
pub mod ports;
pub mod queue;
pub mod reconciler;
pub mod request;
pub mod step;

pub use actor::{ReviewerRef, RoleName};
pub use allocation::{Allocation, TaskAllocator};
pub use bill::{
    BillItem, ClaimDocument, ClaimStatus, DocumentType, FieldWarning, ItemField, ItemUpdate,
};
pub use engine::{ItemView, ProcessCommand, ProcessOutcome, RequestDetail, SanctionEngine};
pub use error::WorkflowError;
pub use ledger::{ApprovalAction, ApprovalLedger, ApprovalLogEntry};
pub use locks::RequestLocks;
pub use ports::{ActionCommit, ClaimPort, RequestQuery, SanctionStore};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::{InMemorySanctionStore, MockClaimPort};
pub use queue::QueueFilter;
pub use reconciler::{AmountCorrection, ClaimAmountReconciler};
pub use request::{RequestStatus, SanctionRequest, Transition};
pub use step::{WorkflowStep, WorkflowStepRegistry};
