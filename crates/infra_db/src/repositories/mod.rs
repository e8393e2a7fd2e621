//! Repository implementations
//!
//! Repositories encapsulate SQL and map rows to plain row structs; the
//! adapters in [`crate::adapters`] translate those rows into domain types.
//!
//! Every repository follows these principles:
//! - Runtime-checked queries (`sqlx::query` / `query_as` with `FromRow`)
//! - Transactions for multi-statement writes
//! - Optimistic concurrency control on sanction requests

pub mod bills;
pub mod sanction;
pub mod steps;

pub use bills::{BillDocumentRow, BillItemRow, BillRepository};
pub use sanction::{ApprovalLogRow, SanctionRepository, SanctionRequestRow};
pub use steps::{StepRepository, WorkflowStepRow};
