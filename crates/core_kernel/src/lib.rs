//! Core Kernel - Foundational types shared by the sanction workflow crates
//!
//! This crate provides the building blocks used across the workspace:
//! - Strongly typed identifiers for requests, claims, items and reviewers
//! - Port infrastructure (errors, marker traits, health checks) for adapters

pub mod identifiers;
pub mod ports;

pub use identifiers::{
    SanctionRequestId, ClaimRef, BillItemId, ReviewerId, LogEntryId, DocumentId,
};
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
    OperationMetadata,
};
