//! Test Utilities Crate
//!
//! Shared test infrastructure for the sanction workflow test suite.
//!
//! # Modules
//!
//! - `fixtures`: the standard seven-step registry, reviewers and bills
//! - `builders`: bill and engine builders with sensible defaults
//! - `database`: PostgreSQL test containers
//! - `assertions`: ledger and request assertions
//! - `generators`: property-based test data generators

pub mod assertions;
pub mod builders;
pub mod database;
pub mod fixtures;
pub mod generators;

pub use assertions::*;
pub use builders::*;
pub use database::*;
pub use fixtures::*;
pub use generators::*;
