//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the sanction workflow using SQLx.
//!
//! # Architecture
//!
//! - [`repositories`]: SQL and row types, one repository per table group
//! - [`adapters`]: implementations of the `SanctionStore` and `ClaimPort`
//!   ports, translating rows into domain types
//! - [`pool`]: connection pool configuration and embedded migrations
//!
//! # Approval Ledger
//!
//! The `approval_log` table is append-only; a trigger rejects `UPDATE` and
//! `DELETE`. A request update and its ledger row are written in one
//! transaction guarded by the request's version.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresSanctionStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/sanction")).await?;
//! run_migrations(&pool).await?;
//! let store = PostgresSanctionStore::new(pool);
//! ```

pub mod adapters;
pub mod error;
pub mod pool;
pub mod repositories;

pub use adapters::{sync_registry, PostgresClaimAdapter, PostgresSanctionStore};
pub use error::DatabaseError;
pub use pool::{create_pool, create_pool_from_url, run_migrations, DatabaseConfig, DatabasePool};
