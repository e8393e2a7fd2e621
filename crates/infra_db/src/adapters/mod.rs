//! Domain Adapters
//!
//! Adapter implementations of the workflow ports on top of the repository
//! layer. Each adapter:
//! - Implements a port trait from `domain_workflow`
//! - Translates between domain models and database row types
//! - Maps `DatabaseError` into `PortError`
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::{PostgresClaimAdapter, PostgresSanctionStore};
//! use domain_workflow::SanctionStore;
//!
//! let store = PostgresSanctionStore::new(pool.clone());
//! let claims = PostgresClaimAdapter::new(pool);
//! let request = store.get_request(request_id).await?;
//! ```

pub mod claims;
pub mod sanction;
pub mod steps;

pub use claims::PostgresClaimAdapter;
pub use sanction::PostgresSanctionStore;
pub use steps::sync_registry;
