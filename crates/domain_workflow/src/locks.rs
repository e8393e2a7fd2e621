//! Per-request mutual exclusion
//!
//! Actions on the same request run one at a time; actions on different
//! requests never share a lock.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use core_kernel::SanctionRequestId;

/// Keyed async mutex over request ids
#[derive(Debug, Default)]
pub struct RequestLocks {
    locks: Mutex<HashMap<SanctionRequestId, Arc<Mutex<()>>>>,
}

impl RequestLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `id`
    ///
    /// The guard releases the request when dropped.
    pub async fn acquire(&self, id: SanctionRequestId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Entries only referenced by the map have no holder or waiter
            locks.retain(|key, lock| *key == id || Arc::strong_count(lock) > 1);
            locks.entry(id).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Number of requests currently tracked
    pub async fn tracked(&self) -> usize {
        self.locks.lock().await.len()
    }
}
