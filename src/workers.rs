//! Bounded pool of request workers.

use std::sync::Arc;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Caps concurrent request tasks and lets shutdown wait for them.
///
/// Each spawned task holds one permit until it has replied.
#[derive(Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    size: u32,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        let size = u32::try_from(workers.max(1)).unwrap_or(u32::MAX);
        Self {
            semaphore: Arc::new(Semaphore::new(size as usize)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size as usize
    }

    /// Wait for a free worker slot.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, AcquireError> {
        self.semaphore.clone().acquire_owned().await
    }

    /// Wait until every in-flight task has released its permit.
    ///
    /// The pool is closed afterwards; later `acquire` calls fail.
    pub async fn drain(&self) -> Result<(), AcquireError> {
        let all = self.semaphore.acquire_many(self.size).await?;
        all.forget();
        self.semaphore.close();
        Ok(())
    }

    /// Tasks currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.size as usize - self.semaphore.available_permits()
    }
}
