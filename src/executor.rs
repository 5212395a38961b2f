//! Bounded executor handle for parallel task groups.
//!
//! The engine only consumes a narrow interface: acquire a slot (which
//! blocks under backpressure rather than failing), and shut down. The
//! actual workers are tokio tasks spawned by the group; the executor
//! bounds how many of them run at once.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::DumpError;

/// Bounded, backpressured admission control for concurrent child tasks.
pub struct Executor {
    semaphore: Arc<Semaphore>,
    workers: usize,
}

impl Executor {
    /// An executor admitting at most `workers` concurrent children.
    /// A bound of zero is treated as one.
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Wait for an execution slot. Submission backpressure is applied
    /// here: excess submissions block instead of failing or queueing
    /// unboundedly.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, DumpError> {
        Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| DumpError::Executor("executor has been shut down".into()))
    }

    /// Stop admitting new work. Already-admitted children keep their
    /// permits and run to completion.
    pub fn shutdown(&self) {
        self.semaphore.close();
    }
}
