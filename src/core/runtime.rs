//! Shared handles every stage and worker of one pipeline needs.
//!
//! [`Runtime`] is cloned into each [`Stage`](crate::Stage); [`WorkerGroup`] owns the
//! join handles of every top-level worker so nothing is ever detached.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;

use super::report::WorkerReport;
use crate::events::Bus;
use crate::signal::CancellationSignal;
use crate::stream::Halt;

/// Join handles of the pipeline's top-level workers.
///
/// Fan-in mergers own their replicas' and multiplexers' handles and report them
/// together with their own, hence the `Vec` element type.
#[derive(Clone, Default)]
pub(crate) struct WorkerGroup {
    set: Arc<Mutex<JoinSet<Vec<WorkerReport>>>>,
}

impl WorkerGroup {
    pub(crate) fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = Vec<WorkerReport>> + Send + 'static,
    {
        let mut set = self.set.lock().unwrap_or_else(PoisonError::into_inner);
        set.spawn(fut);
    }

    /// Moves every handle spawned so far out of the group.
    pub(crate) fn take(&self) -> JoinSet<Vec<WorkerReport>> {
        let mut set = self.set.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *set)
    }
}

#[derive(Clone)]
pub(crate) struct Runtime {
    pub(crate) signal: CancellationSignal,
    pub(crate) bus: Bus,
    pub(crate) group: WorkerGroup,
    pub(crate) semaphore: Option<Arc<Semaphore>>,
    pub(crate) buffer: usize,
    pub(crate) worker_limit: Option<usize>,
}

impl Runtime {
    /// Acquires a global concurrency permit, if a limit is configured.
    ///
    /// The wait is raced against the signal.
    pub(crate) async fn permit(&self) -> Result<Option<OwnedSemaphorePermit>, Halt> {
        let Some(sem) = &self.semaphore else {
            return Ok(None);
        };
        tokio::select! {
            biased;
            _ = self.signal.observe() => Err(Halt::Cancelled),
            res = Arc::clone(sem).acquire_owned() => match res {
                Ok(permit) => Ok(Some(permit)),
                Err(_closed) => Err(Halt::Cancelled),
            },
        }
    }
}
