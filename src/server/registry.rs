use std::collections::BTreeMap;

use parking_lot::Mutex;
use tracing::debug;

use crate::server::worker::{SessionWorker, WorkerHandle, WorkerId};
use crate::shell::Interpreter;

/// A registry of running session workers.
///
/// Used for mass termination and diagnostics only. Membership is weak: an
/// entry never keeps its worker alive, and workers that finish on their own
/// are not unregistered. Stale entries are pruned when the next worker is
/// launched and skipped by [`kill_all`](Registry::kill_all).
///
/// Launching and killing share one lock, so a worker is always tracked
/// before it starts and a concurrent sweep sees it either fully registered
/// or not at all.
#[derive(Debug, Default)]
pub struct Registry {
    workers: Mutex<BTreeMap<WorkerId, WorkerHandle>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `worker` and then starts it.
    pub fn launch<I: Interpreter>(&self, worker: SessionWorker<I>) {
        let mut workers = self.workers.lock();
        workers.retain(|_, handle| handle.is_alive());

        let handle = worker.handle();
        workers.insert(handle.id(), handle);
        // Detached; the worker reports its own outcome.
        drop(worker.start());
    }

    /// Signals every live worker to stop and clears the registry.
    ///
    /// Returns the number of workers that were still alive. Workers launched
    /// afterwards are unaffected.
    pub fn kill_all(&self) -> usize {
        let mut workers = self.workers.lock();
        let mut killed = 0;
        for handle in workers.values() {
            if handle.kill() {
                debug!(worker = %handle.name(), "worker killed");
                killed += 1;
            }
        }
        workers.clear();
        killed
    }

    /// Number of tracked workers that are still alive.
    pub fn len(&self) -> usize {
        self.workers
            .lock()
            .values()
            .filter(|handle| handle.is_alive())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of live workers, oldest first.
    pub fn names(&self) -> Vec<String> {
        self.workers
            .lock()
            .values()
            .filter(|handle| handle.is_alive())
            .map(|handle| handle.name().to_string())
            .collect()
    }
}
