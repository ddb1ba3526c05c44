use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::server::session::Session;
use crate::shell::Interpreter;

/// Process-wide worker counter, used for naming only.
static WORKER_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Identity of a session worker, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(u64);

impl WorkerId {
    fn next() -> Self {
        WorkerId(WORKER_SEQUENCE.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Runs one [`Session`] on its own task.
///
/// The running task holds the only strong reference to the worker's
/// cancellation token. [`WorkerHandle`]s hold weak references, so once the
/// task finishes every handle observes the worker as gone.
pub struct SessionWorker<I: Interpreter> {
    id: WorkerId,
    name: Arc<str>,
    cancel_token: Arc<CancellationToken>,
    session: Session<I>,
}

impl<I: Interpreter> SessionWorker<I> {
    pub fn new(session: Session<I>) -> Self {
        let id = WorkerId::next();
        Self {
            id,
            name: format!("shell-client-{}", id).into(),
            cancel_token: Arc::new(CancellationToken::new()),
            session,
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a non-owning handle to this worker.
    pub fn handle(&self) -> WorkerHandle {
        WorkerHandle {
            id: self.id,
            name: Arc::clone(&self.name),
            cancel_token: Arc::downgrade(&self.cancel_token),
        }
    }

    /// Spawns the session's service loop and returns immediately.
    pub fn start(self) -> JoinHandle<()> {
        let SessionWorker {
            name,
            cancel_token,
            mut session,
            ..
        } = self;

        tokio::spawn(async move {
            let peer = session.peer();
            match session.run(cancel_token.as_ref().clone()).await {
                Ok(()) => debug!(worker = %name, peer = %peer, "worker finished"),
                Err(e) => warn!(worker = %name, peer = %peer, error = %e, "session failed"),
            }
            // Close the socket before the worker stops counting as alive.
            drop(session);
            drop(cancel_token);
        })
    }
}

/// Weak reference to a [`SessionWorker`], as tracked by the registry.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    id: WorkerId,
    name: Arc<str>,
    cancel_token: Weak<CancellationToken>,
}

impl WorkerHandle {
    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the worker has not yet finished (or has not yet started).
    pub fn is_alive(&self) -> bool {
        self.cancel_token.strong_count() > 0
    }

    /// Signals the worker to stop.
    ///
    /// Idempotent, and a no-op for a worker that already finished. Returns
    /// whether the worker was still alive.
    pub fn kill(&self) -> bool {
        match self.cancel_token.upgrade() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}
