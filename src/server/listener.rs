use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::server::error::{AcceptFailure, AcceptorError, StopReason};
use crate::server::registry::Registry;
use crate::server::session::Session;
use crate::server::worker::SessionWorker;
use crate::shell::Interpreter;

/// TCP acceptor serving one interpreter session per connection.
///
/// Owns the listening socket. Each accepted connection becomes a
/// [`SessionWorker`] that is registered and then started on its own task.
/// When the accept loop ends, for whatever reason, every tracked worker is
/// killed and the listening socket is closed.
pub struct Acceptor<I: Interpreter> {
    listener: TcpListener,
    local_addr: SocketAddr,
    accept_timeout: Duration,
    registry: Arc<Registry>,
    shutdown: CancellationToken,
    stopped: CancellationToken,
    interpreter: Arc<I>,
    startup_scripts: Arc<[String]>,
}

impl<I: Interpreter> Acceptor<I> {
    /// Validates `config` and binds the configured port on all interfaces.
    pub async fn start(config: &ServerConfig, interpreter: Arc<I>) -> Result<Self, AcceptorError> {
        let port = config.validate()?;
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map_err(|source| AcceptorError::Bind { port, source })?;
        Self::from_listener(listener, config, interpreter)
    }

    /// Creates an acceptor on an already bound listener.
    ///
    /// `config.port` is ignored.
    pub fn from_listener(
        listener: TcpListener,
        config: &ServerConfig,
        interpreter: Arc<I>,
    ) -> Result<Self, AcceptorError> {
        config.validate_timing()?;
        let local_addr = listener.local_addr().map_err(AcceptorError::Listener)?;
        Ok(Self {
            listener,
            local_addr,
            accept_timeout: config.accept_timeout,
            registry: Arc::new(Registry::new()),
            shutdown: CancellationToken::new(),
            stopped: CancellationToken::new(),
            interpreter,
            startup_scripts: config.startup_scripts.clone().into(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns an administrative handle that outlives [`run`](Self::run).
    pub fn handle(&self) -> AcceptorHandle {
        AcceptorHandle {
            local_addr: self.local_addr,
            registry: Arc::clone(&self.registry),
            shutdown: self.shutdown.clone(),
            stopped: self.stopped.clone(),
        }
    }

    /// Runs the accept loop on its own task.
    pub fn spawn(self) -> JoinHandle<StopReason> {
        tokio::spawn(self.run())
    }

    /// Accepts connections until shutdown or a fatal listener error, then
    /// tears everything down.
    ///
    /// Returns why the loop stopped. Teardown has completed by then.
    pub async fn run(self) -> StopReason {
        info!(addr = %self.local_addr, "shell server started");

        let reason = self.accept_loop().await;
        match &reason {
            StopReason::Shutdown => info!("stopping shell server: {}", reason),
            _ => error!(error = %reason, "stopping shell server"),
        }

        let Acceptor {
            listener,
            registry,
            stopped,
            ..
        } = self;

        let killed = registry.kill_all();
        debug!(killed, "terminated client workers");
        close_quietly(listener);

        stopped.cancel();
        info!("shell server stopped");
        reason
    }

    async fn accept_loop(&self) -> StopReason {
        while !self.shutdown.is_cancelled() {
            match tokio::time::timeout(self.accept_timeout, self.listener.accept()).await {
                Ok(Ok((socket, peer))) => self.admit(socket, peer),
                Err(_elapsed) => {
                    // No client within the timeout; re-check shutdown.
                    tokio::task::yield_now().await;
                }
                Ok(Err(e)) => match AcceptFailure::classify(&e) {
                    AcceptFailure::Connection => {
                        debug!(error = %e, "pending connection failed before accept");
                    }
                    AcceptFailure::Listener => return StopReason::ListenerFailure(e),
                    AcceptFailure::Unexpected => return StopReason::Unexpected(e),
                },
            }
        }
        StopReason::Shutdown
    }

    fn admit(&self, socket: TcpStream, peer: SocketAddr) {
        debug!(peer = %peer, "client accepted");

        let session = Session::new(
            socket,
            peer,
            Arc::clone(&self.interpreter),
            Arc::clone(&self.startup_scripts),
        );
        let worker = SessionWorker::new(session);
        let name = worker.name().to_string();
        self.registry.launch(worker);

        debug!(worker = %name, peer = %peer, "worker started");
    }
}

/// Closes the listening socket, logging instead of propagating failure.
fn close_quietly(listener: TcpListener) {
    match listener.into_std() {
        Ok(listener) => drop(listener),
        Err(e) => warn!(error = %e, "error while closing listening socket"),
    }
}

/// Administrative controls for a running [`Acceptor`].
///
/// Cheap to clone; safe to use from any task or thread.
#[derive(Debug, Clone)]
pub struct AcceptorHandle {
    local_addr: SocketAddr,
    registry: Arc<Registry>,
    shutdown: CancellationToken,
    stopped: CancellationToken,
}

impl AcceptorHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Requests the accept loop to stop.
    ///
    /// Idempotent and non-blocking. The loop notices within one accept
    /// timeout; use [`stopped`](Self::stopped) to wait for teardown.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Signals every live client worker to stop and clears the registry.
    ///
    /// Safe while the accept loop is running; clients accepted afterwards
    /// are unaffected. Returns the number of workers signalled.
    pub fn kill_all_clients(&self) -> usize {
        let killed = self.registry.kill_all();
        info!(killed, "killed all shell clients");
        killed
    }

    /// Number of live client workers.
    pub fn client_count(&self) -> usize {
        self.registry.len()
    }

    /// Names of live client workers, oldest first.
    pub fn client_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Whether teardown has completed.
    pub fn is_stopped(&self) -> bool {
        self.stopped.is_cancelled()
    }

    /// Waits until clients are killed and the listening socket is closed.
    pub async fn stopped(&self) {
        self.stopped.cancelled().await;
    }
}
