//! Acceptor errors and stop reasons.

use std::io;

use crate::config::ConfigError;

/// Errors surfaced to the caller that starts an acceptor.
#[derive(Debug, thiserror::Error)]
pub enum AcceptorError {
    /// Invalid configuration; no socket was opened.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The listening socket could not be bound.
    #[error("cannot bind shell server to port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },
    /// A supplied listener could not report its local address.
    #[error("listener is not usable: {0}")]
    Listener(#[source] io::Error),
}

/// Why the accept loop stopped.
#[derive(Debug, thiserror::Error)]
pub enum StopReason {
    /// Cancellation was requested through `shutdown()`.
    #[error("shutdown requested")]
    Shutdown,
    /// The listening socket was closed or became unusable.
    #[error("listening socket failed: {0}")]
    ListenerFailure(#[source] io::Error),
    /// Any other accept error. Never retried.
    #[error("unexpected accept failure: {0}")]
    Unexpected(#[source] io::Error),
}

/// How an accept error affects the accept loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AcceptFailure {
    /// The pending connection failed; the listener is fine.
    Connection,
    /// The listener itself is unusable.
    Listener,
    /// Anything not classified above.
    Unexpected,
}

impl AcceptFailure {
    pub(crate) fn classify(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut => AcceptFailure::Connection,
            io::ErrorKind::InvalidInput
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe => AcceptFailure::Listener,
            _ => AcceptFailure::Unexpected,
        }
    }
}
