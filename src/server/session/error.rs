use tokio::task::JoinError;
use tokio_util::codec::LinesCodecError;

/// Failure local to one client session.
///
/// These end the session's worker and never reach the acceptor.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Socket I/O failed or the client sent an oversized or non-UTF-8 line.
    #[error("line codec error: {0}")]
    Codec(#[from] LinesCodecError),
    /// The interpreter panicked while evaluating client input.
    #[error("interpreter task failed: {0}")]
    Interpreter(#[from] JoinError),
}
