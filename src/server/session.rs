mod error;

pub use error::SessionError;

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::shell::{Evaluation, Interpreter, ShellError};

/// Longest line a client may send, in bytes.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// A single client session.
///
/// Owns the client socket for its whole lifetime; dropping the session
/// closes the connection. The interpreter and startup scripts are shared
/// with every other session and passed through untouched.
pub struct Session<I: Interpreter> {
    framed: Framed<TcpStream, LinesCodec>,
    peer: SocketAddr,
    interpreter: Arc<I>,
    startup_scripts: Arc<[String]>,
}

impl<I: Interpreter> Session<I> {
    pub fn new(
        socket: TcpStream,
        peer: SocketAddr,
        interpreter: Arc<I>,
        startup_scripts: Arc<[String]>,
    ) -> Self {
        Self {
            framed: Framed::new(socket, LinesCodec::new_with_max_length(MAX_LINE_LENGTH)),
            peer,
            interpreter,
            startup_scripts,
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Serves the client until it disconnects, asks to exit, or
    /// `cancel_token` is cancelled.
    ///
    /// Cancellation is checked before every step, so a cancelled session
    /// never evaluates another line.
    pub async fn run(&mut self, cancel_token: CancellationToken) -> Result<(), SessionError> {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                debug!(peer = %self.peer, "session cancelled before startup scripts finished");
                return Ok(());
            }
            res = self.run_startup_scripts() => res?,
        }

        loop {
            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => {
                    debug!(peer = %self.peer, "session cancelled");
                    return Ok(());
                }
                res = self.handle_line() => {
                    if res? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Runs every startup script in order.
    ///
    /// A failing script is reported to the client and does not end the
    /// session.
    async fn run_startup_scripts(&mut self) -> Result<(), SessionError> {
        let scripts = Arc::clone(&self.startup_scripts);
        for script in scripts.iter() {
            let interpreter = Arc::clone(&self.interpreter);
            let id = script.clone();
            let result = tokio::task::spawn_blocking(move || interpreter.run_script(&id)).await?;

            if let Err(e) = result {
                warn!(peer = %self.peer, script = %script, error = %e, "startup script failed");
                self.send_error(&e).await?;
            }
        }
        Ok(())
    }

    /// Reads and evaluates one line from the client.
    /// Returns true if the session should end.
    async fn handle_line(&mut self) -> Result<bool, SessionError> {
        let line = match self.framed.next().await {
            Some(Ok(line)) => line,
            Some(Err(e)) => return Err(e.into()),
            None => return Ok(true), // EOF - client disconnected
        };

        let line = line.trim();
        if line.is_empty() {
            return Ok(false);
        }

        let interpreter = Arc::clone(&self.interpreter);
        let input = line.to_string();
        let result = tokio::task::spawn_blocking(move || interpreter.eval(&input)).await?;

        match result {
            Ok(Evaluation::Output(text)) => self.framed.send(text).await?,
            Ok(Evaluation::Silent) => {}
            Ok(Evaluation::Exit) => {
                debug!(peer = %self.peer, "client requested exit");
                return Ok(true);
            }
            Err(e) => self.send_error(&e).await?,
        }
        Ok(false)
    }

    async fn send_error(&mut self, err: &ShellError) -> Result<(), SessionError> {
        self.framed.send(format!("error: {}", err)).await?;
        Ok(())
    }
}
