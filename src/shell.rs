//! Interpreter boundary used by client sessions.
//!
//! The server never inspects what a session evaluates. It only hands each
//! session a shared [`Interpreter`] (the execution context) and the list of
//! startup scripts to run before the first line of client input.
//!
//! [`BindingShell`] is the interpreter shipped with the binary: a small
//! variable-binding environment shared by every connected client.

mod binding;
mod error;

pub use binding::{Binding, BindingShell};
pub use error::ShellError;

/// Result of evaluating one line of client input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// Text to send back to the client as a single line.
    Output(String),
    /// Nothing to send back.
    Silent,
    /// The client asked to end the session.
    Exit,
}

/// Shared execution context for all sessions.
///
/// Implementations are called concurrently from every session and must
/// synchronize their own state. Calls may block; sessions run them on the
/// blocking thread pool.
pub trait Interpreter: Send + Sync + 'static {
    /// Evaluates one line of client input.
    fn eval(&self, line: &str) -> Result<Evaluation, ShellError>;

    /// Runs the startup script identified by `script`.
    fn run_script(&self, script: &str) -> Result<(), ShellError>;
}
