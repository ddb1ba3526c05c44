//! Interpreter errors.

/// Errors raised while evaluating client input or startup scripts.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// Variable lookup for a name that is not bound.
    #[error("unknown variable: {0}")]
    UnknownVariable(String),
    /// Input that is neither an assignment, a lookup nor a known command.
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    /// Assignment to something that is not a valid identifier.
    #[error("invalid variable name: {0:?}")]
    InvalidName(String),
    /// The startup script could not be read.
    #[error("cannot read script {script}: {source}")]
    ScriptIo {
        script: String,
        #[source]
        source: std::io::Error,
    },
    /// A line of a startup script failed to evaluate.
    #[error("{script}:{line}: {source}")]
    ScriptLine {
        script: String,
        line: usize,
        #[source]
        source: Box<ShellError>,
    },
}
