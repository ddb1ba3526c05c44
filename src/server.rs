//! TCP acceptor and client worker lifecycle.
//!
//! This module accepts shell clients on a single port and runs each one on
//! its own task until the client leaves or the server shuts down.
//!
//! ## Architecture
//!
//! ```text
//! +----------+
//! | Acceptor |  <- Owns the listening socket, polls for shutdown
//! +----------+
//!      |
//!      v
//! +----------+     +---------------+     +---------+
//! | Registry | --> | SessionWorker | --> | Session |  <- One per connection
//! +----------+     +---------------+     +---------+
//!   (weak)            (own task)          (owns socket)
//! ```
//!
//! ## Terminology
//!
//! - **Acceptor**: listener and accept loop; kills all clients on exit
//! - **Session**: one client socket bound to the shared interpreter
//! - **SessionWorker**: runs a session on its own task; can be killed
//! - **Registry**: weakly tracks live workers for mass termination
//!
//! ## Shutdown
//!
//! The accept call is bounded by the configured accept timeout, and the
//! shutdown token is checked once per iteration. Shutdown latency is
//! therefore at most one accept timeout. A connection that was accepted is
//! always registered before the loop re-checks shutdown.

mod error;
pub mod listener;
pub mod registry;
pub mod session;
pub mod worker;

pub use error::{AcceptorError, StopReason};
pub use listener::{Acceptor, AcceptorHandle};
pub use registry::Registry;
pub use session::{Session, SessionError};
pub use worker::{SessionWorker, WorkerHandle, WorkerId};
