//! Readiness-multiplexed TCP server.
//!
//! - **`listener`**: opens the listening socket
//! - **`connection`**: per-client state and the bounded registry
//! - **`framer`**: turns buffered bytes into lines
//! - **`reactor`**: the event loop and the [`ConnectionHandler`] hooks

pub mod connection;
pub mod framer;
pub mod listener;
pub mod reactor;

pub use connection::{Connection, ConnectionId, NonBlockingRead, Registry};
pub use framer::{Framer, Line, LineEnding};
pub use reactor::{ConnectionHandler, LogEvent, Server};
