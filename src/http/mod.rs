//! HTTP/1.1 on top of the line-oriented reactor.
//!
//! # Architecture
//!
//! - **`request`**: the parsed request line
//! - **`parser`**: header and `Content-Length` parsing
//! - **`context`**: the per-connection parse state machine and its table
//! - **`response`**: status codes and response construction
//! - **`writer`**: serialization and the partial-write send loop
//! - **`router`**: directory listings and file streaming
//! - **`service`**: the [`ConnectionHandler`](crate::server::ConnectionHandler) tying it together
//! - **`client`**: raw request building and response reading
//!
//! # Request cycle
//!
//! ```text
//!   line ──► HttpContext::feed ──► Complete? ──no──► wait for next line
//!                                     │
//!                                    yes
//!                                     ▼
//!              path present? ──no──► 400 Bad Request
//!                   │
//!                  yes
//!                   ▼
//!           Router: directory ──► listing (200 / 404 / 500)
//!                   file      ──► head + 8 KiB chunks (200 / 404 / 500)
//!                   │
//!                   ▼
//!           fresh HttpContext for the same connection
//! ```

pub mod client;
pub mod context;
pub mod parser;
pub mod request;
pub mod response;
pub mod router;
pub mod service;
pub mod writer;
