//! muxhttpd - single-threaded static file server
//!
//! A readiness-multiplexed TCP server that frames incoming bytes into lines
//! and an incremental HTTP/1.1 parser that serves files and directory
//! listings from them.

pub mod config;
pub mod http;
pub mod server;
