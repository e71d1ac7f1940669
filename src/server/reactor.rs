//! The event loop.
//!
//! One task owns the listening socket and every client connection. Each
//! turn waits until the listener or at least one client is readable, then
//! accepts, reads and frames, and finally drops the connections that ended.
//!
//! ```text
//!   wait ──► accept (listener first) ──► read + frame each ready client
//!    ▲                                              │
//!    └──────── remove ended clients (descending) ◄──┘
//! ```

use std::future::{Future, poll_fn};
use std::io;
use std::net::SocketAddr;
use std::task::Poll;

use anyhow::Context;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::server::connection::{Connection, Registry};
use crate::server::framer::{Framer, Line};
use crate::server::listener;

/// Lifecycle events reported to [`ConnectionHandler::on_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogEvent {
    ServerStart { port: u16 },
    NewClient,
    ClientLeft,
    ReceiveFailure,
    AcceptFailure,
}

/// Hooks the reactor calls into. Only [`on_line`](Self::on_line) is
/// mandatory.
pub trait ConnectionHandler {
    /// Called right after a connection is registered.
    fn on_connect(&mut self, _conn: &Connection) {}

    /// Called right before a connection is removed and closed.
    fn on_disconnect(&mut self, _conn: &Connection) {}

    /// Receives each framed line, including a trailing unterminated
    /// fragment. An error is logged; the connection stays open.
    fn on_line(
        &mut self,
        conn: &mut Connection,
        line: Line<'_>,
    ) -> impl Future<Output = anyhow::Result<()>>;

    fn on_event(&mut self, event: LogEvent, conn: Option<&Connection>) {
        log_event(event, conn);
    }
}

/// Default log hook.
pub fn log_event(event: LogEvent, conn: Option<&Connection>) {
    match (event, conn) {
        (LogEvent::ServerStart { port }, _) => info!(port, "Server started"),
        (LogEvent::NewClient, Some(c)) => info!(conn = %c.id(), peer = %c.peer(), "New client connected"),
        (LogEvent::ClientLeft, Some(c)) => info!(conn = %c.id(), peer = %c.peer(), "Client disconnected"),
        (LogEvent::ReceiveFailure, Some(c)) => warn!(conn = %c.id(), peer = %c.peer(), "Receive failed"),
        (LogEvent::AcceptFailure, _) => warn!("Failed to accept new connection"),
        (event, None) => debug!(?event, "Event without connection"),
    }
}

struct Ready {
    accepted: Option<io::Result<(TcpStream, SocketAddr)>>,
    clients: Vec<usize>,
}

#[derive(Debug, PartialEq, Eq)]
enum Disposition {
    Keep,
    Close,
}

pub struct Server<H> {
    listener: TcpListener,
    local_addr: SocketAddr,
    end_of_line: u8,
    registry: Registry,
    handler: H,
}

impl<H: ConnectionHandler> Server<H> {
    /// Binds according to `cfg` and wraps the listener.
    pub fn bind(cfg: &Config, handler: H) -> anyhow::Result<Self> {
        let listener = listener::bind(cfg)?;
        Self::from_listener(listener, cfg, handler)
    }

    pub fn from_listener(listener: TcpListener, cfg: &Config, handler: H) -> anyhow::Result<Self> {
        let local_addr = listener
            .local_addr()
            .context("listening socket has no local address")?;

        Ok(Self {
            listener,
            local_addr,
            end_of_line: cfg.end_of_line,
            registry: Registry::new(cfg.max_clients, cfg.buffer_capacity),
            handler,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Runs the event loop. Only returns if waiting for readiness fails.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let port = self.port();
        self.handler.on_event(LogEvent::ServerStart { port }, None);

        loop {
            self.turn().await?;
        }
    }

    /// One iteration of the event loop.
    pub async fn turn(&mut self) -> anyhow::Result<()> {
        let ready = self.wait_ready().await.context("readiness wait failed")?;

        if let Some(accepted) = ready.accepted {
            self.accept(accepted);
        }

        let mut ended = Vec::new();
        for index in ready.clients {
            if self.service(index).await == Disposition::Close {
                ended.push(index);
            }
        }

        // Descending, so swap-removal never moves a slot still to be removed.
        for &index in ended.iter().rev() {
            if let Some(conn) = self.registry.get(index) {
                self.handler.on_event(LogEvent::ClientLeft, Some(conn));
                self.handler.on_disconnect(conn);
            }
            self.registry.swap_remove(index);
        }

        Ok(())
    }

    async fn wait_ready(&self) -> io::Result<Ready> {
        let listener = &self.listener;
        let registry = &self.registry;

        poll_fn(|cx| {
            let accepted = match listener.poll_accept(cx) {
                Poll::Ready(res) => Some(res),
                Poll::Pending => None,
            };

            let mut clients = Vec::new();
            for (index, conn) in registry.iter().enumerate() {
                match conn.stream.poll_read_ready(cx) {
                    Poll::Ready(Ok(())) => clients.push(index),
                    Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                    Poll::Pending => {}
                }
            }

            if accepted.is_none() && clients.is_empty() {
                Poll::Pending
            } else {
                Poll::Ready(Ok(Ready { accepted, clients }))
            }
        })
        .await
    }

    fn accept(&mut self, accepted: io::Result<(TcpStream, SocketAddr)>) {
        let (stream, peer) = match accepted {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "accept failed");
                self.handler.on_event(LogEvent::AcceptFailure, None);
                return;
            }
        };

        match self.registry.insert(stream, peer) {
            Ok(id) => {
                let Some(conn) = self.registry.find(id) else {
                    return;
                };
                self.handler.on_event(LogEvent::NewClient, Some(conn));
                self.handler.on_connect(conn);
            }
            Err(stream) => {
                warn!(%peer, "Too many clients, connection rejected");
                drop(stream);
                self.handler.on_event(LogEvent::AcceptFailure, None);
            }
        }
    }

    async fn service(&mut self, index: usize) -> Disposition {
        let Self {
            registry,
            handler,
            end_of_line,
            ..
        } = self;

        let Some(conn) = registry.get_mut(index) else {
            return Disposition::Keep;
        };

        match conn.try_fill() {
            Ok(0) => Disposition::Close,
            Ok(n) => {
                debug!(conn = %conn.id(), bytes = n, "Received");
                let data = conn.take_pending();
                for line in Framer::new(&data, *end_of_line) {
                    if let Err(e) = handler.on_line(conn, line).await {
                        warn!(conn = %conn.id(), error = %e, "Line handler failed");
                    }
                }
                Disposition::Keep
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Disposition::Keep,
            Err(e) => {
                warn!(conn = %conn.id(), error = %e, "recv failed");
                handler.on_event(LogEvent::ReceiveFailure, Some(conn));
                Disposition::Close
            }
        }
    }
}
