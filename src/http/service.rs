//! Connects the reactor's line hooks to the HTTP parser and router.

use tokio::io::AsyncWrite;
use tracing::{debug, info};

use crate::http::context::{ContextTable, HttpContext, ParseState};
use crate::http::response::Response;
use crate::http::router::{RequestError, Router};
use crate::http::writer::send_response;
use crate::server::connection::Connection;
use crate::server::framer::Line;
use crate::server::reactor::ConnectionHandler;

/// Serves files and directory listings below a document root, one request
/// per completed parse cycle.
pub struct HttpService {
    contexts: ContextTable,
    router: Router,
}

impl HttpService {
    pub fn new(router: Router) -> Self {
        Self {
            contexts: ContextTable::new(),
            router,
        }
    }

    pub fn contexts(&self) -> &ContextTable {
        &self.contexts
    }

    /// Answers a fully parsed request.
    pub async fn respond<W>(&self, ctx: &HttpContext, out: &mut W) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let path = match ctx.path() {
            Some(path) if !ctx.is_oversized() => path,
            _ => {
                debug!(
                    request_line = %String::from_utf8_lossy(ctx.request_line().unwrap_or_default()),
                    error = %RequestError::MalformedRequest,
                    "Rejecting request"
                );
                send_response(out, &Response::bad_request()).await?;
                return Ok(());
            }
        };

        info!(
            method = %String::from_utf8_lossy(ctx.method().unwrap_or_default()),
            path = %String::from_utf8_lossy(path),
            body = ctx.body().len(),
            "Request"
        );
        self.router.route(path, out).await
    }
}

impl ConnectionHandler for HttpService {
    fn on_connect(&mut self, conn: &Connection) {
        self.contexts.open(conn.id());
    }

    fn on_disconnect(&mut self, conn: &Connection) {
        self.contexts.close(conn.id());
    }

    async fn on_line(&mut self, conn: &mut Connection, line: Line<'_>) -> anyhow::Result<()> {
        let Some(ctx) = self.contexts.get_mut(conn.id()) else {
            return Ok(());
        };

        if ctx.feed(line) != ParseState::Complete {
            return Ok(());
        }

        let Some(request) = self.contexts.reset(conn.id()) else {
            return Ok(());
        };
        self.respond(&request, &mut conn.stream).await
    }
}
