use anyhow::Context;
use tokio::net::{TcpListener, TcpSocket};
use tracing::info;

use crate::config::Config;

/// Opens the listening socket described by `cfg`.
///
/// Must be called from within a tokio runtime. Failure here is a startup
/// error: privileged or already-bound ports end the process.
pub fn bind(cfg: &Config) -> anyhow::Result<TcpListener> {
    let addr = cfg.listen_addr();

    let socket = TcpSocket::new_v4().context("failed to create listening socket")?;
    socket
        .set_reuseaddr(true)
        .context("failed to set SO_REUSEADDR")?;
    socket
        .bind(addr)
        .with_context(|| format!("failed to bind {}", addr))?;

    let listener = socket
        .listen(cfg.backlog)
        .with_context(|| format!("failed to listen on {}", addr))?;

    info!(mode = ?cfg.mode, backlog = cfg.backlog, "Listening on {}", addr);
    Ok(listener)
}
