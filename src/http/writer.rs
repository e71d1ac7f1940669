use std::fmt;
use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::response::Response;

const HTTP_VERSION: &str = "HTTP/1.1";

/// Why a transfer stopped before every byte was sent.
#[derive(Debug)]
pub enum TransmitError {
    /// The peer accepted zero bytes, i.e. it went away.
    PeerClosed { sent: usize, total: usize },
    Io(io::Error),
}

impl fmt::Display for TransmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransmitError::PeerClosed { sent, total } => {
                write!(f, "connection closed while writing ({}/{} bytes sent)", sent, total)
            }
            TransmitError::Io(e) => write!(f, "write failed: {}", e),
        }
    }
}

impl std::error::Error for TransmitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransmitError::Io(e) => Some(e),
            TransmitError::PeerClosed { .. } => None,
        }
    }
}

/// Status line and headers, terminated by the blank line.
fn serialize_head(resp: &Response) -> Vec<u8> {
    let mut buf = Vec::new();

    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    for (k, v) in &resp.headers {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    buf.extend_from_slice(b"\r\n");
    buf
}

pub fn serialize_response(resp: &Response) -> Vec<u8> {
    let mut buf = serialize_head(resp);
    buf.extend_from_slice(&resp.body);
    buf
}

/// Writes all of `chunk`, retrying on partial writes.
///
/// A zero-length write means the peer is gone and aborts the transfer; an
/// I/O error aborts it as well. Nothing is retried beyond this chunk.
pub async fn send_all<W>(out: &mut W, chunk: &[u8]) -> Result<(), TransmitError>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;

    while written < chunk.len() {
        let n = match out.write(&chunk[written..]).await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(error = %e, sent = written, total = chunk.len(), "send failed");
                return Err(TransmitError::Io(e));
            }
        };

        if n == 0 {
            tracing::info!(sent = written, total = chunk.len(), "Connection closed by client during transfer");
            return Err(TransmitError::PeerClosed {
                sent: written,
                total: chunk.len(),
            });
        }

        written += n;
    }

    Ok(())
}

/// A serialized response waiting to be sent.
pub struct ResponseWriter {
    buffer: Vec<u8>,
}

impl ResponseWriter {
    /// Serializes head and body.
    pub fn new(response: &Response) -> Self {
        Self {
            buffer: serialize_response(response),
        }
    }

    /// Serializes only the head; the body is streamed by the caller.
    pub fn head_only(response: &Response) -> Self {
        Self {
            buffer: serialize_head(response),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub async fn write_to<W>(&self, out: &mut W) -> Result<(), TransmitError>
    where
        W: AsyncWrite + Unpin,
    {
        send_all(out, &self.buffer).await?;
        out.flush().await.map_err(TransmitError::Io)
    }
}

/// Serializes and sends a complete response.
pub async fn send_response<W>(out: &mut W, response: &Response) -> Result<(), TransmitError>
where
    W: AsyncWrite + Unpin,
{
    ResponseWriter::new(response).write_to(out).await
}
