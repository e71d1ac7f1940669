//! Minimal client side of the socket layer: build a raw request line by
//! line, send it, read one response back.

use std::collections::HashMap;

use anyhow::{Context, Result};
use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};

/// Capacity of a [`RawRequest`].
pub const RAW_REQUEST_CAPACITY: usize = 16 * 1024;

const READ_BUFFER_SIZE: usize = 8192;

/// A request assembled from CRLF-terminated lines in a bounded buffer.
#[derive(Debug, Clone, Default)]
pub struct RawRequest {
    content: Vec<u8>,
}

impl RawRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `line` plus CRLF. A line that would not fit is dropped and
    /// `false` returned.
    pub fn add_line(&mut self, line: &str) -> bool {
        if self.content.len() + line.len() + 2 >= RAW_REQUEST_CAPACITY {
            return false;
        }
        self.content.extend_from_slice(line.as_bytes());
        self.content.extend_from_slice(b"\r\n");
        true
    }

    /// Appends raw bytes without a line terminator, for bodies.
    pub fn add_body(&mut self, body: &[u8]) -> bool {
        if self.content.len() + body.len() >= RAW_REQUEST_CAPACITY {
            return false;
        }
        self.content.extend_from_slice(body);
        true
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ClientResponse {
    pub status: u16,
    pub reason: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl ClientResponse {
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(|v| v.as_str())
    }
}

/// One open connection to a server.
pub struct Client {
    stream: TcpStream,
    buffer: BytesMut,
}

impl Client {
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .context("failed to connect")?;
        Ok(Self {
            stream,
            buffer: BytesMut::with_capacity(READ_BUFFER_SIZE),
        })
    }

    pub async fn send(&mut self, request: &RawRequest) -> Result<()> {
        self.send_bytes(request.as_bytes()).await
    }

    pub async fn send_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Reads exactly one response framed by its `Content-Length`. Bytes
    /// past the end stay buffered for the next call.
    pub async fn read_response(&mut self) -> Result<ClientResponse> {
        let headers_end = loop {
            if let Some(pos) = self.buffer.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos;
            }
            if self.buffer.len() > 64 * 1024 {
                anyhow::bail!("Response headers too large");
            }
            let n = self.stream.read_buf(&mut self.buffer).await?;
            if n == 0 {
                anyhow::bail!("Connection closed before complete response received");
            }
        };

        let head = self.buffer.split_to(headers_end + 4);
        let (status, reason, headers) = parse_head(&head[..headers_end])?;

        let content_length = headers
            .get("Content-Length")
            .map(|v| v.parse::<usize>())
            .transpose()
            .context("Invalid Content-Length")?
            .unwrap_or(0);

        while self.buffer.len() < content_length {
            let n = self.stream.read_buf(&mut self.buffer).await?;
            if n == 0 {
                anyhow::bail!("Connection closed before complete body received");
            }
        }

        let body = self.buffer[..content_length].to_vec();
        self.buffer.advance(content_length);

        Ok(ClientResponse {
            status,
            reason,
            headers,
            body,
        })
    }
}

/// Connects, sends `request`, and returns the single response.
pub async fn fetch(addr: impl ToSocketAddrs, request: &RawRequest) -> Result<ClientResponse> {
    let mut client = Client::connect(addr).await?;
    client.send(request).await?;
    client.read_response().await
}

fn parse_head(head: &[u8]) -> Result<(u16, String, HashMap<String, String>)> {
    let text = std::str::from_utf8(head).context("Invalid UTF-8 in response headers")?;
    let mut lines = text.split("\r\n");

    let status_line = lines.next().context("Empty response")?;
    let mut parts = status_line.splitn(3, ' ');
    let _version = parts.next().context("Invalid status line")?;
    let status = parts
        .next()
        .context("Invalid status line")?
        .parse::<u16>()
        .context("Invalid status code")?;
    let reason = parts.next().unwrap_or("").to_string();

    let mut headers = HashMap::new();
    for line in lines {
        if let Some((key, value)) = line.split_once(':') {
            headers.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    Ok((status, reason, headers))
}
