//! Per-connection request parsing state.
//!
//! Lines arrive one at a time from the framer, possibly split across many
//! reads, so the parser keeps everything it has seen so far in an
//! [`HttpContext`] that survives between reactor turns.
//!
//! ```text
//!   RequestLine ──► Headers ──(blank line, length 0)──► Complete
//!                      │                                   ▲
//!                      └──(blank line, length > 0)──► Body ┘
//! ```

use std::collections::HashMap;

use bytes::BytesMut;

use crate::http::parser::{parse_content_length, parse_header_line};
use crate::http::request::RequestLine;
use crate::server::connection::ConnectionId;
use crate::server::framer::{Line, LineEnding};

/// Bodies declaring more than this are refused instead of buffered.
pub const MAX_CONTENT_LENGTH: usize = 64 * 1024 * 1024;

/// An unterminated request or header line longer than this is interpreted
/// as it stands.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    RequestLine,
    Headers,
    Body,
    Complete,
}

#[derive(Debug)]
pub struct HttpContext {
    state: ParseState,
    headers: HashMap<String, String>,
    request_line: Option<RequestLine>,
    content_length: usize,
    received: usize,
    body: BytesMut,
    oversized: bool,
    partial: Vec<u8>,
}

impl Default for HttpContext {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpContext {
    pub fn new() -> Self {
        Self {
            state: ParseState::RequestLine,
            headers: HashMap::new(),
            request_line: None,
            content_length: 0,
            received: 0,
            body: BytesMut::new(),
            oversized: false,
            partial: Vec::new(),
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Consumes one framed line and returns the resulting state.
    ///
    /// While reading the request line and headers, an unterminated fragment
    /// is held back and joined with whatever arrives next. In the body, each
    /// fragment is appended as-is followed by the delimiter the framer
    /// stripped from it.
    pub fn feed(&mut self, line: Line<'_>) -> ParseState {
        match self.state {
            ParseState::RequestLine | ParseState::Headers => {
                if !line.is_terminated() && self.partial.len() + line.len() <= MAX_LINE_LENGTH {
                    self.partial.extend_from_slice(line.bytes);
                    return self.state;
                }

                let joined;
                let bytes = if self.partial.is_empty() {
                    line.bytes
                } else {
                    self.partial.extend_from_slice(line.bytes);
                    // The read boundary fell between CR and LF.
                    if line.ending == LineEnding::Delimiter([b'\n']) && self.partial.last() == Some(&b'\r') {
                        self.partial.pop();
                    }
                    joined = std::mem::take(&mut self.partial);
                    &joined[..]
                };

                if self.state == ParseState::RequestLine {
                    self.request_line = Some(RequestLine::parse(bytes));
                    self.state = ParseState::Headers;
                } else {
                    self.on_header(bytes);
                }
            }
            ParseState::Body => self.on_body(line),
            ParseState::Complete => {}
        }

        self.state
    }

    fn on_header(&mut self, bytes: &[u8]) {
        if !bytes.is_empty() {
            parse_header_line(&mut self.headers, bytes);
            return;
        }

        self.content_length = self
            .header("Content-Length")
            .map(parse_content_length)
            .unwrap_or(0);

        if self.content_length == 0 {
            self.state = ParseState::Complete;
            return;
        }

        if self.content_length > MAX_CONTENT_LENGTH {
            tracing::warn!(
                content_length = self.content_length,
                "Refusing oversized request body"
            );
            self.oversized = true;
            self.state = ParseState::Complete;
            return;
        }

        // Room for the body plus one trailing delimiter.
        self.body = BytesMut::with_capacity(self.content_length + 2);
        self.state = ParseState::Body;
    }

    fn on_body(&mut self, line: Line<'_>) {
        let room = self.content_length.saturating_sub(self.received);
        let take = line.len().min(room);

        self.body.extend_from_slice(&line.bytes[..take]);
        self.body.extend_from_slice(line.ending.as_bytes());
        self.received = self.body.len();

        tracing::trace!(
            received = self.received,
            content_length = self.content_length,
            "Receiving body"
        );

        if self.received >= self.content_length {
            self.state = ParseState::Complete;
        }
    }

    pub fn request_line(&self) -> Option<&[u8]> {
        self.request_line.as_ref().map(|l| l.as_bytes())
    }

    pub fn method(&self) -> Option<&[u8]> {
        self.request_line.as_ref().and_then(|l| l.method())
    }

    /// The request target exactly as sent.
    pub fn path(&self) -> Option<&[u8]> {
        self.request_line.as_ref().and_then(|l| l.path())
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(|v| v.as_str())
    }

    /// Declared body length, 0 when absent or invalid.
    pub fn content_length(&self) -> usize {
        self.content_length
    }

    /// The body, cut at the declared length.
    pub fn body(&self) -> &[u8] {
        let end = self.body.len().min(self.content_length);
        &self.body[..end]
    }

    pub fn body_capacity(&self) -> usize {
        self.body.capacity()
    }

    /// True when the declared body exceeded [`MAX_CONTENT_LENGTH`].
    pub fn is_oversized(&self) -> bool {
        self.oversized
    }
}

/// Parsing contexts for all live connections.
#[derive(Debug, Default)]
pub struct ContextTable {
    contexts: HashMap<ConnectionId, HttpContext>,
}

impl ContextTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, id: ConnectionId) {
        self.contexts.insert(id, HttpContext::new());
    }

    pub fn close(&mut self, id: ConnectionId) -> Option<HttpContext> {
        self.contexts.remove(&id)
    }

    pub fn get(&self, id: ConnectionId) -> Option<&HttpContext> {
        self.contexts.get(&id)
    }

    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut HttpContext> {
        self.contexts.get_mut(&id)
    }

    /// Swaps in a fresh context for `id` and hands back the finished one.
    pub fn reset(&mut self, id: ConnectionId) -> Option<HttpContext> {
        self.contexts
            .get_mut(&id)
            .map(std::mem::take)
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}
