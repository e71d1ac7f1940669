//! Maps a request path onto the filesystem and answers with either a
//! directory listing or the file's content.
//!
//! Paths are not sanitized: `..` components and absolute paths resolve
//! wherever they point.

use std::ffi::OsStr;
use std::fmt;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tracing::{debug, info, warn};

use crate::http::response::{Response, StatusCode};
use crate::http::writer::{ResponseWriter, TransmitError, send_all, send_response};

/// Files are streamed in chunks of this size.
pub const CHUNK_SIZE: usize = 8192;

/// Upper bound on a generated listing page.
pub const LISTING_CAPACITY: usize = 4096;

/// Once a listing grows past this, no more entries are added.
pub const LISTING_THRESHOLD: usize = 3500;

const LISTING_TAIL: &[u8] = b"</ul></body></html>";

/// Request failures that map onto an error status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    MalformedRequest,
    ResourceNotFound,
    InternalFailure,
}

impl RequestError {
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::MalformedRequest => StatusCode::BadRequest,
            RequestError::ResourceNotFound => StatusCode::NotFound,
            RequestError::InternalFailure => StatusCode::InternalServerError,
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::MalformedRequest => write!(f, "malformed request"),
            RequestError::ResourceNotFound => write!(f, "resource not found"),
            RequestError::InternalFailure => write!(f, "internal failure"),
        }
    }
}

impl std::error::Error for RequestError {}

/// Turns a URL path into a path relative to the document root: `/` and the
/// empty path become `.`, one leading `/` is dropped. Works on raw bytes, so
/// names that are not UTF-8 pass through untouched.
///
/// # Example
///
/// ```
/// # use muxhttpd::http::router::normalize_path;
/// assert_eq!(normalize_path(b"/"), b".");
/// assert_eq!(normalize_path(b"/src/main.rs"), b"src/main.rs");
/// assert_eq!(normalize_path(b"notes.txt"), b"notes.txt");
/// ```
pub fn normalize_path(url_path: &[u8]) -> &[u8] {
    if url_path.is_empty() || url_path == b"/" {
        return b".";
    }
    url_path.strip_prefix(b"/").unwrap_or(url_path)
}

/// Accumulates a directory listing page without ever exceeding its
/// capacity in bytes.
pub struct Listing {
    html: Vec<u8>,
    dir_path: Vec<u8>,
    capacity: usize,
    threshold: usize,
}

impl Listing {
    /// Starts a page for `dir_path`. Returns `None` if the head alone would
    /// not leave room for the closing tags.
    pub fn new(dir_path: &[u8], capacity: usize, threshold: usize) -> Option<Self> {
        let head: [&[u8]; 5] = [
            b"<html><head><title>Directory listing for ",
            dir_path,
            b"</title></head><body>\n<h1>Directory listing for ",
            dir_path,
            b"</h1>\n<ul>\n",
        ];
        let html = head.concat();

        if html.len() + LISTING_TAIL.len() > capacity {
            return None;
        }

        Some(Self {
            html,
            dir_path: dir_path.to_vec(),
            capacity,
            threshold,
        })
    }

    fn href(&self, name: &[u8]) -> Vec<u8> {
        if self.dir_path == b"." {
            name.to_vec()
        } else if self.dir_path.ends_with(b"/") {
            [&self.dir_path[..], name].concat()
        } else {
            let parts: [&[u8]; 3] = [&self.dir_path, b"/", name];
            parts.concat()
        }
    }

    /// Appends one entry. Returns `false` once the page is full; the entry
    /// is then dropped.
    pub fn push(&mut self, name: &[u8]) -> bool {
        if self.html.len() >= self.threshold {
            return false;
        }

        let href = self.href(name);
        let parts: [&[u8]; 5] = [b"<li><a href=\"", &href, b"\">", name, b"</a></li>\n"];
        let item = parts.concat();
        if self.html.len() + item.len() + LISTING_TAIL.len() > self.capacity {
            return false;
        }

        self.html.extend_from_slice(&item);
        true
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.html.extend_from_slice(LISTING_TAIL);
        self.html
    }
}

pub struct Router {
    root: PathBuf,
}

impl Router {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Answers a request for `url_path` on `out`.
    pub async fn route<W>(&self, url_path: &[u8], out: &mut W) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let rel = normalize_path(url_path);
        let full = self.root.join(OsStr::from_bytes(rel));
        let url_path = String::from_utf8_lossy(url_path);
        debug!(path = %url_path, resolved = %full.display(), "Routing request");

        let is_dir = fs::metadata(&full)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);

        let result = if is_dir {
            self.serve_directory(rel, &full, out).await
        } else {
            self.serve_file(&full, out).await
        };

        match result {
            Ok(()) => Ok(()),
            Err(Failure::Request(e)) => {
                info!(path = %url_path, error = %e, "Request failed");
                send_response(out, &Response::error(e.status())).await?;
                Ok(())
            }
            Err(Failure::Transmit(e)) => Err(e.into()),
        }
    }

    async fn serve_directory<W>(&self, rel: &[u8], full: &Path, out: &mut W) -> Result<(), Failure>
    where
        W: AsyncWrite + Unpin,
    {
        let mut entries = fs::read_dir(full)
            .await
            .map_err(|_| RequestError::ResourceNotFound)?;

        let mut listing = Listing::new(rel, LISTING_CAPACITY, LISTING_THRESHOLD)
            .ok_or(RequestError::InternalFailure)?;

        // read_dir omits the dot entries; the parent link is listed anyway.
        if listing.push(b"..") {
            loop {
                match entries.next_entry().await {
                    Ok(Some(entry)) => {
                        let name = entry.file_name();
                        if !listing.push(name.as_bytes()) {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, dir = %full.display(), "Directory read failed");
                        break;
                    }
                }
            }
        }

        let html = listing.finish();
        send_response(out, &Response::html(html)).await?;
        Ok(())
    }

    async fn serve_file<W>(&self, full: &Path, out: &mut W) -> Result<(), Failure>
    where
        W: AsyncWrite + Unpin,
    {
        let mut file = File::open(full)
            .await
            .map_err(|_| RequestError::ResourceNotFound)?;

        let size = file
            .metadata()
            .await
            .map_err(|_| RequestError::InternalFailure)?
            .len();

        ResponseWriter::head_only(&Response::file_head(size))
            .write_to(out)
            .await?;

        let sent = stream_chunks(&mut file, out).await?;
        info!(file = %full.display(), bytes = sent, "File transfer complete");
        Ok(())
    }
}

/// Copies `src` to `out` in [`CHUNK_SIZE`] pieces. A read error ends the
/// transfer early.
pub async fn stream_chunks<R, W>(src: &mut R, out: &mut W) -> Result<u64, TransmitError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let n = match read_chunk(src, &mut buffer).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, sent = total, "File read failed");
                break;
            }
        };

        send_all(out, &buffer[..n]).await?;
        total += n as u64;
    }

    Ok(total)
}

// Fills `buf` unless the source ends first, so every chunk but the last is
// full-sized.
async fn read_chunk<R>(src: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = src.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

enum Failure {
    Request(RequestError),
    Transmit(TransmitError),
}

impl From<RequestError> for Failure {
    fn from(e: RequestError) -> Self {
        Failure::Request(e)
    }
}

impl From<TransmitError> for Failure {
    fn from(e: TransmitError) -> Self {
        Failure::Transmit(e)
    }
}
