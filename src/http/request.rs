use std::ops::Range;

/// The first line of a request, kept as the bytes received. Method and path
/// are ranges into the stored line, so a path that is not UTF-8 still names
/// the file it was sent for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    raw: Vec<u8>,
    method: Option<Range<usize>>,
    path: Option<Range<usize>>,
}

impl RequestLine {
    /// Splits on the first space into method and path; the path ends at the
    /// next space, dropping the protocol version. Without any space both
    /// stay unset.
    ///
    /// # Example
    ///
    /// ```
    /// # use muxhttpd::http::request::RequestLine;
    /// let line = RequestLine::parse(b"GET /docs HTTP/1.1");
    /// assert_eq!(line.method(), Some(&b"GET"[..]));
    /// assert_eq!(line.path(), Some(&b"/docs"[..]));
    ///
    /// let bad = RequestLine::parse(b"GARBAGE");
    /// assert_eq!(bad.path(), None);
    /// ```
    pub fn parse(bytes: &[u8]) -> Self {
        let raw = bytes.to_vec();

        let Some(space1) = raw.iter().position(|&b| b == b' ') else {
            return Self {
                raw,
                method: None,
                path: None,
            };
        };

        let path_start = space1 + 1;
        let path_end = raw[path_start..]
            .iter()
            .position(|&b| b == b' ')
            .map(|i| path_start + i)
            .unwrap_or(raw.len());

        Self {
            method: Some(0..space1),
            path: Some(path_start..path_end),
            raw,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    pub fn method(&self) -> Option<&[u8]> {
        self.method.clone().map(|r| &self.raw[r])
    }

    pub fn path(&self) -> Option<&[u8]> {
        self.path.clone().map(|r| &self.raw[r])
    }
}
