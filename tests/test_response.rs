use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use muxhttpd::http::response::{Response, ResponseBuilder, StatusCode};
use muxhttpd::http::writer::{ResponseWriter, TransmitError, send_all, serialize_response};
use tokio::io::AsyncWrite;

/// Accepts at most `max` bytes per write; after `budget` bytes in total it
/// behaves like a closed peer (or a failing socket when `fail` is set).
struct Trickle {
    data: Vec<u8>,
    writes: Vec<usize>,
    max: usize,
    budget: usize,
    fail: bool,
}

impl Trickle {
    fn new(max: usize) -> Self {
        Self {
            data: Vec::new(),
            writes: Vec::new(),
            max,
            budget: usize::MAX,
            fail: false,
        }
    }
}

impl AsyncWrite for Trickle {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let left = this.budget - this.data.len();
        if left == 0 && this.fail {
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe")));
        }
        let n = buf.len().min(this.max).min(left);
        this.data.extend_from_slice(&buf[..n]);
        this.writes.push(n);
        Poll::Ready(Ok(n))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[test]
fn test_status_code_as_u16() {
    assert_eq!(StatusCode::Ok.as_u16(), 200);
    assert_eq!(StatusCode::BadRequest.as_u16(), 400);
    assert_eq!(StatusCode::NotFound.as_u16(), 404);
    assert_eq!(StatusCode::InternalServerError.as_u16(), 500);
}

#[test]
fn test_status_code_reason_phrase() {
    assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    assert_eq!(StatusCode::BadRequest.reason_phrase(), "Bad Request");
    assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
    assert_eq!(
        StatusCode::InternalServerError.reason_phrase(),
        "Internal Server Error"
    );
}

#[test]
fn test_error_responses_use_literal_length() {
    let cases = [
        (Response::bad_request(), "400 Bad Request", "15"),
        (Response::not_found(), "404 Not Found", "13"),
        (Response::internal_error(), "500 Internal Server Error", "25"),
    ];

    for (response, body, length) in cases {
        assert_eq!(response.body, body.as_bytes());
        assert_eq!(response.headers.get("Content-Length").unwrap(), length);
        assert_eq!(response.headers.get("Content-Type").unwrap(), "text/plain");
    }
}

#[test]
fn test_response_builder_auto_content_length() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .body(b"This is the body".to_vec())
        .build();

    assert_eq!(response.headers.get("Content-Length").unwrap(), "16");
}

#[test]
fn test_file_head_keeps_explicit_length() {
    let response = Response::file_head(123_456);

    assert!(response.body.is_empty());
    assert_eq!(response.headers.get("Content-Length").unwrap(), "123456");
    assert_eq!(
        response.headers.get("Content-Type").unwrap(),
        "text/plain; charset=utf-8"
    );
}

#[test]
fn test_serialize_response() {
    let bytes = serialize_response(&Response::not_found());
    let text = String::from_utf8(bytes).unwrap();

    assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(text.contains("Content-Length: 13\r\n"));
    assert!(text.contains("Content-Type: text/plain\r\n"));
    assert!(text.ends_with("\r\n\r\n404 Not Found"));
}

#[test]
fn test_head_only_omits_body() {
    let response = Response::html("<html></html>");
    let writer = ResponseWriter::head_only(&response);
    let text = String::from_utf8(writer.as_bytes().to_vec()).unwrap();

    assert!(text.contains("Content-Length: 13\r\n"));
    assert!(text.ends_with("\r\n\r\n"));
    assert!(!text.contains("<html>"));
}

#[tokio::test]
async fn test_send_all_retries_partial_writes() {
    let payload: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
    let mut out = Trickle::new(7);

    send_all(&mut out, &payload).await.unwrap();

    assert_eq!(out.data, payload);
    assert!(out.writes.len() > 1);
    assert!(out.writes.iter().all(|&n| n <= 7));
}

#[tokio::test]
async fn test_send_all_aborts_on_zero_write() {
    let mut out = Trickle::new(4);
    out.budget = 10;

    let err = send_all(&mut out, &[1u8; 32]).await.unwrap_err();

    match err {
        TransmitError::PeerClosed { sent, total } => {
            assert_eq!(sent, 10);
            assert_eq!(total, 32);
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_send_all_aborts_on_error() {
    let mut out = Trickle::new(64);
    out.budget = 5;
    out.fail = true;

    let err = send_all(&mut out, &[0u8; 20]).await.unwrap_err();

    assert!(matches!(err, TransmitError::Io(_)));
    assert_eq!(out.data.len(), 5);
}

#[tokio::test]
async fn test_response_writer_to_vec() {
    let mut out: Vec<u8> = Vec::new();
    ResponseWriter::new(&Response::bad_request())
        .write_to(&mut out)
        .await
        .unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(text.ends_with("400 Bad Request"));
}
