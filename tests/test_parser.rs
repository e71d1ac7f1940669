use muxhttpd::http::context::{HttpContext, MAX_CONTENT_LENGTH, ParseState};
use muxhttpd::server::framer::Framer;

/// Feeds each read through the framer the way the reactor does and returns
/// every state the context passed through.
fn feed_reads(ctx: &mut HttpContext, reads: &[&[u8]]) -> Vec<ParseState> {
    let mut states = Vec::new();
    for read in reads {
        for line in Framer::new(read, b'\n') {
            states.push(ctx.feed(line));
        }
    }
    states
}

fn parse_whole(request: &[u8]) -> HttpContext {
    let mut ctx = HttpContext::new();
    feed_reads(&mut ctx, &[request]);
    ctx
}

fn assert_same_request(a: &HttpContext, b: &HttpContext) {
    assert_eq!(a.state(), b.state());
    assert_eq!(a.request_line(), b.request_line());
    assert_eq!(a.method(), b.method());
    assert_eq!(a.path(), b.path());
    assert_eq!(a.headers(), b.headers());
    assert_eq!(a.body(), b.body());
}

#[test]
fn test_parse_simple_get() {
    let ctx = parse_whole(b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n");

    assert_eq!(ctx.state(), ParseState::Complete);
    assert_eq!(ctx.method(), Some(&b"GET"[..]));
    assert_eq!(ctx.path(), Some(&b"/"[..]));
    assert_eq!(ctx.header("Host"), Some("example.com"));
    assert_eq!(ctx.content_length(), 0);
    assert!(ctx.body().is_empty());
}

#[test]
fn test_parse_lf_only_request() {
    let ctx = parse_whole(b"GET /a HTTP/1.1\nAccept: */*\n\n");

    assert_eq!(ctx.state(), ParseState::Complete);
    assert_eq!(ctx.path(), Some(&b"/a"[..]));
    assert_eq!(ctx.header("Accept"), Some("*/*"));
}

#[test]
fn test_states_follow_request_structure() {
    let mut ctx = HttpContext::new();
    let states = feed_reads(
        &mut ctx,
        &[b"POST /api HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello"],
    );

    assert_eq!(
        states,
        vec![
            ParseState::Headers,
            ParseState::Headers,
            ParseState::Body,
            ParseState::Complete,
        ]
    );
    assert_eq!(ctx.body(), b"hello");
}

#[test]
fn test_zero_content_length_skips_body_state() {
    let mut ctx = HttpContext::new();
    let states = feed_reads(
        &mut ctx,
        &[b"POST /api HTTP/1.1\r\nContent-Length: 0\r\n\r\n"],
    );

    assert!(!states.contains(&ParseState::Body));
    assert_eq!(ctx.state(), ParseState::Complete);
}

#[test]
fn test_missing_content_length_skips_body_state() {
    let mut ctx = HttpContext::new();
    let states = feed_reads(&mut ctx, &[b"GET /x HTTP/1.1\r\nHost: a\r\n\r\n"]);

    assert!(!states.contains(&ParseState::Body));
    assert_eq!(ctx.state(), ParseState::Complete);
}

#[test]
fn test_negative_content_length_is_zero() {
    let ctx = parse_whole(b"POST /api HTTP/1.1\r\nContent-Length: -7\r\n\r\n");

    assert_eq!(ctx.state(), ParseState::Complete);
    assert_eq!(ctx.content_length(), 0);
}

#[test]
fn test_headers_last_write_wins() {
    let ctx = parse_whole(b"GET / HTTP/1.1\r\nX-Tag: one\r\nX-Tag: two\r\n\r\n");
    assert_eq!(ctx.header("X-Tag"), Some("two"));
    assert_eq!(ctx.headers().len(), 1);
}

#[test]
fn test_header_without_colon_is_skipped() {
    let ctx = parse_whole(b"GET / HTTP/1.1\r\nBrokenHeader\r\nHost: h\r\n\r\n");
    assert_eq!(ctx.state(), ParseState::Complete);
    assert_eq!(ctx.headers().len(), 1);
}

#[test]
fn test_request_line_without_space_has_no_path() {
    let ctx = parse_whole(b"GARBAGE\r\n\r\n");

    assert_eq!(ctx.state(), ParseState::Complete);
    assert_eq!(ctx.request_line(), Some(&b"GARBAGE"[..]));
    assert_eq!(ctx.path(), None);
}

#[test]
fn test_body_buffer_sized_once() {
    let mut ctx = HttpContext::new();
    feed_reads(&mut ctx, &[b"POST /api HTTP/1.1\r\nContent-Length: 10\r\n\r\n"]);

    assert_eq!(ctx.state(), ParseState::Body);
    let capacity = ctx.body_capacity();
    assert!(capacity >= 12);

    feed_reads(&mut ctx, &[b"abc\r\n", b"defgh"]);
    assert_eq!(ctx.state(), ParseState::Complete);
    assert_eq!(ctx.body(), b"abc\r\ndefgh");
    assert_eq!(ctx.body_capacity(), capacity);
}

#[test]
fn test_body_overflow_is_truncated() {
    let ctx = parse_whole(b"POST /api HTTP/1.1\r\nContent-Length: 4\r\n\r\nhello world");

    assert_eq!(ctx.state(), ParseState::Complete);
    assert_eq!(ctx.body(), b"hell");
}

#[test]
fn test_body_keeps_embedded_newlines() {
    let ctx = parse_whole(b"POST /api HTTP/1.1\r\nContent-Length: 10\r\n\r\nline1\nl2\r\n");

    assert_eq!(ctx.state(), ParseState::Complete);
    assert_eq!(ctx.body(), b"line1\nl2\r\n");
}

#[test]
fn test_oversized_body_is_refused() {
    let request = format!(
        "POST /api HTTP/1.1\r\nContent-Length: {}\r\n\r\n",
        MAX_CONTENT_LENGTH + 1
    );
    let ctx = parse_whole(request.as_bytes());

    assert_eq!(ctx.state(), ParseState::Complete);
    assert!(ctx.is_oversized());
    assert!(ctx.body().is_empty());
}

#[test]
fn test_split_across_two_reads_at_every_offset() {
    let request: &[u8] =
        b"POST /upload HTTP/1.1\r\nHost: localhost\r\nContent-Length: 15\r\n\r\nfirst\nsecond\r\nx";
    let whole = parse_whole(request);
    assert_eq!(whole.state(), ParseState::Complete);
    assert_eq!(whole.body(), b"first\nsecond\r\nx");

    for split in 1..request.len() {
        let mut ctx = HttpContext::new();
        feed_reads(&mut ctx, &[&request[..split], &request[split..]]);
        assert_same_request(&whole, &ctx);
    }
}

#[test]
fn test_split_into_fixed_size_reads() {
    let request: &[u8] =
        b"PUT /data HTTP/1.1\r\nContent-Type: text/plain\r\nContent-Length: 9\r\n\r\nab\r\ncd\nef";
    let whole = parse_whole(request);
    assert_eq!(whole.body(), b"ab\r\ncd\nef");

    for size in 1..=request.len() {
        let reads: Vec<&[u8]> = request.chunks(size).collect();
        let mut ctx = HttpContext::new();
        feed_reads(&mut ctx, &reads);
        assert_same_request(&whole, &ctx);
    }
}

#[test]
fn test_complete_context_ignores_further_lines() {
    let mut ctx = parse_whole(b"GET / HTTP/1.1\r\n\r\n");
    feed_reads(&mut ctx, &[b"GET /other HTTP/1.1\r\n"]);

    assert_eq!(ctx.state(), ParseState::Complete);
    assert_eq!(ctx.path(), Some(&b"/"[..]));
}
