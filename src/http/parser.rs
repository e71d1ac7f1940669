//! Line-level parsing helpers used by the request state machine.

use std::collections::HashMap;

/// Parses a `key: value` header line into `headers`.
///
/// Leading spaces are trimmed from both key and value. Lines without a
/// colon are ignored. A repeated key overwrites the earlier value.
pub fn parse_header_line(headers: &mut HashMap<String, String>, line: &[u8]) -> bool {
    let line = String::from_utf8_lossy(line);
    let Some((key, value)) = line.split_once(':') else {
        return false;
    };

    headers.insert(
        key.trim_start_matches(' ').to_string(),
        value.trim_start_matches(' ').to_string(),
    );
    true
}

/// Reads a `Content-Length` value the lenient way: leading whitespace and an
/// optional sign, then as many digits as present. Anything missing,
/// non-numeric or non-positive yields 0.
pub fn parse_content_length(value: &str) -> usize {
    let value = value.trim_start();
    let (negative, digits) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };

    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());

    if negative || end == 0 {
        return 0;
    }

    digits[..end].parse().unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_values_keep_inner_spaces() {
        let mut headers = HashMap::new();
        assert!(parse_header_line(&mut headers, b"  User-Agent:   curl/8.0 (x)"));
        assert_eq!(headers.get("User-Agent").unwrap(), "curl/8.0 (x)");
    }

    #[test]
    fn header_without_colon_is_ignored() {
        let mut headers = HashMap::new();
        assert!(!parse_header_line(&mut headers, b"BrokenHeader"));
        assert!(headers.is_empty());
    }

    #[test]
    fn content_length_is_lenient() {
        assert_eq!(parse_content_length("42"), 42);
        assert_eq!(parse_content_length(" 12abc"), 12);
        assert_eq!(parse_content_length("abc"), 0);
        assert_eq!(parse_content_length("-5"), 0);
        assert_eq!(parse_content_length(""), 0);
    }
}
