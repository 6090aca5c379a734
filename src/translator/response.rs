use std::collections::BTreeMap;

use crate::error::{BridgeError, BridgeErrorKind};
use crate::fastcgi::FastCgiResponse;
use crate::model::{HeaderValue, HttpResponse};

const DEFAULT_STATUS: u16 = 200;

/// Splits a responder's `stdout` into its CGI header block and body at
/// the first blank line, reads `Status:` out of the header block if
/// present, and maps the rest into an [`HttpResponse`]. `has_multi_header`
/// controls whether a header repeated across several lines is collapsed
/// to its last value or kept as an ordered list.
///
/// A present `Status:` value that doesn't parse as a base-10 status code
/// is a protocol error, not a silent fallback to 200 — the caller folds
/// that into the fixed error page the same as any other transport-level
/// failure.
pub fn translate_response(response: &FastCgiResponse, has_multi_header: bool) -> Result<HttpResponse, BridgeError> {
    let (header_block, body) = split_header_block(&response.stdout);

    let mut status = DEFAULT_STATUS;
    let mut headers: BTreeMap<String, HeaderValue> = BTreeMap::new();

    for line in header_block.split('\n') {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();

        if name.eq_ignore_ascii_case("status") {
            status = parse_status(value).ok_or_else(|| {
                BridgeError::new(BridgeErrorKind::ProtocolError, format!("unparseable Status header value: {value:?}"))
            })?;
            continue;
        }

        upsert_header(&mut headers, name, value.to_string(), has_multi_header);
    }

    Ok(HttpResponse::new(status, headers, body.to_vec()))
}

fn upsert_header(headers: &mut BTreeMap<String, HeaderValue>, name: &str, value: String, has_multi_header: bool) {
    let key = name.to_ascii_lowercase();
    match headers.get_mut(&key) {
        Some(existing) if has_multi_header => existing.append(value),
        Some(existing) => existing.overwrite(value),
        None => {
            headers.insert(key, HeaderValue::Single(value));
        }
    }
}

/// A leading run of ASCII digits is the status code; anything after
/// (e.g. the reason phrase in `"404 Not Found"`) is ignored.
fn parse_status(value: &str) -> Option<u16> {
    let digits: String = value.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse::<u16>().ok()
}

/// Finds the blank line ending the header block, accepting either
/// `\r\n\r\n` or a bare `\n\n`. Output with no such separator is treated
/// as a headerless body.
fn split_header_block(stdout: &[u8]) -> (&str, &[u8]) {
    if let Some(pos) = find_subslice(stdout, b"\r\n\r\n") {
        let header_block = std::str::from_utf8(&stdout[..pos]).unwrap_or("");
        return (header_block, &stdout[pos + 4..]);
    }
    if let Some(pos) = find_subslice(stdout, b"\n\n") {
        let header_block = std::str::from_utf8(&stdout[..pos]).unwrap_or("");
        return (header_block, &stdout[pos + 2..]);
    }
    ("", stdout)
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_with(stdout: &[u8]) -> FastCgiResponse {
        FastCgiResponse {
            stdout: stdout.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn translates_status_header_and_strips_it_from_output() {
        let raw = b"Status: 404 Not Found\r\nContent-Type: text/plain\r\n\r\nmissing";
        let response = translate_response(&response_with(raw), false).unwrap();
        assert_eq!(response.status, 404);
        assert!(!response.headers.contains_key("status"));
        assert_eq!(response.headers.get("content-type").unwrap().last(), "text/plain");
        assert_eq!(response.body, b"missing");
    }

    #[test]
    fn defaults_to_200_when_no_status_header_present() {
        let raw = b"Content-Type: text/plain\r\n\r\nok";
        let response = translate_response(&response_with(raw), false).unwrap();
        assert_eq!(response.status, 200);
    }

    #[test]
    fn falls_back_to_bare_lf_terminator() {
        let raw = b"Content-Type: text/plain\n\nok";
        let response = translate_response(&response_with(raw), false).unwrap();
        assert_eq!(response.headers.get("content-type").unwrap().last(), "text/plain");
        assert_eq!(response.body, b"ok");
    }

    #[test]
    fn last_write_wins_when_multi_header_disabled() {
        let raw = b"X-Trace: first\r\nX-Trace: second\r\n\r\nbody";
        let response = translate_response(&response_with(raw), false).unwrap();
        assert_eq!(response.headers.get("x-trace").unwrap().last(), "second");
    }

    #[test]
    fn repeated_headers_kept_as_list_when_multi_header_enabled() {
        let raw = b"X-Trace: first\r\nX-Trace: second\r\n\r\nbody";
        let response = translate_response(&response_with(raw), true).unwrap();
        match response.headers.get("x-trace").unwrap() {
            HeaderValue::Multi(values) => assert_eq!(values, &["first".to_string(), "second".to_string()]),
            HeaderValue::Single(_) => panic!("expected Multi"),
        }
    }

    #[test]
    fn headerless_output_is_treated_entirely_as_body() {
        let raw = b"just plain text with no header block";
        let response = translate_response(&response_with(raw), false).unwrap();
        assert_eq!(response.status, 200);
        assert!(response.headers.is_empty());
        assert_eq!(response.body, raw);
    }

    #[test]
    fn unparseable_status_value_is_a_protocol_error() {
        let raw = b"Status: garbage\r\nContent-Type: text/plain\r\n\r\nbody";
        let err = translate_response(&response_with(raw), false).unwrap_err();
        assert_eq!(err.kind, BridgeErrorKind::ProtocolError);
    }
}
