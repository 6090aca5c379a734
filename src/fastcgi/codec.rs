use crate::error::{BridgeError, BridgeErrorKind};

use super::protocol::*;
use super::request::FastCgiRequest;
use super::response::FastCgiResponse;

const MAX_RECORD_CONTENT: usize = 0xFFFF;

fn protocol_error(message: impl Into<String>) -> BridgeError {
    BridgeError::new(BridgeErrorKind::ProtocolError, message)
}

fn write_header(buf: &mut Vec<u8>, record_type: u8, content_len: u16, padding_len: u8) {
    buf.push(VERSION);
    buf.push(record_type);
    buf.extend_from_slice(&REQUEST_ID.to_be_bytes());
    buf.extend_from_slice(&content_len.to_be_bytes());
    buf.push(padding_len);
    buf.push(0); // reserved
}

/// Writes `content` as one or more records of `record_type`, chunked to
/// stay under FastCGI's 64KiB-per-record content limit, each padded to
/// an 8-byte boundary.
fn write_stream_records(buf: &mut Vec<u8>, record_type: u8, content: &[u8]) {
    if content.is_empty() {
        write_header(buf, record_type, 0, 0);
        return;
    }
    for chunk in content.chunks(MAX_RECORD_CONTENT) {
        let padding = padding_for(chunk.len());
        write_header(buf, record_type, chunk.len() as u16, padding);
        buf.extend_from_slice(chunk);
        buf.extend(std::iter::repeat(0u8).take(padding as usize));
    }
}

fn encode_params(params: &std::collections::BTreeMap<String, String>) -> Vec<u8> {
    let mut content = Vec::new();
    for (key, value) in params {
        encode_length(&mut content, key.len());
        encode_length(&mut content, value.len());
        content.extend_from_slice(key.as_bytes());
        content.extend_from_slice(value.as_bytes());
    }
    content
}

fn encode_length(buf: &mut Vec<u8>, len: usize) {
    if len < 128 {
        buf.push(len as u8);
    } else {
        buf.extend_from_slice(&((len as u32) | 0x8000_0000).to_be_bytes());
    }
}

/// Encodes a full responder request: `BEGIN_REQUEST`, one or more
/// `PARAMS` records terminated by an empty one, then `STDIN` likewise.
pub fn encode_request(request: &FastCgiRequest) -> Vec<u8> {
    let mut buf = Vec::new();

    // FCGI_BEGIN_REQUEST body: role(2) + flags(1) + reserved(5) = 8 bytes, no padding needed.
    write_header(&mut buf, TYPE_BEGIN_REQUEST, 8, 0);
    buf.extend_from_slice(&ROLE_RESPONDER.to_be_bytes());
    buf.push(0); // flags: no FCGI_KEEP_CONN, connection is single-shot
    buf.extend_from_slice(&[0u8; 5]);

    let params_content = encode_params(&request.params);
    write_stream_records(&mut buf, TYPE_PARAMS, &params_content);
    // Empty PARAMS record signals end of the stream even when params_content was non-empty.
    if !params_content.is_empty() {
        write_header(&mut buf, TYPE_PARAMS, 0, 0);
    }

    write_stream_records(&mut buf, TYPE_STDIN, &request.stdin);
    if !request.stdin.is_empty() {
        write_header(&mut buf, TYPE_STDIN, 0, 0);
    }

    buf
}

/// Decodes a responder's output stream into its `stdout`/`stderr` byte
/// streams, stopping at (and requiring) an `END_REQUEST` record.
pub fn decode_response(bytes: &[u8]) -> Result<FastCgiResponse, BridgeError> {
    let mut response = FastCgiResponse::default();
    let mut offset = 0usize;

    loop {
        if offset == bytes.len() {
            return Err(protocol_error("FastCGI stream ended without an END_REQUEST record"));
        }
        if offset + HEADER_LEN > bytes.len() {
            return Err(protocol_error("truncated FastCGI record header"));
        }

        let version = bytes[offset];
        if version != VERSION {
            return Err(protocol_error(format!("unexpected FastCGI version {version}")));
        }
        let record_type = bytes[offset + 1];
        let content_len = u16::from_be_bytes([bytes[offset + 4], bytes[offset + 5]]) as usize;
        let padding_len = bytes[offset + 6] as usize;

        let content_start = offset + HEADER_LEN;
        let content_end = content_start + content_len;
        let record_end = content_end + padding_len;
        if record_end > bytes.len() {
            return Err(protocol_error("truncated FastCGI record body"));
        }
        let content = &bytes[content_start..content_end];

        match record_type {
            TYPE_STDOUT => response.stdout.extend_from_slice(content),
            TYPE_STDERR => response.stderr.extend_from_slice(content),
            TYPE_END_REQUEST => {
                if content.len() < 8 {
                    return Err(protocol_error("END_REQUEST record shorter than 8 bytes"));
                }
                response.app_status = i32::from_be_bytes([content[0], content[1], content[2], content[3]]);
                response.protocol_status = content[4];
                return Ok(response);
            }
            other => {
                return Err(protocol_error(format!("unexpected FastCGI record type {other} in response stream")));
            }
        }

        offset = record_end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn encode_request_round_trips_through_a_hand_rolled_echo() {
        let mut params = BTreeMap::new();
        params.insert("REQUEST_METHOD".to_string(), "GET".to_string());
        let request = FastCgiRequest::new(params, b"hello".to_vec());
        let bytes = encode_request(&request);

        // version, BEGIN_REQUEST, then PARAMS (non-empty + terminator), then STDIN (non-empty + terminator)
        assert_eq!(bytes[0], VERSION);
        assert_eq!(bytes[1], TYPE_BEGIN_REQUEST);
    }

    #[test]
    fn decode_response_reassembles_chunked_stdout() {
        let mut bytes = Vec::new();
        write_header(&mut bytes, TYPE_STDOUT, 5, 3);
        bytes.extend_from_slice(b"hello");
        bytes.extend_from_slice(&[0u8; 3]);
        write_header(&mut bytes, TYPE_STDOUT, 0, 0);
        write_header(&mut bytes, TYPE_END_REQUEST, 8, 0);
        bytes.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 0]);

        let response = decode_response(&bytes).unwrap();
        assert_eq!(response.stdout, b"hello");
        assert_eq!(response.protocol_status, 0);
    }

    #[test]
    fn decode_response_rejects_missing_end_request() {
        let mut bytes = Vec::new();
        write_header(&mut bytes, TYPE_STDOUT, 2, 0);
        bytes.extend_from_slice(b"hi");

        let err = decode_response(&bytes).unwrap_err();
        assert_eq!(err.kind, BridgeErrorKind::ProtocolError);
    }

    #[test]
    fn decode_response_rejects_truncated_body() {
        let mut bytes = Vec::new();
        write_header(&mut bytes, TYPE_STDOUT, 10, 0);
        bytes.extend_from_slice(b"short");

        let err = decode_response(&bytes).unwrap_err();
        assert_eq!(err.kind, BridgeErrorKind::ProtocolError);
    }

    #[test]
    fn decode_response_captures_stderr_separately() {
        let mut bytes = Vec::new();
        write_header(&mut bytes, TYPE_STDERR, 4, 4);
        bytes.extend_from_slice(b"oops");
        bytes.extend_from_slice(&[0u8; 4]);
        write_header(&mut bytes, TYPE_END_REQUEST, 8, 0);
        bytes.extend_from_slice(&[0u8; 8]);

        let response = decode_response(&bytes).unwrap();
        assert_eq!(response.stderr, b"oops");
        assert!(response.stdout.is_empty());
    }
}
