use std::collections::BTreeMap;

use super::header_value::HeaderValue;

/// The bridge's output: an HTTP response ready for the caller to fold
/// back into the platform's response envelope.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Lowercase header name -> value (single string or ordered list,
    /// per the originating event's `has_multi_header` flag).
    pub headers: BTreeMap<String, HeaderValue>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, headers: BTreeMap<String, HeaderValue>, body: Vec<u8>) -> Self {
        Self { status, headers, body }
    }

    /// The fixed 500 error page the handler facade returns when the
    /// transport fails. The literal `Code: 4711` token is a stable
    /// marker operators key monitoring alerts off of — never change it.
    pub fn fixed_transport_error_page() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), HeaderValue::Single("text/html".to_string()));
        let body = b"<html><body><h1>Internal Server Error</h1><p>Code: 4711</p></body></html>".to_vec();
        Self { status: 500, headers, body }
    }
}
