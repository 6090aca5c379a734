use std::collections::BTreeMap;

/// A normalized HTTP event, already extracted from whatever platform
/// envelope (API Gateway v1/v2, ALB, ...) delivered it. Producing this
/// value is an external collaborator's job; the bridge only consumes it.
#[derive(Debug, Clone)]
pub struct HttpRequestEvent {
    pub method: String,
    pub uri: String,
    pub path: String,
    pub query_string: String,
    pub protocol: String,
    pub server_name: String,
    pub server_port: u16,
    pub remote_port: u16,
    /// Lowercase header name -> ordered list of values as received.
    pub headers: BTreeMap<String, Vec<String>>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    /// Selects how the response translator encodes repeated headers.
    pub has_multi_header: bool,
    /// Opaque per-platform request context, forwarded to the worker
    /// verbatim as JSON (`LAMBDA_REQUEST_CONTEXT` / `LAMBDA_CONTEXT`).
    pub request_context: serde_json::Value,
}

impl HttpRequestEvent {
    /// Convenience builder for tests and minimal embedders: a GET with no
    /// body, no extra headers, and an empty request context.
    pub fn get(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            method: "GET".to_string(),
            uri: path.clone(),
            path,
            query_string: String::new(),
            protocol: "HTTP/1.1".to_string(),
            server_name: "localhost".to_string(),
            server_port: 80,
            remote_port: 0,
            headers: BTreeMap::new(),
            content_type: None,
            body: Vec::new(),
            has_multi_header: false,
            request_context: serde_json::Value::Null,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.entry(name.into().to_ascii_lowercase()).or_default().push(value.into());
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }
}
