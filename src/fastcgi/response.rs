/// The decoded byte streams from a FastCGI responder's output, before
/// the response translator interprets the leading header block of
/// `stdout`. `stderr` bytes are forwarded to the bridge's own log, not
/// parsed.
#[derive(Debug, Clone, Default)]
pub struct FastCgiResponse {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// `appStatus` from the `END_REQUEST` record — the worker's own exit
    /// code for the request, not an HTTP status.
    pub app_status: i32,
    /// `protocolStatus` from `END_REQUEST`; `0` is `FCGI_REQUEST_COMPLETE`.
    pub protocol_status: u8,
}
