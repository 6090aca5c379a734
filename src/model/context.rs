/// The invocation context supplied by the FaaS runtime loop: the
/// platform's request id and absolute deadline, plus whatever extra
/// carry fields the platform attaches (serialized verbatim as JSON into
/// the worker's environment).
#[derive(Debug, Clone)]
pub struct Context {
    pub aws_request_id: String,
    /// Absolute epoch-millis after which the platform may kill the
    /// sandbox without warning.
    pub deadline_ms: i64,
    pub carry: serde_json::Value,
}

impl Context {
    pub fn new(aws_request_id: impl Into<String>, deadline_ms: i64) -> Self {
        Self { aws_request_id: aws_request_id.into(), deadline_ms, carry: serde_json::Value::Null }
    }

    /// Milliseconds remaining until the deadline, measured against a
    /// caller-supplied "now" so callers control the time source (and
    /// tests can use an arbitrary origin instead of wall-clock time).
    pub fn remaining_ms(&self, now_ms: i64) -> i64 {
        self.deadline_ms - now_ms
    }
}
