mod context;
mod header_value;
mod http_request_event;
mod http_response;

pub use context::Context;
pub use header_value::HeaderValue;
pub use http_request_event::HttpRequestEvent;
pub use http_response::HttpResponse;
