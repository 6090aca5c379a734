use std::collections::BTreeMap;
use std::path::Path;

use crate::fastcgi::FastCgiRequest;
use crate::model::{Context, HttpRequestEvent};

/// Builds the CGI/1.1 parameter set (plus the Lambda-specific additions)
/// a responder expects for one request. Header names are mapped to
/// `HTTP_<NAME>` with dashes turned into underscores and the name
/// upper-cased, same as every other CGI gateway; when an event carries
/// more than one value for a header, the last one wins, since `PARAMS`
/// has no way to carry repeated keys. `handler_path` is the front
/// controller fixed at construction time (`SCRIPT_FILENAME`), never the
/// event's own path.
pub fn build_request(event: &HttpRequestEvent, context: &Context, handler_path: &Path) -> FastCgiRequest {
    let mut params = BTreeMap::new();

    params.insert("GATEWAY_INTERFACE".to_string(), "CGI/1.1".to_string());
    params.insert("SERVER_PROTOCOL".to_string(), event.protocol.clone());
    params.insert("REQUEST_METHOD".to_string(), event.method.clone());
    params.insert("REQUEST_URI".to_string(), event.uri.clone());
    params.insert("SCRIPT_FILENAME".to_string(), handler_path.to_string_lossy().into_owned());
    params.insert("SCRIPT_NAME".to_string(), event.path.clone());
    params.insert("PATH_INFO".to_string(), event.path.clone());
    params.insert("QUERY_STRING".to_string(), event.query_string.clone());
    params.insert("SERVER_NAME".to_string(), event.server_name.clone());
    params.insert("SERVER_PORT".to_string(), event.server_port.to_string());
    params.insert("SERVER_ADDR".to_string(), "127.0.0.1".to_string());
    params.insert("REMOTE_ADDR".to_string(), "127.0.0.1".to_string());
    params.insert("REMOTE_PORT".to_string(), event.remote_port.to_string());
    params.insert("CONTENT_LENGTH".to_string(), event.body.len().to_string());
    params.insert("REDIRECT_STATUS".to_string(), "200".to_string());

    if let Some(content_type) = &event.content_type {
        params.insert("CONTENT_TYPE".to_string(), content_type.clone());
    }

    for (name, values) in &event.headers {
        if let Some(last) = values.last() {
            params.insert(http_env_name(name), last.clone());
        }
    }

    let invocation_context = serde_json::to_string(&context.carry).unwrap_or_default();
    params.insert("LAMBDA_INVOCATION_CONTEXT".to_string(), invocation_context.clone());
    params.insert("LAMBDA_CONTEXT".to_string(), invocation_context);
    if !event.request_context.is_null() {
        params.insert(
            "LAMBDA_REQUEST_CONTEXT".to_string(),
            serde_json::to_string(&event.request_context).unwrap_or_default(),
        );
    }
    params.insert("AWS_REQUEST_ID".to_string(), context.aws_request_id.clone());

    FastCgiRequest::new(params, event.body.clone())
}

fn http_env_name(header_name: &str) -> String {
    let mut env_name = String::with_capacity(header_name.len() + 5);
    env_name.push_str("HTTP_");
    for ch in header_name.chars() {
        if ch == '-' {
            env_name.push('_');
        } else {
            env_name.extend(ch.to_uppercase());
        }
    }
    env_name
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> std::path::PathBuf {
        std::path::PathBuf::from("/var/task/public/index.php")
    }

    #[test]
    fn http_env_name_uppercases_and_replaces_dashes() {
        assert_eq!(http_env_name("x-forwarded-for"), "HTTP_X_FORWARDED_FOR");
        assert_eq!(http_env_name("Accept"), "HTTP_ACCEPT");
    }

    #[test]
    fn build_request_maps_method_and_uri() {
        let event = HttpRequestEvent::get("/hello?x=1").with_header("X-Test", "abc");
        let context = Context::new("req-1", 0);
        let request = build_request(&event, &context, &handler());
        assert_eq!(request.params.get("REQUEST_METHOD").unwrap(), "GET");
        assert_eq!(request.params.get("HTTP_X_TEST").unwrap(), "abc");
    }

    #[test]
    fn build_request_uses_the_configured_handler_path_not_the_event_path() {
        let event = HttpRequestEvent::get("/hello");
        let context = Context::new("req-1b", 0);
        let request = build_request(&event, &context, &handler());
        assert_eq!(request.params.get("SCRIPT_FILENAME").unwrap(), "/var/task/public/index.php");
        assert_eq!(request.params.get("PATH_INFO").unwrap(), "/hello");
        assert_eq!(request.params.get("REDIRECT_STATUS").unwrap(), "200");
    }

    #[test]
    fn build_request_last_header_value_wins() {
        let event = HttpRequestEvent::get("/").with_header("X-Dup", "first").with_header("X-Dup", "second");
        let context = Context::new("req-2", 0);
        let request = build_request(&event, &context, &handler());
        assert_eq!(request.params.get("HTTP_X_DUP").unwrap(), "second");
    }

    #[test]
    fn build_request_serializes_invocation_context() {
        let event = HttpRequestEvent::get("/");
        let mut context = Context::new("req-3", 0);
        context.carry = serde_json::json!({"functionName": "demo"});
        let request = build_request(&event, &context, &handler());
        assert_eq!(request.params.get("LAMBDA_INVOCATION_CONTEXT").unwrap(), "{\"functionName\":\"demo\"}");
        assert_eq!(request.params.get("LAMBDA_CONTEXT").unwrap(), request.params.get("LAMBDA_INVOCATION_CONTEXT").unwrap());
    }
}
