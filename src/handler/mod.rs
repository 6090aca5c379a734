//! Top-level facade a FaaS runtime entrypoint drives: start the worker
//! once, hand it one HTTP event at a time, stop it on shutdown.

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::interrupter::DeadlineInterrupter;
use crate::logging;
use crate::model::{Context, HttpRequestEvent, HttpResponse};
use crate::supervisor::WorkerSupervisor;
use crate::translator;
use crate::transport;

pub struct HandlerFacade {
    config: BridgeConfig,
    supervisor: WorkerSupervisor,
    interrupter: DeadlineInterrupter,
}

impl HandlerFacade {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            supervisor: WorkerSupervisor::new(config.clone()),
            config,
            interrupter: DeadlineInterrupter::new(),
        }
    }

    pub fn start(&self) -> Result<(), BridgeError> {
        self.supervisor.start()?;
        self.interrupter.attach();
        Ok(())
    }

    pub fn stop(&self) -> Result<(), BridgeError> {
        self.interrupter.detach();
        self.supervisor.stop()
    }

    /// Serves one HTTP event through the worker.
    ///
    /// Per-invocation failures (transport errors, a malformed FastCGI
    /// reply, a deadline fire) never reach the caller as `Err` — they are
    /// turned into the fixed transport-error page so a single bad
    /// invocation doesn't take down the bridge's own event loop.
    /// Supervisor-scoped failures do reach the caller as `Err`: the
    /// post-request liveness probe's `WorkerCrashed`, and arming the
    /// deadline interrupter before a worker has ever been attached
    /// (`InterrupterUnavailable`, e.g. `handle_request` called before
    /// `start`) — both let the runtime loop end the sandbox rather than
    /// keep serving through a worker that is gone or was never there.
    pub fn handle_request(
        &self,
        event: &HttpRequestEvent,
        context: &Context,
        now_ms: i64,
    ) -> Result<HttpResponse, BridgeError> {
        logging::contract_line(format!("URL RequestId: {} Path: {}", context.aws_request_id, event.uri));

        self.supervisor.mark_serving();
        self.interrupter.arm(context.remaining_ms(now_ms))?;

        let request = translator::build_request(event, context, &self.config.handler_path);
        let result = transport::send_request(
            &self.config.socket_path,
            &request,
            self.config.connect_timeout(),
            self.config.read_timeout(),
            Some(&self.interrupter),
        );

        self.interrupter.reset();

        let response = match result.and_then(|fastcgi_response| translator::translate_response(&fastcgi_response, event.has_multi_header)) {
            Ok(response) => response,
            Err(err) => {
                logging::contract_line(format!("Exception: {err}"));
                HttpResponse::fixed_transport_error_page()
            }
        };

        self.supervisor.probe_liveness()?;
        self.supervisor.mark_ready();

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeErrorKind;

    #[test]
    fn handle_request_fails_when_no_worker_was_ever_attached() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BridgeConfig::default();
        config.socket_path = dir.path().join("nonexistent.sock");
        config.connect_timeout_ms = 20;
        config.read_timeout_ms = 50;

        let facade = HandlerFacade::new(config);
        let event = HttpRequestEvent::get("/health");
        let context = Context::new("req-1", 10_000);

        let err = facade.handle_request(&event, &context, 0).unwrap_err();
        assert_eq!(err.kind, BridgeErrorKind::InterrupterUnavailable);
    }

    #[test]
    fn handle_request_returns_fixed_error_page_when_worker_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BridgeConfig::default();
        config.socket_path = dir.path().join("nonexistent.sock");
        config.connect_timeout_ms = 20;
        config.read_timeout_ms = 50;

        let facade = HandlerFacade::new(config);
        facade.interrupter.attach();
        let event = HttpRequestEvent::get("/health");
        let context = Context::new("req-1", 10_000);

        let response = facade.handle_request(&event, &context, 0).unwrap();
        assert_eq!(response.status, 500);
        assert!(std::str::from_utf8(&response.body).unwrap().contains("4711"));
    }
}
