//! Bridges FaaS-delivered HTTP events to a local FastCGI worker runtime
//! over a Unix domain socket, supervising the worker's lifecycle across
//! invocations of the same sandbox.

pub mod config;
pub mod error;
pub mod fastcgi;
pub mod handler;
pub mod interrupter;
pub mod logging;
pub mod model;
pub mod supervisor;
pub mod translator;
pub mod transport;

pub use config::BridgeConfig;
pub use error::{BridgeError, BridgeErrorKind};
pub use handler::HandlerFacade;
pub use model::{Context, HttpRequestEvent, HttpResponse};
