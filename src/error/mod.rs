mod kind;

pub use kind::BridgeErrorKind;

use std::fmt;
use std::io;

/// The crate's single error type: a kind plus a human-readable message.
///
/// Mirrors the `{ kind, message }` shape used throughout this codebase's
/// other error types, but additionally implements [`std::error::Error`] so
/// it composes with `?` both inside the crate and at the boundary with
/// callers that wrap errors in `anyhow` or `Box<dyn Error>`.
#[derive(Debug)]
pub struct BridgeError {
    pub kind: BridgeErrorKind,
    pub message: String,
}

impl BridgeError {
    pub fn new(kind: BridgeErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn new_with_kind_only(kind: BridgeErrorKind) -> Self {
        Self { kind, message: String::new() }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }

    pub fn from_io(kind: BridgeErrorKind, err: io::Error) -> Self {
        Self::new(kind, err.to_string())
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for BridgeError {}
