use std::fmt;

/// Every distinguished failure mode the bridge can raise.
///
/// Supervisor-scoped kinds are fatal: the caller should let the sandbox
/// terminate rather than try to recover in-process. Per-invocation kinds
/// are expected to be caught by the handler facade and turned into either
/// a fixed error response or a structured `DeadlineReached` unwind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeErrorKind {
    WorkerFailedToStart,
    WorkerStartTimeout,
    WorkerReclaimTimeout,
    WorkerCrashed,
    WorkerStopFailed,

    TransportConnectFailed,
    TransportReadFailed,
    TransportTimeout,

    ProtocolError,

    DeadlineReached,
    InterrupterUnavailable,

    /// Malformed or unreadable configuration override. Not named in the
    /// original error taxonomy (which assumes fixed contract paths), but
    /// startup-time misconfiguration is fatal the same way the named
    /// supervisor kinds are.
    Configuration,
}

impl BridgeErrorKind {
    /// Supervisor-scoped kinds poison the sandbox; everything else is
    /// scoped to the single invocation that raised it.
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            BridgeErrorKind::WorkerFailedToStart
                | BridgeErrorKind::WorkerStartTimeout
                | BridgeErrorKind::WorkerReclaimTimeout
                | BridgeErrorKind::WorkerCrashed
                | BridgeErrorKind::WorkerStopFailed
                | BridgeErrorKind::InterrupterUnavailable
                | BridgeErrorKind::Configuration
        )
    }
}

impl fmt::Display for BridgeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BridgeErrorKind::WorkerFailedToStart => "WorkerFailedToStart",
            BridgeErrorKind::WorkerStartTimeout => "WorkerStartTimeout",
            BridgeErrorKind::WorkerReclaimTimeout => "WorkerReclaimTimeout",
            BridgeErrorKind::WorkerCrashed => "WorkerCrashed",
            BridgeErrorKind::WorkerStopFailed => "WorkerStopFailed",
            BridgeErrorKind::TransportConnectFailed => "TransportConnectFailed",
            BridgeErrorKind::TransportReadFailed => "TransportReadFailed",
            BridgeErrorKind::TransportTimeout => "TransportTimeout",
            BridgeErrorKind::ProtocolError => "ProtocolError",
            BridgeErrorKind::DeadlineReached => "DeadlineReached",
            BridgeErrorKind::InterrupterUnavailable => "InterrupterUnavailable",
            BridgeErrorKind::Configuration => "Configuration",
        };
        f.write_str(label)
    }
}
