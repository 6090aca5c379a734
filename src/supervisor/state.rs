use std::fmt;

/// Lifecycle of the supervised worker process. `Crashed` is terminal: a
/// fresh `start()` is required to leave it, same as from `Absent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Absent,
    Starting,
    Ready,
    Serving,
    Stopping,
    Crashed,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WorkerState::Absent => "Absent",
            WorkerState::Starting => "Starting",
            WorkerState::Ready => "Ready",
            WorkerState::Serving => "Serving",
            WorkerState::Stopping => "Stopping",
            WorkerState::Crashed => "Crashed",
        };
        write!(f, "{label}")
    }
}
