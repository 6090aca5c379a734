//! A small leveled logging facility for the bridge, independent of the
//! ambient `log`/`tracing` ecosystem.
//!
//! The sandbox only has one place worth writing to: standard error. The
//! platform captures it as the invocation's logs, and the worker's own
//! stdout/stderr are inherited onto the same stream (see `supervisor`).
//! This module exists so the crate's own diagnostics share that stream
//! without contending with the contract-shaped lines the handler facade
//! writes verbatim (see `handler::HandlerFacade`), and so callers embedding the
//! bridge can dial verbosity up or down without reaching for a global
//! logger they may not control.

use chrono::Utc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LogLevel::Off => "OFF",
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        };
        f.write_str(label)
    }
}

static CURRENT_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);
static INIT_FROM_ENV: OnceLock<()> = OnceLock::new();

fn apply_env_override() {
    INIT_FROM_ENV.get_or_init(|| {
        if let Ok(raw) = std::env::var("FCGI_BRIDGE_LOG") {
            if let Some(level) = parse_level(&raw) {
                CURRENT_LEVEL.store(level as u8, Ordering::Relaxed);
            }
        }
    });
}

fn parse_level(raw: &str) -> Option<LogLevel> {
    match raw.to_ascii_lowercase().as_str() {
        "off" => Some(LogLevel::Off),
        "error" => Some(LogLevel::Error),
        "warn" | "warning" => Some(LogLevel::Warn),
        "info" => Some(LogLevel::Info),
        "debug" => Some(LogLevel::Debug),
        "trace" => Some(LogLevel::Trace),
        _ => None,
    }
}

/// Override the current log level programmatically (tests, embedders).
pub fn set_level(level: LogLevel) {
    CURRENT_LEVEL.store(level as u8, Ordering::Relaxed);
}

fn enabled(level: LogLevel) -> bool {
    apply_env_override();
    (level as u8) <= CURRENT_LEVEL.load(Ordering::Relaxed)
}

fn emit(level: LogLevel, message: &str) {
    if !enabled(level) {
        return;
    }
    let ts = Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    eprintln!("{} - [{}] {}", ts, level, message);
}

pub fn error<S: Into<String>>(message: S) {
    emit(LogLevel::Error, &message.into());
}

pub fn warn<S: Into<String>>(message: S) {
    emit(LogLevel::Warn, &message.into());
}

pub fn info<S: Into<String>>(message: S) {
    emit(LogLevel::Info, &message.into());
}

pub fn debug<S: Into<String>>(message: S) {
    emit(LogLevel::Debug, &message.into());
}

pub fn trace<S: Into<String>>(message: S) {
    emit(LogLevel::Trace, &message.into());
}

/// Writes a line to standard error verbatim, with no timestamp or level
/// prefix and ungated by the current log level. Reserved for the two
/// lines the handler facade's external contract names exactly —
/// `"URL RequestId: ..."` and `"Exception: ..."` — which platform log
/// ingestion depends on matching byte-for-byte at the start of the line.
pub fn contract_line<S: AsRef<str>>(message: S) {
    eprintln!("{}", message.as_ref());
}
