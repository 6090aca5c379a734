//! Configuration for the bridge: the fixed contract paths plus the
//! timeouts and polling intervals named throughout `supervisor` and
//! `transport`. All fields have defaults matching the spec; an optional
//! JSON file can override any subset of them, the same way this
//! codebase's configuration layer loads typed settings with field-level
//! defaults rather than requiring a complete file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{BridgeError, BridgeErrorKind};
use crate::logging;

const DEFAULT_SOCKET_PATH: &str = "/tmp/.bref/php-fpm.sock";
const DEFAULT_PID_PATH: &str = "/tmp/.bref/php-fpm.pid";
const DEFAULT_CONFIG_PATH: &str = "/opt/bref/etc/php-fpm.conf";
const DEFAULT_WORKER_BINARY: &str = "php-fpm";
const DEFAULT_HANDLER_PATH: &str = "/var/task/public/index.php";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub socket_path: PathBuf,
    pub pid_path: PathBuf,
    pub worker_config_path: PathBuf,
    pub worker_binary: String,
    /// `SCRIPT_FILENAME` for every request — the front controller the
    /// worker runtime should execute. Fixed per deployment image, not
    /// derived from the event's path.
    pub handler_path: PathBuf,

    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,

    pub readiness_poll_ms: u64,
    pub readiness_timeout_ms: u64,

    pub reclaim_poll_ms: u64,
    pub reclaim_timeout_ms: u64,

    pub stop_grace_ms: u64,
    pub stop_poll_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            pid_path: PathBuf::from(DEFAULT_PID_PATH),
            worker_config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            worker_binary: DEFAULT_WORKER_BINARY.to_string(),
            handler_path: PathBuf::from(DEFAULT_HANDLER_PATH),
            connect_timeout_ms: 1_000,
            read_timeout_ms: 30_000,
            readiness_poll_ms: 5,
            readiness_timeout_ms: 5_000,
            reclaim_poll_ms: 5,
            reclaim_timeout_ms: 1_000,
            stop_grace_ms: 2_000,
            stop_poll_ms: 5,
        }
    }
}

impl BridgeConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn readiness_poll(&self) -> Duration {
        Duration::from_millis(self.readiness_poll_ms)
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }

    pub fn reclaim_poll(&self) -> Duration {
        Duration::from_millis(self.reclaim_poll_ms)
    }

    pub fn reclaim_timeout(&self) -> Duration {
        Duration::from_millis(self.reclaim_timeout_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    pub fn stop_poll(&self) -> Duration {
        Duration::from_millis(self.stop_poll_ms)
    }

    /// Load defaults, then overlay a JSON override file if it exists.
    /// A missing file is not an error — it just means "use the defaults".
    pub fn load(override_path: &Path) -> Result<Self, BridgeError> {
        let mut config = Self::default();

        if !override_path.exists() {
            return Ok(config);
        }

        let raw = std::fs::read_to_string(override_path).map_err(|e| {
            BridgeError::new(
                BridgeErrorKind::Configuration,
                format!("failed to read bridge config override at {}: {e}", override_path.display()),
            )
        })?;

        config = merge_from_json(config, &raw, override_path)?;
        logging::debug(format!("Loaded bridge configuration override from {}", override_path.display()));
        Ok(config)
    }
}

fn merge_from_json(base: BridgeConfig, raw: &str, path: &Path) -> Result<BridgeConfig, BridgeError> {
    // Deserializing straight into BridgeConfig (with #[serde(default)])
    // would silently drop fields the file didn't mention back to the
    // *type's* default rather than the caller-supplied base, so merge
    // through a generic JSON value instead.
    let mut value = serde_json::to_value(&base).map_err(|e| {
        BridgeError::new(BridgeErrorKind::Configuration, format!("failed to serialize default bridge config: {e}"))
    })?;
    let overrides: serde_json::Value = serde_json::from_str(raw).map_err(|e| {
        BridgeError::new(
            BridgeErrorKind::Configuration,
            format!("invalid JSON in bridge config override at {}: {e}", path.display()),
        )
    })?;

    if let (Some(base_map), Some(override_map)) = (value.as_object_mut(), overrides.as_object()) {
        for (key, val) in override_map {
            base_map.insert(key.clone(), val.clone());
        }
    }

    serde_json::from_value(value).map_err(|e| {
        BridgeError::new(
            BridgeErrorKind::Configuration,
            format!("bridge config override at {} has invalid field types: {e}", path.display()),
        )
    })
}
