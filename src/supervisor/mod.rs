//! Spawns and supervises the local FastCGI worker process: starts it,
//! waits for its listen socket to come up, reclaims a stale worker left
//! behind by a previous sandbox lifetime, probes liveness between
//! requests, and stops it gracefully.

mod pidfile;
mod state;

use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;
use std::time::Instant;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeErrorKind};
use crate::logging;

pub use state::WorkerState;

pub struct WorkerSupervisor {
    config: BridgeConfig,
    state: Mutex<WorkerState>,
    child: Mutex<Option<Child>>,
}

impl WorkerSupervisor {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            state: Mutex::new(WorkerState::Absent),
            child: Mutex::new(None),
        }
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock().unwrap()
    }

    /// Reclaims any worker left over from a previous sandbox lifetime,
    /// then spawns a fresh one and blocks until its listen socket is
    /// accepting connections or `readiness_timeout_ms` elapses.
    pub fn start(&self) -> Result<(), BridgeError> {
        *self.state.lock().unwrap() = WorkerState::Starting;

        if let Some(parent) = self.config.socket_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| BridgeError::from_io(BridgeErrorKind::WorkerFailedToStart, err))?;
        }

        self.reclaim_stale_worker()?;
        let _ = std::fs::remove_file(&self.config.socket_path);

        let child = Command::new(&self.config.worker_binary)
            .arg("--nodaemonize")
            .arg("--force-stderr")
            .arg("--fpm-config")
            .arg(&self.config.worker_config_path)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            // Own process group so a reused parent pid can never collide
            // with a pid the reclaim algorithm is watching; see the
            // self-pid guard below, kept for platforms where this isn't
            // honored.
            .process_group(0)
            .spawn()
            .map_err(|err| BridgeError::from_io(BridgeErrorKind::WorkerFailedToStart, err))?;

        let pid = child.id() as i32;
        logging::info(format!("worker spawned, pid {pid}"));
        pidfile::write_pid(&self.config.pid_path, pid)
            .map_err(|err| BridgeError::from_io(BridgeErrorKind::WorkerFailedToStart, err))?;
        *self.child.lock().unwrap() = Some(child);

        self.wait_for_socket()?;

        *self.state.lock().unwrap() = WorkerState::Ready;
        Ok(())
    }

    fn wait_for_socket(&self) -> Result<(), BridgeError> {
        let deadline = Instant::now() + self.config.readiness_timeout();
        loop {
            if self.config.socket_path.exists() && std::os::unix::net::UnixStream::connect(&self.config.socket_path).is_ok() {
                return Ok(());
            }
            if let Some(status) = self.try_wait_child() {
                return Err(BridgeError::new(
                    BridgeErrorKind::WorkerFailedToStart,
                    format!("worker exited during startup with status {status}"),
                ));
            }
            if Instant::now() >= deadline {
                return Err(BridgeError::new_with_kind_only(BridgeErrorKind::WorkerStartTimeout));
            }
            std::thread::sleep(self.config.readiness_poll());
        }
    }

    fn try_wait_child(&self) -> Option<std::process::ExitStatus> {
        let mut guard = self.child.lock().unwrap();
        let child = guard.as_mut()?;
        child.try_wait().ok().flatten()
    }

    /// Steps through the reclaim algorithm: a previous sandbox froze
    /// mid-invocation iff the socket file `S` is still present. Each step
    /// below is terminal on success, in the order the spec names them —
    /// missing pid file, unparsable/non-positive pid, a dead process, our
    /// own pid (guarding against pid reuse), then finally a live process
    /// that actually needs signaling.
    fn reclaim_stale_worker(&self) -> Result<(), BridgeError> {
        if !self.config.socket_path.exists() {
            return Ok(());
        }

        let Some(pid) = pidfile::read_pid(&self.config.pid_path) else {
            logging::info("stale socket found with no pid file, removing socket");
            return Ok(());
        };

        if pid <= 0 {
            logging::warn(format!("stale pid file contains non-positive pid {pid}, discarding"));
            let _ = std::fs::remove_file(&self.config.pid_path);
            return Ok(());
        }

        if pid == std::process::id() as i32 {
            logging::warn("stale pid file names this supervisor's own pid, discarding without signaling");
            let _ = std::fs::remove_file(&self.config.pid_path);
            return Ok(());
        }

        if !process_alive(pid) {
            logging::info(format!("stale pid {pid} names no live process, discarding"));
            let _ = std::fs::remove_file(&self.config.pid_path);
            return Ok(());
        }

        logging::info(format!("reclaiming live stale worker pid {pid}"));
        if !send_signal(pid, Signal::SIGTERM) {
            logging::info(format!("pid {pid} vanished before it could be signaled, discarding"));
            let _ = std::fs::remove_file(&self.config.pid_path);
            return Ok(());
        }

        let deadline = Instant::now() + self.config.reclaim_timeout();
        while process_alive(pid) {
            if Instant::now() >= deadline {
                return Err(BridgeError::new_with_kind_only(BridgeErrorKind::WorkerReclaimTimeout));
            }
            std::thread::sleep(self.config.reclaim_poll());
        }

        let _ = std::fs::remove_file(&self.config.pid_path);
        Ok(())
    }

    /// Confirms the supervised child is still running. Called after
    /// every request; transitions to `Crashed` and surfaces
    /// `WorkerCrashed` the first time it finds the child gone.
    pub fn probe_liveness(&self) -> Result<(), BridgeError> {
        if let Some(status) = self.try_wait_child() {
            *self.state.lock().unwrap() = WorkerState::Crashed;
            return Err(BridgeError::new(
                BridgeErrorKind::WorkerCrashed,
                format!("worker exited with status {status}"),
            ));
        }
        Ok(())
    }

    pub fn mark_serving(&self) {
        *self.state.lock().unwrap() = WorkerState::Serving;
    }

    pub fn mark_ready(&self) {
        *self.state.lock().unwrap() = WorkerState::Ready;
    }

    /// Sends `SIGTERM` and waits up to `stop_grace_ms` for the listen
    /// socket to stop resolving. If it still resolves after grace, the
    /// worker failed to stop and that's surfaced as `WorkerStopFailed`
    /// rather than papered over by force-removing the socket.
    pub fn stop(&self) -> Result<(), BridgeError> {
        *self.state.lock().unwrap() = WorkerState::Stopping;

        let mut guard = self.child.lock().unwrap();
        let Some(child) = guard.as_mut() else {
            *self.state.lock().unwrap() = WorkerState::Absent;
            return Ok(());
        };

        let pid = child.id() as i32;
        send_signal(pid, Signal::SIGTERM);

        let deadline = Instant::now() + self.config.stop_grace();
        let exited = loop {
            if let Ok(Some(_)) = child.try_wait() {
                break true;
            }
            if Instant::now() >= deadline {
                break false;
            }
            std::thread::sleep(self.config.stop_poll());
        };

        if !exited && socket_still_resolves(&self.config.socket_path) {
            logging::warn(format!("worker pid {pid} did not exit and its socket still resolves after grace"));
            return Err(BridgeError::new_with_kind_only(BridgeErrorKind::WorkerStopFailed));
        }

        *guard = None;
        drop(guard);

        let _ = std::fs::remove_file(&self.config.socket_path);
        let _ = std::fs::remove_file(&self.config.pid_path);

        *self.state.lock().unwrap() = WorkerState::Absent;
        Ok(())
    }
}

fn socket_still_resolves(path: &std::path::Path) -> bool {
    std::os::unix::net::UnixStream::connect(path).is_ok()
}

fn process_alive(pid: i32) -> bool {
    match signal::kill(Pid::from_raw(pid), None::<Signal>) {
        Ok(()) => true,
        Err(nix::errno::Errno::ESRCH) => false,
        Err(_) => true,
    }
}

/// Sends `signal` to `pid`. Returns `false` when the kernel reports no
/// such process (`ESRCH`) — the caller should treat that the same as an
/// already-dead process rather than as a failure to report upward.
fn send_signal(pid: i32, signal: Signal) -> bool {
    match signal::kill(Pid::from_raw(pid), signal) {
        Ok(()) => true,
        Err(nix::errno::Errno::ESRCH) => false,
        Err(err) => {
            logging::warn(format!("failed to signal pid {pid}: {err}"));
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    fn test_config(dir: &std::path::Path) -> BridgeConfig {
        let mut config = BridgeConfig::default();
        config.socket_path = dir.join("worker.sock");
        config.pid_path = dir.join("worker.pid");
        config.readiness_timeout_ms = 300;
        config.readiness_poll_ms = 5;
        config.reclaim_timeout_ms = 200;
        config.reclaim_poll_ms = 5;
        config.stop_grace_ms = 200;
        config.stop_poll_ms = 5;
        config
    }

    #[test]
    fn reclaim_skips_when_pid_file_absent() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = WorkerSupervisor::new(test_config(dir.path()));
        assert!(supervisor.reclaim_stale_worker().is_ok());
    }

    #[test]
    fn reclaim_removes_pid_file_for_dead_pid() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let pid_path = config.pid_path.clone();
        std::fs::write(&config.socket_path, b"").unwrap();
        // A pid that is vanishingly unlikely to be alive right now.
        std::fs::write(&pid_path, "999999").unwrap();
        let supervisor = WorkerSupervisor::new(config);
        assert!(supervisor.reclaim_stale_worker().is_ok());
        assert!(!pid_path.exists());
    }

    #[test]
    fn reclaim_removes_pid_file_for_non_positive_pid() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let pid_path = config.pid_path.clone();
        std::fs::write(&config.socket_path, b"").unwrap();
        std::fs::write(&pid_path, "0").unwrap();
        let supervisor = WorkerSupervisor::new(config);
        assert!(supervisor.reclaim_stale_worker().is_ok());
        assert!(!pid_path.exists());
    }

    #[test]
    fn reclaim_discards_self_pid_without_signaling_and_without_leaving_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let pid_path = config.pid_path.clone();
        std::fs::write(&config.socket_path, b"").unwrap();
        let mut file = std::fs::File::create(&pid_path).unwrap();
        write!(file, "{}", std::process::id()).unwrap();
        drop(file);

        let supervisor = WorkerSupervisor::new(config);
        assert!(supervisor.reclaim_stale_worker().is_ok());
        // Our own pid is never signaled; the stale file is discarded so a
        // fresh spawn can write its own pid over it.
        assert!(!pid_path.exists());
    }

    #[test]
    fn reclaim_is_a_no_op_when_socket_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let pid_path = config.pid_path.clone();
        // No socket file present: nothing froze, so the pid file (if any
        // stray one exists) must be left untouched.
        std::fs::write(&pid_path, "999999").unwrap();
        let supervisor = WorkerSupervisor::new(config);
        assert!(supervisor.reclaim_stale_worker().is_ok());
        assert!(pid_path.exists());
    }

    #[test]
    fn probe_liveness_is_ok_with_no_child() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = WorkerSupervisor::new(test_config(dir.path()));
        assert!(supervisor.probe_liveness().is_ok());
    }

    fn which(binary: &str) -> Option<std::path::PathBuf> {
        let path_var = std::env::var_os("PATH")?;
        std::env::split_paths(&path_var).map(|dir| dir.join(binary)).find(|candidate| candidate.exists())
    }

    #[test]
    fn stop_reports_worker_stop_failed_when_the_socket_survives_the_grace_period() {
        let Some(socat) = which("socat") else {
            eprintln!("skipping: socat not available in this environment");
            return;
        };

        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.stop_grace_ms = 200;
        config.stop_poll_ms = 5;

        // Traps SIGTERM so the grace period elapses with the worker (and
        // its listening socket) still very much alive.
        let script_path = dir.path().join("stubborn-worker.sh");
        let script = format!(
            "#!/bin/sh\ntrap '' TERM\nexec {socat} UNIX-LISTEN:{sock},fork SYSTEM:\"cat\"\n",
            socat = socat.display(),
            sock = config.socket_path.display(),
        );
        std::fs::write(&script_path, script).unwrap();
        let mut perms = std::fs::metadata(&script_path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&script_path, perms).unwrap();

        let supervisor = WorkerSupervisor::new({
            let mut c = config.clone();
            c.worker_binary = script_path.to_string_lossy().to_string();
            c.worker_config_path = dir.path().join("unused.conf");
            c
        });
        supervisor.start().expect("worker should start and become ready");

        let err = supervisor.stop().unwrap_err();
        assert_eq!(err.kind, BridgeErrorKind::WorkerStopFailed);

        // Clean up the still-running worker so the test process doesn't leak it.
        let _ = std::fs::read_to_string(&config.pid_path)
            .ok()
            .and_then(|s| s.trim().parse::<i32>().ok())
            .map(|pid| signal::kill(Pid::from_raw(pid), Signal::SIGKILL));
    }
}
