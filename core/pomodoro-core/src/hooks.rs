//! Fire-and-forget hook dispatcher (spec §4.G).
//!
//! `{config_dir}/hooks/start` and `{config_dir}/hooks/stop` are invoked with
//! the hook JSON payload on stdin. Dispatch failures never surface: the
//! event is already durably persisted by the time a hook runs, so a missing
//! executable or a spawn error is just logged and swallowed.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use pomodoro_protocol::{HookPayload, Session, SessionEvent};

pub struct HookDispatcher {
    config_dir: PathBuf,
}

impl HookDispatcher {
    pub fn new(config_dir: PathBuf) -> Self {
        HookDispatcher { config_dir }
    }

    /// Fires the hook for `event`, if one is installed. Never returns an
    /// error to the caller: every failure path is logged and swallowed.
    pub fn dispatch(&self, session: &Session, event: &SessionEvent) {
        let hook_path = self.config_dir.join("hooks").join(event.kind.hook_name());

        if !is_executable(&hook_path) {
            tracing::debug!(hook = %hook_path.display(), "skipping hook, not present or not executable");
            return;
        }

        let payload = HookPayload::new(session, event);
        let body = match serde_json::to_vec(&payload) {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize hook payload");
                return;
            }
        };

        let child = Command::new(&hook_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        let mut child = match child {
            Ok(child) => child,
            Err(err) => {
                tracing::warn!(hook = %hook_path.display(), error = %err, "failed to spawn hook");
                return;
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(err) = stdin.write_all(&body) {
                tracing::warn!(hook = %hook_path.display(), error = %err, "failed to write hook payload");
            }
        }

        match child.wait() {
            Ok(_status) => {
                tracing::debug!(hook = %hook_path.display(), event = %event.kind, "hook finished");
            }
            Err(err) => {
                tracing::warn!(hook = %hook_path.display(), error = %err, "failed to wait on hook child");
            }
        }
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
