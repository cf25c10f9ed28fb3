use std::fs::File;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use geosync_core::SyncError;
use tracing::{info, warn};

const POLL: Duration = Duration::from_millis(200);

/// Run `argv` in `dir` with output appended to `log_path`, killing it once
/// `timeout` has passed.
pub fn run_with_timeout(argv: &[String], dir: &Path, timeout: Duration, log_path: &Path) -> Result<ExitStatus, SyncError> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| SyncError::ExternalFailure("empty command".into()))?;
    let label = argv.join(" ");

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let stdout = File::create(log_path)
        .map_err(|e| SyncError::ExternalFailure(format!("create log {}: {e}", log_path.display())))?;
    let stderr = stdout
        .try_clone()
        .map_err(|e| SyncError::ExternalFailure(format!("clone log handle: {e}")))?;

    let mut child = Command::new(program)
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr)
        .spawn()
        .map_err(|e| SyncError::ExternalFailure(format!("spawn {label}: {e}")))?;
    info!(command = %label, pid = child.id(), log = %log_path.display(), "started");

    let started = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) if status.success() => return Ok(status),
            Ok(Some(status)) => {
                return Err(SyncError::ExternalFailure(format!(
                    "{label} exited with {status}; see {}",
                    log_path.display()
                )))
            }
            Ok(None) => {}
            Err(e) => return Err(SyncError::ExternalFailure(format!("wait {label}: {e}"))),
        }
        if started.elapsed() >= timeout {
            warn!(command = %label, timeout_secs = timeout.as_secs(), "timed out; killing");
            let _ = child.kill();
            let _ = child.wait();
            return Err(SyncError::ExternalTimeout {
                what: label,
                secs: timeout.as_secs(),
            });
        }
        thread::sleep(POLL);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use geosync_core::ErrorKind;
    use tempfile::tempdir;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn success_writes_log() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("logs").join("p.log");
        run_with_timeout(&argv(&["sh", "-c", "echo fetched"]), dir.path(), Duration::from_secs(10), &log).unwrap();
        assert_eq!(std::fs::read_to_string(&log).unwrap().trim(), "fetched");
    }

    #[test]
    fn nonzero_exit_is_external_failure() {
        let dir = tempdir().unwrap();
        let err = run_with_timeout(&argv(&["sh", "-c", "exit 4"]), dir.path(), Duration::from_secs(10), &dir.path().join("p.log"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalFailure);
    }

    #[test]
    fn slow_command_times_out() {
        let dir = tempdir().unwrap();
        let err = run_with_timeout(&argv(&["sleep", "30"]), dir.path(), Duration::from_millis(300), &dir.path().join("p.log"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalTimeout);
    }
}
