use std::path::Path;
use std::time::Duration;

use geosync_lifecycle::{
    InMemoryProcessTable, LifecycleController, LifecycleError, ProcessHandle, ServiceSpec, StopOutcome, Temper,
};
use tempfile::tempdir;

fn spec(dir: &Path, start: &[&str]) -> ServiceSpec {
    ServiceSpec {
        signature: "serve.py".into(),
        start: start.iter().map(|s| s.to_string()).collect(),
        workdir: dir.to_path_buf(),
        logs_dir: dir.join("logs"),
        log_prefix: "service".into(),
        graceful_timeout: Duration::ZERO,
        poll_interval: Duration::ZERO,
        kill_wait: Duration::ZERO,
        startup_grace: Duration::from_millis(300),
    }
}

fn handle(pid: u32) -> ProcessHandle {
    ProcessHandle {
        pid,
        cmdline: "python3 serve.py".into(),
    }
}

#[test]
fn polite_process_stops_gracefully() {
    let dir = tempdir().unwrap();
    let table = InMemoryProcessTable::new().with_process(10, "python3 serve.py", Temper::Polite);
    let ctl = LifecycleController::new(table, spec(dir.path(), &[]));

    assert_eq!(ctl.find_running(), Some(handle(10)));
    assert_eq!(ctl.stop(&handle(10)).unwrap(), StopOutcome::Graceful);
    assert_eq!(ctl.table().signals(), vec![(10, "term")]);
    assert_eq!(ctl.find_running(), None);
}

#[test]
fn stubborn_process_is_killed() {
    let dir = tempdir().unwrap();
    let table = InMemoryProcessTable::new().with_process(11, "python3 serve.py", Temper::Stubborn);
    let ctl = LifecycleController::new(table, spec(dir.path(), &[]));

    assert_eq!(ctl.stop(&handle(11)).unwrap(), StopOutcome::Forced);
    assert_eq!(ctl.table().signals(), vec![(11, "term"), (11, "kill")]);
}

#[test]
fn failed_stop_never_starts_a_second_instance() {
    let dir = tempdir().unwrap();
    let table = InMemoryProcessTable::new().with_process(12, "python3 serve.py", Temper::Unkillable);
    let ctl = LifecycleController::new(table, spec(dir.path(), &["/definitely/not/a/binary"]));

    let err = ctl.restart().unwrap_err();
    assert!(matches!(err, LifecycleError::Unstoppable { pid: 12 }));
    assert!(!dir.path().join("logs").exists());
}

#[test]
fn finds_lowest_matching_pid_only() {
    let dir = tempdir().unwrap();
    let table = InMemoryProcessTable::new()
        .with_process(30, "python3 serve.py --port 5001", Temper::Polite)
        .with_process(20, "python3 serve.py", Temper::Polite)
        .with_process(5, "vim notes.txt", Temper::Polite);
    let ctl = LifecycleController::new(table, spec(dir.path(), &[]));
    assert_eq!(ctl.find_running().map(|h| h.pid), Some(20));
}

#[test]
fn missing_start_command_is_reported() {
    let dir = tempdir().unwrap();
    let ctl = LifecycleController::new(InMemoryProcessTable::new(), spec(dir.path(), &[]));
    assert!(matches!(ctl.start(), Err(LifecycleError::NoStartCommand)));
}

#[cfg(unix)]
mod unix {
    use super::*;
    use geosync_lifecycle::{ProcessTable, SysinfoProcessTable};

    #[test]
    fn early_exit_fails_and_names_the_log() {
        let dir = tempdir().unwrap();
        let ctl = LifecycleController::new(
            InMemoryProcessTable::new(),
            spec(dir.path(), &["sh", "-c", "echo boom; exit 3"]),
        );

        match ctl.start() {
            Err(LifecycleError::ExitedEarly { code, log }) => {
                assert_eq!(code, Some(3));
                assert!(log.starts_with(dir.path().join("logs")));
                assert!(std::fs::read_to_string(&log).unwrap().contains("boom"));
            }
            other => panic!("expected early exit, got {other:?}"),
        }
    }

    #[test]
    fn not_running_restart_starts_directly() {
        let dir = tempdir().unwrap();
        let ctl = LifecycleController::new(InMemoryProcessTable::new(), spec(dir.path(), &["sleep", "30"]));

        let outcome = ctl.restart().unwrap();
        assert!(outcome.stopped.is_none());
        assert!(outcome.started.log_path.exists());

        let table = SysinfoProcessTable::new();
        let pid = outcome.started.pid;
        assert!(table.is_alive(pid));
        assert!(table.kill(pid));
        let mut dead = false;
        for _ in 0..20 {
            if !table.is_alive(pid) {
                dead = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(100));
        }
        assert!(dead);
    }
}
