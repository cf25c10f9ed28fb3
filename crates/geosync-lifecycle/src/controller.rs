use std::fs::{self, File};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Local;
use thiserror::Error;
use tracing::{info, warn};

use crate::table::{ProcessHandle, ProcessTable};

/// How to recognise, start and stop the serving process.
#[derive(Clone, Debug)]
pub struct ServiceSpec {
    /// Substring of the command line that identifies a running instance.
    pub signature: String,
    /// argv used to start a fresh instance.
    pub start: Vec<String>,
    pub workdir: PathBuf,
    pub logs_dir: PathBuf,
    pub log_prefix: String,
    pub graceful_timeout: Duration,
    pub poll_interval: Duration,
    pub kill_wait: Duration,
    pub startup_grace: Duration,
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("process {pid} is still alive after a forced kill")]
    Unstoppable { pid: u32 },
    #[error("no start command configured")]
    NoStartCommand,
    #[error("open log {}: {source}", .path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("service exited during startup (code {code:?}); see {}", .log.display())]
    ExitedEarly { code: Option<i32>, log: PathBuf },
    #[error("could not poll started process: {0}")]
    Wait(#[source] std::io::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopOutcome {
    Graceful,
    Forced,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StartedService {
    pub pid: u32,
    pub log_path: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestartOutcome {
    /// The instance that was running before, and how it went down.
    pub stopped: Option<(ProcessHandle, StopOutcome)>,
    pub started: StartedService,
}

pub struct LifecycleController<T: ProcessTable> {
    table: T,
    spec: ServiceSpec,
}

impl<T: ProcessTable> LifecycleController<T> {
    pub fn new(table: T, spec: ServiceSpec) -> Self {
        Self { table, spec }
    }

    pub fn table(&self) -> &T {
        &self.table
    }

    pub fn spec(&self) -> &ServiceSpec {
        &self.spec
    }

    pub fn find_running(&self) -> Option<ProcessHandle> {
        self.table.find(&self.spec.signature)
    }

    /// Terminate, poll until the graceful timeout, then kill and wait briefly.
    pub fn stop(&self, handle: &ProcessHandle) -> Result<StopOutcome, LifecycleError> {
        info!(pid = handle.pid, "stopping service");
        if !self.table.terminate(handle.pid) {
            warn!(pid = handle.pid, "terminate signal not delivered");
        }

        let deadline = Instant::now() + self.spec.graceful_timeout;
        loop {
            if !self.table.is_alive(handle.pid) {
                info!(pid = handle.pid, "service stopped gracefully");
                return Ok(StopOutcome::Graceful);
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep(self.spec.poll_interval.min(deadline - now));
        }

        warn!(pid = handle.pid, timeout_secs = self.spec.graceful_timeout.as_secs(), "graceful stop timed out; killing");
        self.table.kill(handle.pid);
        thread::sleep(self.spec.kill_wait);
        if self.table.is_alive(handle.pid) {
            return Err(LifecycleError::Unstoppable { pid: handle.pid });
        }
        info!(pid = handle.pid, "service stopped (forced)");
        Ok(StopOutcome::Forced)
    }

    /// Spawn a detached instance with output going to a fresh timestamped log.
    /// Succeeds only if the child is still running after the startup grace.
    pub fn start(&self) -> Result<StartedService, LifecycleError> {
        let (program, args) = self.spec.start.split_first().ok_or(LifecycleError::NoStartCommand)?;

        let log_path = self
            .spec
            .logs_dir
            .join(format!("{}_{}.log", self.spec.log_prefix, Local::now().format("%Y%m%d_%H%M%S")));
        let log_err = |source| LifecycleError::LogFile {
            path: log_path.clone(),
            source,
        };
        fs::create_dir_all(&self.spec.logs_dir).map_err(log_err)?;
        let stdout = File::create(&log_path).map_err(log_err)?;
        let stderr = stdout.try_clone().map_err(log_err)?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(&self.spec.workdir)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr);
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // own process group so our exit does not take the service down
            cmd.process_group(0);
        }

        let mut child = cmd.spawn().map_err(|source| LifecycleError::Spawn {
            program: program.clone(),
            source,
        })?;
        info!(pid = child.id(), log = %log_path.display(), "service spawned");

        thread::sleep(self.spec.startup_grace);
        match child.try_wait().map_err(LifecycleError::Wait)? {
            Some(status) => Err(LifecycleError::ExitedEarly {
                code: status.code(),
                log: log_path,
            }),
            None => Ok(StartedService {
                pid: child.id(),
                log_path,
            }),
        }
    }

    /// Stop the running instance if there is one, then start a new one.
    /// A failed stop never leads to a second instance being started.
    pub fn restart(&self) -> Result<RestartOutcome, LifecycleError> {
        let stopped = match self.find_running() {
            Some(handle) => {
                info!(pid = handle.pid, cmdline = %handle.cmdline, "found running service");
                let outcome = self.stop(&handle)?;
                Some((handle, outcome))
            }
            None => {
                info!(signature = %self.spec.signature, "service not running");
                None
            }
        };
        let started = self.start()?;
        Ok(RestartOutcome { stopped, started })
    }
}
