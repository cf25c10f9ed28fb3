use std::sync::{Mutex, MutexGuard};

use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, Signal, System, UpdateKind};
use tracing::debug;

use crate::table::{ProcessHandle, ProcessTable};

/// Process table backed by `sysinfo`. Refreshes on every call.
pub struct SysinfoProcessTable {
    sys: Mutex<System>,
}

impl SysinfoProcessTable {
    pub fn new() -> Self {
        Self {
            sys: Mutex::new(System::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, System> {
        self.sys.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn refresh_one(sys: &mut System, pid: Pid) {
        sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    }
}

impl Default for SysinfoProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

fn gone(status: ProcessStatus) -> bool {
    matches!(status, ProcessStatus::Zombie | ProcessStatus::Dead)
}

impl ProcessTable for SysinfoProcessTable {
    fn find(&self, signature: &str) -> Option<ProcessHandle> {
        if signature.trim().is_empty() {
            return None;
        }
        let mut sys = self.lock();
        sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always),
        );
        let me = std::process::id();
        let mut hits: Vec<ProcessHandle> = sys
            .processes()
            .values()
            .filter(|p| p.pid().as_u32() != me && !gone(p.status()))
            .filter_map(|p| {
                let cmdline = p
                    .cmd()
                    .iter()
                    .map(|part| part.to_string_lossy())
                    .collect::<Vec<_>>()
                    .join(" ");
                cmdline.contains(signature).then(|| ProcessHandle {
                    pid: p.pid().as_u32(),
                    cmdline,
                })
            })
            .collect();
        hits.sort_by_key(|h| h.pid);
        debug!(signature, matches = hits.len(), "process scan");
        hits.into_iter().next()
    }

    fn terminate(&self, pid: u32) -> bool {
        let mut sys = self.lock();
        let pid = Pid::from_u32(pid);
        Self::refresh_one(&mut sys, pid);
        sys.process(pid).and_then(|p| p.kill_with(Signal::Term)).unwrap_or(false)
    }

    fn kill(&self, pid: u32) -> bool {
        let mut sys = self.lock();
        let pid = Pid::from_u32(pid);
        Self::refresh_one(&mut sys, pid);
        sys.process(pid).map(|p| p.kill()).unwrap_or(false)
    }

    fn is_alive(&self, pid: u32) -> bool {
        let mut sys = self.lock();
        let pid = Pid::from_u32(pid);
        Self::refresh_one(&mut sys, pid);
        sys.process(pid).map(|p| !gone(p.status())).unwrap_or(false)
    }
}
