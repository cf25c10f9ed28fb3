use std::sync::{Mutex, MutexGuard};

use crate::table::{ProcessHandle, ProcessTable};

/// How a simulated process reacts to signals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Temper {
    /// Exits on terminate.
    Polite,
    /// Ignores terminate, dies on kill.
    Stubborn,
    /// Survives everything.
    Unkillable,
}

#[derive(Clone, Debug)]
struct Entry {
    handle: ProcessHandle,
    temper: Temper,
    alive: bool,
}

/// In-memory process table for tests. Records every signal sent.
#[derive(Default)]
pub struct InMemoryProcessTable {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    entries: Vec<Entry>,
    signals: Vec<(u32, &'static str)>,
}

impl InMemoryProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_process(self, pid: u32, cmdline: &str, temper: Temper) -> Self {
        self.lock().entries.push(Entry {
            handle: ProcessHandle {
                pid,
                cmdline: cmdline.to_string(),
            },
            temper,
            alive: true,
        });
        self
    }

    /// `(pid, "term" | "kill")` in the order sent.
    pub fn signals(&self) -> Vec<(u32, &'static str)> {
        self.lock().signals.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ProcessTable for InMemoryProcessTable {
    fn find(&self, signature: &str) -> Option<ProcessHandle> {
        if signature.trim().is_empty() {
            return None;
        }
        let inner = self.lock();
        let mut hits: Vec<_> = inner
            .entries
            .iter()
            .filter(|e| e.alive && e.handle.cmdline.contains(signature))
            .map(|e| e.handle.clone())
            .collect();
        hits.sort_by_key(|h| h.pid);
        hits.into_iter().next()
    }

    fn terminate(&self, pid: u32) -> bool {
        let mut inner = self.lock();
        inner.signals.push((pid, "term"));
        match inner.entries.iter_mut().find(|e| e.handle.pid == pid && e.alive) {
            Some(e) => {
                if e.temper == Temper::Polite {
                    e.alive = false;
                }
                true
            }
            None => false,
        }
    }

    fn kill(&self, pid: u32) -> bool {
        let mut inner = self.lock();
        inner.signals.push((pid, "kill"));
        match inner.entries.iter_mut().find(|e| e.handle.pid == pid && e.alive) {
            Some(e) => {
                if e.temper != Temper::Unkillable {
                    e.alive = false;
                }
                true
            }
            None => false,
        }
    }

    fn is_alive(&self, pid: u32) -> bool {
        self.lock().entries.iter().any(|e| e.handle.pid == pid && e.alive)
    }
}
