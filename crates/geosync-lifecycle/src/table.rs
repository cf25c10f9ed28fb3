/// A live OS process matched by its command line. Observed, never owned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessHandle {
    pub pid: u32,
    pub cmdline: String,
}

/// The slice of the OS process table the controller needs.
pub trait ProcessTable: Send + Sync {
    /// First live process (lowest pid) whose command line contains `signature`.
    fn find(&self, signature: &str) -> Option<ProcessHandle>;
    /// Ask the process to exit. False when the signal could not be delivered.
    fn terminate(&self, pid: u32) -> bool;
    fn kill(&self, pid: u32) -> bool;
    /// Zombies count as dead.
    fn is_alive(&self, pid: u32) -> bool;
}

impl<T: ProcessTable + ?Sized> ProcessTable for Box<T> {
    fn find(&self, signature: &str) -> Option<ProcessHandle> {
        (**self).find(signature)
    }
    fn terminate(&self, pid: u32) -> bool {
        (**self).terminate(pid)
    }
    fn kill(&self, pid: u32) -> bool {
        (**self).kill(pid)
    }
    fn is_alive(&self, pid: u32) -> bool {
        (**self).is_alive(pid)
    }
}

impl<T: ProcessTable + ?Sized> ProcessTable for std::sync::Arc<T> {
    fn find(&self, signature: &str) -> Option<ProcessHandle> {
        (**self).find(signature)
    }
    fn terminate(&self, pid: u32) -> bool {
        (**self).terminate(pid)
    }
    fn kill(&self, pid: u32) -> bool {
        (**self).kill(pid)
    }
    fn is_alive(&self, pid: u32) -> bool {
        (**self).is_alive(pid)
    }
}
