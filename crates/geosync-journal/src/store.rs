use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use geosync_core::RunId;
use tracing::{debug, warn};

use crate::manifest::RunManifest;

/// Per-run evidence directory: `<root>/<run-id>/`.
pub trait RunJournal: Send + Sync {
    fn create_run_dir(&self, run_id: &RunId) -> Result<PathBuf>;
    fn write_manifest(&self, run_dir: &Path, manifest: &RunManifest) -> Result<()>;
    fn append_worklog(&self, run_dir: &Path, line: &str) -> Result<()>;
    fn write_report(&self, run_dir: &Path, markdown: &str) -> Result<PathBuf>;
    fn write_notice(&self, run_dir: &Path, markdown: &str) -> Result<PathBuf>;
}

#[derive(Clone)]
pub struct FsRunJournal {
    pub root: PathBuf,
}

impl FsRunJournal {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl RunJournal for FsRunJournal {
    fn create_run_dir(&self, run_id: &RunId) -> Result<PathBuf> {
        let dir = self.root.join(run_id.as_str());
        std::fs::create_dir_all(&dir).with_context(|| format!("create run dir {}", dir.display()))?;
        debug!(run_dir = %dir.display(), "run journal opened");
        Ok(dir)
    }

    fn write_manifest(&self, run_dir: &Path, manifest: &RunManifest) -> Result<()> {
        let path = run_dir.join("run_manifest.json");
        let bytes = serde_json::to_vec_pretty(manifest)?;
        std::fs::write(&path, bytes).with_context(|| format!("write manifest {}", path.display()))?;
        debug!(path = %path.display(), stages = manifest.stages.len(), "manifest written");
        Ok(())
    }

    fn append_worklog(&self, run_dir: &Path, line: &str) -> Result<()> {
        let path = run_dir.join("worklog.md");
        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open {}", path.display()))?;
        writeln!(f, "{line}")?;
        Ok(())
    }

    fn write_report(&self, run_dir: &Path, markdown: &str) -> Result<PathBuf> {
        let path = run_dir.join("report.md");
        std::fs::write(&path, markdown).with_context(|| format!("write report {}", path.display()))?;
        Ok(path)
    }

    fn write_notice(&self, run_dir: &Path, markdown: &str) -> Result<PathBuf> {
        let path = run_dir.join("ACTION_NEEDED.md");
        std::fs::write(&path, markdown).with_context(|| format!("write notice {}", path.display()))?;
        warn!(path = %path.display(), "operator notice written");
        Ok(path)
    }
}

/// Replace `path` with `bytes` via a sibling temp file and rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).with_context(|| format!("temp file in {}", dir.display()))?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}
