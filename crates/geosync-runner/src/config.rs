use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use geosync_lifecycle::ServiceSpec;
use geosync_resolver::{NominatimSettings, ResolverConfig};
use geosync_snapshot::{ColumnMap, CsvSnapshotStore};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub dataset: ColumnMap,
    #[serde(default)]
    pub producer: ProducerConfig,
    #[serde(default)]
    pub resolver: ResolverSection,
    #[serde(default)]
    pub service: ServiceConfig,
}

/// Relative paths resolve against the root; `~` is expanded.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: String,
    pub current_snapshot: String,
    pub previous_snapshot: String,
    pub cache_file: String,
    pub logs_dir: String,
    pub runs_dir: String,
    /// Rendered report refreshed on every successful sync.
    pub report_file: Option<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".into(),
            current_snapshot: "data/facilities_latest.csv".into(),
            previous_snapshot: "data/facilities_previous.csv".into(),
            cache_file: "geocode_cache.json".into(),
            logs_dir: "logs".into(),
            runs_dir: ".geosync/runs".into(),
            report_file: Some("STATUS.md".into()),
        }
    }
}

/// External command that refreshes the current snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    /// argv; empty means acquisition is done out of band.
    pub command: Vec<String>,
    pub timeout_secs: u64,
    pub workdir: Option<String>,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            timeout_secs: 300,
            workdir: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSection {
    pub endpoint: String,
    pub user_agent: String,
    pub country_codes: Option<String>,
    pub query_suffix: String,
    pub interval_ms: u64,
    pub request_timeout_secs: u64,
    pub checkpoint_every: usize,
    /// Budget for the whole resolve stage of a sync.
    pub stage_timeout_secs: u64,
}

impl Default for ResolverSection {
    fn default() -> Self {
        let nominatim = NominatimSettings::default();
        Self {
            endpoint: nominatim.endpoint,
            user_agent: nominatim.user_agent,
            country_codes: nominatim.country_codes,
            query_suffix: "USA".into(),
            interval_ms: 1000,
            request_timeout_secs: 10,
            checkpoint_every: 100,
            stage_timeout_secs: 7200,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub signature: String,
    pub start: Vec<String>,
    pub workdir: Option<String>,
    pub log_prefix: String,
    pub graceful_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub kill_wait_secs: u64,
    pub startup_grace_secs: u64,
    /// Printed after a successful start.
    pub url: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            signature: "app.py".into(),
            start: vec!["python3".into(), "app.py".into()],
            workdir: None,
            log_prefix: "service".into(),
            graceful_timeout_secs: 10,
            poll_interval_ms: 1000,
            kill_wait_secs: 2,
            startup_grace_secs: 5,
            url: Some("http://localhost:5001".into()),
        }
    }
}

impl Config {
    pub fn default_for_root() -> Self {
        Self::default()
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: Config = toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
        Ok(cfg)
    }

    /// Load `geosync.toml` under `root`, or the defaults when there is none.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let path = Self::config_path(root);
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default_for_root())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let s = toml::to_string_pretty(self).with_context(|| "serialize toml")?;
        std::fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    pub fn config_path(root: &Path) -> PathBuf {
        root.join("geosync.toml")
    }

    pub fn data_dir(&self, root: &Path) -> PathBuf {
        resolve_path(root, &self.paths.data_dir)
    }

    pub fn cache_path(&self, root: &Path) -> PathBuf {
        resolve_path(root, &self.paths.cache_file)
    }

    pub fn logs_dir(&self, root: &Path) -> PathBuf {
        resolve_path(root, &self.paths.logs_dir)
    }

    pub fn runs_dir(&self, root: &Path) -> PathBuf {
        resolve_path(root, &self.paths.runs_dir)
    }

    pub fn report_path(&self, root: &Path) -> Option<PathBuf> {
        self.paths
            .report_file
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(|p| resolve_path(root, p))
    }

    pub fn producer_workdir(&self, root: &Path) -> PathBuf {
        self.producer
            .workdir
            .as_deref()
            .map(|p| resolve_path(root, p))
            .unwrap_or_else(|| root.to_path_buf())
    }

    pub fn snapshot_store(&self, root: &Path) -> CsvSnapshotStore {
        CsvSnapshotStore::new(
            resolve_path(root, &self.paths.current_snapshot),
            resolve_path(root, &self.paths.previous_snapshot),
            self.dataset.clone(),
        )
    }

    pub fn nominatim_settings(&self) -> NominatimSettings {
        NominatimSettings {
            endpoint: self.resolver.endpoint.clone(),
            user_agent: self.resolver.user_agent.clone(),
            country_codes: self.resolver.country_codes.clone(),
            timeout: Duration::from_secs(self.resolver.request_timeout_secs),
        }
    }

    pub fn resolver_config(&self, deadline: Option<Duration>) -> ResolverConfig {
        ResolverConfig {
            interval: Duration::from_millis(self.resolver.interval_ms),
            checkpoint_every: self.resolver.checkpoint_every,
            deadline,
            query_suffix: self.resolver.query_suffix.clone(),
        }
    }

    pub fn service_spec(&self, root: &Path) -> ServiceSpec {
        ServiceSpec {
            signature: self.service.signature.clone(),
            start: self.service.start.clone(),
            workdir: self
                .service
                .workdir
                .as_deref()
                .map(|p| resolve_path(root, p))
                .unwrap_or_else(|| root.to_path_buf()),
            logs_dir: self.logs_dir(root),
            log_prefix: self.service.log_prefix.clone(),
            graceful_timeout: Duration::from_secs(self.service.graceful_timeout_secs),
            poll_interval: Duration::from_millis(self.service.poll_interval_ms),
            kill_wait: Duration::from_secs(self.service.kill_wait_secs),
            startup_grace: Duration::from_secs(self.service.startup_grace_secs),
        }
    }
}

pub fn resolve_path(root: &Path, raw: &str) -> PathBuf {
    let expanded = PathBuf::from(shellexpand::tilde(raw).to_string());
    if expanded.is_absolute() {
        expanded
    } else {
        root.join(expanded)
    }
}
