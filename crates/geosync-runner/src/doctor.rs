use std::path::Path;

use geosync_cache::ResolutionCache;

use crate::Config;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Check {
    pub name: &'static str,
    pub ok: bool,
    pub detail: String,
}

impl Check {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            ok: true,
            detail: detail.into(),
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            ok: false,
            detail: detail.into(),
        }
    }
}

/// Preflight checks. Never mutates anything.
pub fn doctor(root: &Path, cfg: &Config) -> Vec<Check> {
    let mut checks = Vec::new();

    let data_dir = cfg.data_dir(root);
    checks.push(if data_dir.is_dir() {
        Check::pass("data dir", data_dir.display().to_string())
    } else {
        Check::fail("data dir", format!("{} does not exist; run `geosync init`", data_dir.display()))
    });

    checks.push(match cfg.producer.command.first() {
        None => Check::pass("producer", "not configured; snapshots are provided out of band"),
        Some(program) => match which::which(program) {
            Ok(p) => Check::pass("producer", p.display().to_string()),
            Err(_) => Check::fail("producer", format!("{program} not found on PATH")),
        },
    });

    let cache_path = cfg.cache_path(root);
    checks.push(match ResolutionCache::load(&cache_path) {
        Ok(cache) if cache_path.exists() => Check::pass("cache", format!("{} entries", cache.len())),
        Ok(_) => Check::pass("cache", "no cache file yet; first sync resolves every record"),
        Err(e) => Check::fail("cache", e.to_string()),
    });

    checks.push(match cfg.service.start.first() {
        None => Check::fail("service", "no start command configured"),
        Some(_) if cfg.service.signature.trim().is_empty() => {
            Check::fail("service", "empty match signature would match every process")
        }
        Some(program) => match which::which(program) {
            Ok(_) => Check::pass("service", cfg.service.start.join(" ")),
            Err(_) => Check::fail("service", format!("{program} not found on PATH")),
        },
    });

    checks
}
