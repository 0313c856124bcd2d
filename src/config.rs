use anyhow::Result;
use log::debug;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::runtime::Runtime;

pub const CATALOG_FILE: &str = "desktop.conf";
pub const BOOTSTRAP_FILE: &str = "bootstrap.json";

/// Cache lifetime for [`crate::engine::Engine::get_status`].
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
/// Window inside which [`crate::engine::Engine::get_status_cheap`] reuses the cache.
pub const QUICK_REFRESH_WINDOW: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory the tool runs from. Decides where GitHub repositories go.
    pub base_dir: PathBuf,
    pub catalog_path: PathBuf,
    pub bootstrap_path: PathBuf,
    pub cache_ttl: Duration,
    pub quick_refresh: Duration,
}

impl Config {
    /// Fill in defaults. Relative paths are taken relative to the current
    /// directory; catalog and bootstrap files default to the base directory.
    pub fn new<R: Runtime + ?Sized>(
        runtime: &R,
        base_dir: Option<PathBuf>,
        catalog: Option<PathBuf>,
        bootstrap: Option<PathBuf>,
        cache_ttl: Option<u64>,
    ) -> Result<Self> {
        let cwd = runtime.current_dir()?;
        let base_dir = match base_dir {
            Some(dir) => absolute(&cwd, dir),
            None => cwd.clone(),
        };

        let catalog_path = catalog
            .map(|p| absolute(&cwd, p))
            .unwrap_or_else(|| base_dir.join(CATALOG_FILE));
        let bootstrap_path = bootstrap
            .map(|p| absolute(&cwd, p))
            .unwrap_or_else(|| base_dir.join(BOOTSTRAP_FILE));

        let config = Self {
            base_dir,
            catalog_path,
            bootstrap_path,
            cache_ttl: cache_ttl
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_CACHE_TTL),
            quick_refresh: QUICK_REFRESH_WINDOW,
        };
        debug!("Using {:?}", config);
        Ok(config)
    }

    /// Configuration rooted at `base_dir` with every default applied.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            catalog_path: base_dir.join(CATALOG_FILE),
            bootstrap_path: base_dir.join(BOOTSTRAP_FILE),
            base_dir,
            cache_ttl: DEFAULT_CACHE_TTL,
            quick_refresh: QUICK_REFRESH_WINDOW,
        }
    }
}

fn absolute(cwd: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() { path } else { cwd.join(path) }
}
