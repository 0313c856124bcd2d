//! Reconciliation engine.
//!
//! Combines the catalog, the backend's installed index and the GitHub
//! installer into per-entry [`PackageStatus`] values, caches the result, and
//! dispatches install/update/uninstall requests to the right installer.

mod cache;
mod status;

pub use cache::{Snapshot, StatusCache};
pub use status::PackageStatus;

use anyhow::Result;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::backend::{ActionOutcome, Backend, InstalledIndex, Listing, adapter_for};
use crate::catalog::{Catalog, PackageEntry};
use crate::config::Config;
use crate::github::{BootstrapRegistry, GITHUB_PREFIX, GitHubInstaller};
use crate::platform::{BackendKind, Os, detect_backend, detect_os};
use crate::process::CommandRunner;
use crate::runtime::Runtime;

/// Per-name outcomes of a bulk operation, ordered by name.
pub type ActionResults = BTreeMap<String, ActionOutcome>;

/// Which packages an update request covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Update nothing.
    None,
    /// Every cataloged package whose status reports an update.
    All,
    /// Exactly the given names.
    List,
}

/// Result of [`Engine::get_status_cheap`].
#[derive(Debug, Clone, Serialize)]
pub struct CheapStatus {
    pub packages: Arc<[PackageStatus]>,
    pub cached: bool,
    /// Age of the returned result in seconds, rounded to two decimals.
    pub age: f64,
}

pub struct Engine<R: Runtime, C: CommandRunner> {
    runtime: R,
    runner: C,
    config: Config,
    os: Os,
    backend: Box<dyn Backend>,
    github: GitHubInstaller,
    cache: StatusCache,
}

impl<R: Runtime, C: CommandRunner> Engine<R, C> {
    /// Detect the host platform and backend, and load the bootstrap registry.
    pub fn new(runtime: R, runner: C, config: Config) -> Result<Self> {
        let os = detect_os();
        let kind = detect_backend(&runner, os);
        let privileged = runtime.is_privileged();
        let registry = BootstrapRegistry::load(&runtime, &config.bootstrap_path)?;
        info!(
            "Running on {} with backend {} (privileged: {})",
            os, kind, privileged
        );
        let backend = adapter_for(kind, privileged);
        Ok(Self::with_backend(runtime, runner, config, os, backend).with_bootstrap(registry))
    }

    /// Build an engine around an already selected backend adapter.
    pub fn with_backend(
        runtime: R,
        runner: C,
        config: Config,
        os: Os,
        backend: Box<dyn Backend>,
    ) -> Self {
        let github = GitHubInstaller::new(&config.base_dir, os, BootstrapRegistry::new());
        Self {
            runtime,
            runner,
            config,
            os,
            backend,
            github,
            cache: StatusCache::new(),
        }
    }

    pub fn with_bootstrap(mut self, registry: BootstrapRegistry) -> Self {
        self.github = GitHubInstaller::new(&self.config.base_dir, self.os, registry);
        self
    }

    pub fn os(&self) -> Os {
        self.os
    }

    pub fn backend(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn github(&self) -> &GitHubInstaller {
        &self.github
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// The catalog as it is on disk right now.
    pub fn catalog(&self) -> Result<Catalog> {
        Catalog::load(&self.runtime, &self.config.catalog_path)
    }

    pub fn read_enabled_names(&self) -> Result<Vec<String>> {
        Ok(self.catalog()?.enabled_names())
    }

    #[cfg(test)]
    pub(crate) async fn cached_at(&self) -> Option<std::time::Instant> {
        self.cache.snapshot().await.map(|s| s.taken_at)
    }

    /// Status of every catalog entry, served from the cache while it is
    /// younger than the configured TTL.
    #[tracing::instrument(skip(self))]
    pub async fn get_status(&self, force_refresh: bool) -> Result<Arc<[PackageStatus]>> {
        let mut slot = self.cache.lock().await;
        if !force_refresh
            && let Some(snapshot) = slot.as_ref()
            && snapshot.is_younger_than(self.config.cache_ttl)
        {
            debug!("Serving status from cache ({:.1}s old)", snapshot.age().as_secs_f64());
            return Ok(snapshot.packages.clone());
        }

        let snapshot = Snapshot::new(self.reconcile().await?);
        let packages = snapshot.packages.clone();
        *slot = Some(snapshot);
        Ok(packages)
    }

    /// Reuse a result computed within the quick refresh window, otherwise
    /// force a full pass.
    #[tracing::instrument(skip(self))]
    pub async fn get_status_cheap(&self) -> Result<CheapStatus> {
        let mut slot = self.cache.lock().await;
        if let Some(snapshot) = slot.as_ref()
            && snapshot.is_younger_than(self.config.quick_refresh)
        {
            return Ok(CheapStatus {
                packages: snapshot.packages.clone(),
                cached: true,
                age: (snapshot.age().as_secs_f64() * 100.0).round() / 100.0,
            });
        }

        let snapshot = Snapshot::new(self.reconcile().await?);
        let packages = snapshot.packages.clone();
        *slot = Some(snapshot);
        Ok(CheapStatus {
            packages,
            cached: false,
            age: 0.0,
        })
    }

    /// One batched pass: read the catalog, list installed packages once,
    /// and resolve GitHub entries against the file system.
    async fn reconcile(&self) -> Result<Vec<PackageStatus>> {
        let catalog = self.catalog()?;
        let index = self.backend.query_installed(&self.runner).await;
        debug!(
            "{} catalog entries, {} installed {} packages",
            catalog.len(),
            index.len(),
            self.backend.kind()
        );

        Ok(catalog
            .entries()
            .iter()
            .map(|entry| self.batched_status(entry, &index))
            .collect())
    }

    fn batched_status(&self, entry: &PackageEntry, index: &InstalledIndex) -> PackageStatus {
        if entry.github_repo().is_some() {
            let installed = self.github.is_installed(&self.runtime, &entry.name);
            PackageStatus::github(entry, installed)
        } else {
            PackageStatus::from_index(entry, index)
        }
    }

    /// Probe one entry on its own, including update information where the
    /// backend offers it. Slower than [`Engine::get_status`] and never cached.
    #[tracing::instrument(skip(self))]
    pub async fn package_status(&self, entry: &PackageEntry) -> PackageStatus {
        if entry.github_repo().is_some() {
            let installed = self.github.is_installed(&self.runtime, &entry.name);
            return PackageStatus::github(entry, installed);
        }
        let probe = self.backend.probe(&self.runner, &entry.name).await;
        PackageStatus::from_probe(entry, probe)
    }

    #[tracing::instrument(skip(self))]
    pub async fn install(&self, names: &[String]) -> ActionResults {
        let mut results = ActionResults::new();
        for name in names {
            let outcome = if is_github(name) {
                self.install_github(name).await
            } else {
                self.backend.install(&self.runner, name).await
            };
            log_outcome("install", name, &outcome);
            results.insert(name.clone(), outcome);
        }
        results
    }

    /// GitHub entries are updated by pulling in place.
    #[tracing::instrument(skip(self))]
    pub async fn update(&self, mode: UpdateMode, names: &[String]) -> Result<ActionResults> {
        let names = match mode {
            UpdateMode::None => return Ok(ActionResults::new()),
            UpdateMode::All => self
                .get_status(false)
                .await?
                .iter()
                .filter(|s| s.update_available)
                .map(|s| s.name.clone())
                .collect(),
            UpdateMode::List => names.to_vec(),
        };

        let mut results = ActionResults::new();
        for name in names {
            let outcome = if is_github(&name) {
                self.install_github(&name).await
            } else {
                self.backend.update(&self.runner, &name).await
            };
            log_outcome("update", &name, &outcome);
            results.insert(name, outcome);
        }
        Ok(results)
    }

    /// Backend packages missing from a complete installed index are reported
    /// as a failure without a message and no command is run for them. When
    /// the listing was cut short, the uninstall command runs anyway and its
    /// exit status decides.
    #[tracing::instrument(skip(self))]
    pub async fn uninstall(&self, names: &[String]) -> ActionResults {
        let mut listing: Option<Listing> = None;
        let mut results = ActionResults::new();

        for name in names {
            let outcome = if is_github(name) {
                self.uninstall_github(name)
            } else if self.backend.kind() == BackendKind::None {
                self.backend.uninstall(&self.runner, name).await
            } else {
                if listing.is_none() {
                    listing = Some(self.backend.list_installed(&self.runner).await);
                }
                let installed = listing
                    .as_ref()
                    .is_some_and(|l| !l.complete || l.index.contains_key(name));
                if installed {
                    self.backend.uninstall(&self.runner, name).await
                } else {
                    debug!("{} is not installed", name);
                    ActionOutcome::nothing_to_do()
                }
            };
            log_outcome("uninstall", name, &outcome);
            results.insert(name.clone(), outcome);
        }
        results
    }

    async fn install_github(&self, name: &str) -> ActionOutcome {
        match self.github.install(&self.runtime, &self.runner, name).await {
            Ok(()) => ActionOutcome::ok(),
            Err(e) => ActionOutcome::failed(e.to_string()),
        }
    }

    fn uninstall_github(&self, name: &str) -> ActionOutcome {
        match self.github.uninstall(&self.runtime, name) {
            Ok(true) => ActionOutcome::ok(),
            Ok(false) => ActionOutcome::nothing_to_do(),
            Err(e) => ActionOutcome::failed(e.to_string()),
        }
    }
}

fn is_github(name: &str) -> bool {
    name.starts_with(GITHUB_PREFIX)
}

fn log_outcome(action: &str, name: &str, outcome: &ActionOutcome) {
    match (&outcome.success, &outcome.error) {
        (true, _) => info!("{} {}: ok", action, name),
        (false, Some(error)) => warn!("{} {} failed: {}", action, name, error),
        (false, None) => info!("{} {}: nothing to do", action, name),
    }
}
