//! Registry of repositories that need a setup step after clone or pull.
//!
//! Entries are keyed by repository name (the part after `owner/`) and loaded
//! from a JSON file:
//!
//! ```json
//! {
//!   "webtools": {
//!     "scripts": {
//!       "macos": "desktop/install/setup-mac.sh",
//!       "linux": "desktop/install/setup-linux.sh",
//!       "windows": "desktop/install/setup.ps1"
//!     },
//!     "launcher": {
//!       "path": "Applications/webtools.command",
//!       "contents": "#!/bin/bash\nopen http://localhost:8887\n"
//!     }
//!   }
//! }
//! ```

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::platform::Os;
use crate::runtime::Runtime;

/// Small script written to the user's home after a successful macOS
/// bootstrap, e.g. a double-clickable `.command` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LauncherSpec {
    /// Relative to the home directory.
    pub path: PathBuf,
    pub contents: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapSpec {
    /// Script per OS, relative to the checkout.
    #[serde(default)]
    pub scripts: HashMap<Os, PathBuf>,
    #[serde(default)]
    pub launcher: Option<LauncherSpec>,
}

impl BootstrapSpec {
    pub fn script_for(&self, os: Os) -> Option<&Path> {
        self.scripts.get(&os).map(PathBuf::as_path)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BootstrapRegistry {
    repos: HashMap<String, BootstrapSpec>,
}

impl BootstrapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any previous entry of the same name.
    #[cfg(test)]
    pub(crate) fn register(&mut self, repo_name: impl Into<String>, spec: BootstrapSpec) {
        self.repos.insert(repo_name.into(), spec);
    }

    pub fn get(&self, repo_name: &str) -> Option<&BootstrapSpec> {
        self.repos.get(repo_name)
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    /// Load the registry file. A missing file yields an empty registry; a
    /// malformed one is an error.
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime + ?Sized>(runtime: &R, path: &Path) -> Result<Self> {
        if !runtime.exists(path) {
            debug!("No bootstrap registry at {:?}", path);
            return Ok(Self::new());
        }
        let text = runtime.read_to_string(path)?;
        let registry: Self = serde_json::from_str(&text)
            .with_context(|| format!("Invalid bootstrap registry {:?}", path))?;
        debug!("Loaded {} bootstrap entries from {:?}", registry.len(), path);
        Ok(registry)
    }
}
