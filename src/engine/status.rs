use serde::Serialize;

use crate::backend::{InstalledIndex, PackageProbe};
use crate::catalog::PackageEntry;
use crate::github::GIT_VERSION;

/// Reconciled state of one catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageStatus {
    pub name: String,
    pub description: String,
    pub installed: bool,
    pub version: Option<String>,
    pub update_available: bool,
    pub new_version: Option<String>,
    pub enabled: bool,
}

impl PackageStatus {
    fn base(entry: &PackageEntry) -> Self {
        Self {
            name: entry.name.clone(),
            description: entry.description.clone(),
            installed: false,
            version: None,
            update_available: false,
            new_version: None,
            enabled: entry.enabled,
        }
    }

    /// Status of a backend package from the batched index. The index carries
    /// no update information, so `update_available` is always false here.
    pub fn from_index(entry: &PackageEntry, index: &InstalledIndex) -> Self {
        let version = index.get(&entry.name).cloned();
        Self {
            installed: version.is_some(),
            version,
            ..Self::base(entry)
        }
    }

    /// Status of a GitHub entry. A checkout has no meaningful version.
    pub fn github(entry: &PackageEntry, installed: bool) -> Self {
        Self {
            installed,
            version: installed.then(|| GIT_VERSION.to_string()),
            ..Self::base(entry)
        }
    }

    pub fn from_probe(entry: &PackageEntry, probe: PackageProbe) -> Self {
        if !probe.installed {
            return Self::base(entry);
        }
        Self {
            installed: true,
            version: probe.version,
            update_available: probe.update_available,
            new_version: probe.new_version,
            ..Self::base(entry)
        }
    }
}
