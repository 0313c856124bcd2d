//! Host platform and package manager detection.
//!
//! The operating system family is known at compile time; the backend is found
//! by probing for package manager executables in a fixed priority order.

use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::process::CommandRunner;

/// Operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Macos,
    Linux,
    Windows,
    Unknown,
}

impl Os {
    /// Detect the current operating system family
    pub fn detect() -> Self {
        #[cfg(target_os = "macos")]
        {
            Os::Macos
        }
        #[cfg(target_os = "linux")]
        {
            Os::Linux
        }
        #[cfg(target_os = "windows")]
        {
            Os::Windows
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            Os::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Os::Macos => "macos",
            Os::Linux => "linux",
            Os::Windows => "windows",
            Os::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Platform package manager used for non-GitHub catalog entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Brew,
    Apt,
    Dnf,
    Yum,
    Flatpak,
    Winget,
    None,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Brew => "brew",
            BackendKind::Apt => "apt",
            BackendKind::Dnf => "dnf",
            BackendKind::Yum => "yum",
            BackendKind::Flatpak => "flatpak",
            BackendKind::Winget => "winget",
            BackendKind::None => "none",
        }
    }

    /// Candidates probed for an OS, highest priority first. The first element
    /// of each pair is the executable looked up on the search path.
    pub fn candidates(os: Os) -> &'static [(&'static str, BackendKind)] {
        match os {
            Os::Macos => &[("brew", BackendKind::Brew)],
            Os::Linux => &[
                ("apt-get", BackendKind::Apt),
                ("dnf", BackendKind::Dnf),
                ("yum", BackendKind::Yum),
                ("flatpak", BackendKind::Flatpak),
            ],
            Os::Windows => &[("winget", BackendKind::Winget)],
            Os::Unknown => &[],
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn detect_os() -> Os {
    Os::detect()
}

/// Probe for the first available package manager on `os`.
///
/// Never fails: a host without any known package manager yields
/// [`BackendKind::None`].
#[tracing::instrument(skip(runner))]
pub fn detect_backend(runner: &dyn CommandRunner, os: Os) -> BackendKind {
    for (program, kind) in BackendKind::candidates(os) {
        if runner.program_exists(program) {
            debug!("Found {} on PATH, using {} backend", program, kind);
            return *kind;
        }
    }
    debug!("No package manager found for {}", os);
    BackendKind::None
}
