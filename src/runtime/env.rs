use anyhow::{Context, Result};
use std::path::PathBuf;

#[tracing::instrument]
pub(super) fn current_dir() -> Result<PathBuf> {
    std::env::current_dir().context("Cannot determine the current directory")
}

pub(super) fn home_dir() -> Option<PathBuf> {
    dirs::home_dir()
}

/// Package managers run without `sudo` when this holds.
#[tracing::instrument]
pub(super) fn is_privileged() -> bool {
    #[cfg(unix)]
    {
        nix::unistd::geteuid().is_root()
    }
    #[cfg(windows)]
    {
        is_elevated::is_elevated()
    }
    #[cfg(not(any(unix, windows)))]
    {
        false
    }
}
