//! Catalog entries backed by a GitHub repository instead of a package
//! manager. They are cloned into an install directory, kept current with
//! `git pull`, and registered repositories get a per-OS bootstrap script run
//! after every clone or pull.

mod bootstrap;
mod installer;
mod paths;

pub use bootstrap::{BootstrapRegistry, BootstrapSpec, LauncherSpec};
pub use installer::GitHubInstaller;
pub use paths::{fallback_root, resolve_install_dir};

use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::platform::Os;

/// Catalog names starting with this prefix are GitHub repositories.
pub const GITHUB_PREFIX: &str = "github:";

/// Version reported for an installed repository checkout.
pub const GIT_VERSION: &str = "git";

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct GitHubRepo {
    pub owner: String,
    pub repo: String,
}

impl GitHubRepo {
    pub fn clone_url(&self) -> String {
        format!("https://github.com/{}/{}.git", self.owner, self.repo)
    }
}

impl std::fmt::Display for GitHubRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl FromStr for GitHubRepo {
    type Err = InstallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix(GITHUB_PREFIX).unwrap_or(s);
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != 2 || !parts.iter().all(|part| is_path_component(part)) {
            Err(InstallError::InvalidRepo(s.to_string()))
        } else {
            Ok(GitHubRepo {
                owner: parts[0].to_string(),
                repo: parts[1].to_string(),
            })
        }
    }
}

/// A name that joins onto the install root as exactly one directory.
fn is_path_component(part: &str) -> bool {
    !part.is_empty() && part != "." && part != ".." && !part.contains('\\')
}

/// Failures of the GitHub install path. None of them are rolled back: a
/// failed clone or bootstrap may leave a partial checkout behind.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Invalid repository '{0}'. Expected 'owner/repo'.")]
    InvalidRepo(String),

    #[error("Could not find home directory")]
    HomeDirMissing,

    #[error("{0} is not installed")]
    ToolMissing(&'static str),

    #[error("`{command}` failed: {message}")]
    Vcs { command: String, message: String },

    #[error("{repo} has no bootstrap script for {os}")]
    NoBootstrapForOs { repo: String, os: Os },

    #[error("Bootstrap script {0:?} does not exist")]
    BootstrapMissing(PathBuf),

    #[error("Bootstrap script {script:?} failed: {output}")]
    BootstrapFailed { script: PathBuf, output: String },

    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repo() {
        let repo = "foo/bar".parse::<GitHubRepo>().unwrap();
        assert_eq!(
            repo,
            GitHubRepo {
                owner: "foo".into(),
                repo: "bar".into()
            }
        );
        assert_eq!(repo.to_string(), "foo/bar");
        assert_eq!(repo.clone_url(), "https://github.com/foo/bar.git");
    }

    #[test]
    fn test_parse_repo_accepts_catalog_prefix() {
        let repo = "github:foo/bar".parse::<GitHubRepo>().unwrap();
        assert_eq!(repo.repo, "bar");
    }

    #[test]
    fn test_parse_repo_rejects_bad_formats() {
        for bad in [
            "foo",
            "foo/",
            "/bar",
            "a/b/c",
            "",
            "github:",
            "foo/.",
            "foo/..",
            "./bar",
            "../bar",
            "github:foo/..",
            "foo/bar\\..",
            "foo\\../bar",
        ] {
            let err = bad.parse::<GitHubRepo>().unwrap_err();
            assert!(matches!(err, InstallError::InvalidRepo(_)), "{}", bad);
        }
    }
}
