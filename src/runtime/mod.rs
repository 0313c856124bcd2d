//! Host access behind a trait, so the engine and installers can be tested
//! against `MockRuntime` instead of the real machine.
//!
//! - `env` - current and home directories, administrator rights
//! - `fs` - catalog reads, checkout removal, launcher writes
//! - `user` - the uninstall confirmation prompt
//!
//! Running external programs is separate; see [`crate::process`].

mod env;
mod fs;
mod user;

use anyhow::Result;
use std::path::{Path, PathBuf};

#[cfg_attr(test, mockall::automock)]
pub trait Runtime: Send + Sync {
    fn current_dir(&self) -> Result<PathBuf>;
    fn home_dir(&self) -> Option<PathBuf>;

    /// Root on unix, an elevated token on Windows.
    fn is_privileged(&self) -> bool;

    fn exists(&self, path: &Path) -> bool;
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    fn remove_file(&self, path: &Path) -> Result<()>;
    fn remove_dir_all(&self, path: &Path) -> Result<()>;

    /// Unix mode bits. Ignored where the platform has none.
    fn set_permissions(&self, path: &Path, mode: u32) -> Result<()>;

    /// Ask a yes/no question; anything but `y`/`yes` is a no.
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RealRuntime;

impl Runtime for RealRuntime {
    fn current_dir(&self) -> Result<PathBuf> {
        env::current_dir()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        env::home_dir()
    }

    fn is_privileged(&self) -> bool {
        env::is_privileged()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        fs::write(path, contents)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path)
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        fs::remove_dir_all(path)
    }

    fn set_permissions(&self, path: &Path, mode: u32) -> Result<()> {
        fs::set_mode(path, mode)
    }

    fn confirm(&self, prompt: &str) -> Result<bool> {
        user::confirm_on_terminal(prompt)
    }
}
