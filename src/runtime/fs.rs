use anyhow::{Context, Result};
use std::path::Path;

#[tracing::instrument]
pub(super) fn read_to_string(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))
}

#[tracing::instrument(skip(contents))]
pub(super) fn write(path: &Path, contents: &[u8]) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("Failed to write {:?}", path))
}

#[tracing::instrument]
pub(super) fn create_dir_all(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).with_context(|| format!("Failed to create {:?}", path))
}

#[tracing::instrument]
pub(super) fn remove_file(path: &Path) -> Result<()> {
    std::fs::remove_file(path).with_context(|| format!("Failed to remove {:?}", path))
}

#[tracing::instrument]
pub(super) fn remove_dir_all(path: &Path) -> Result<()> {
    std::fs::remove_dir_all(path).with_context(|| format!("Failed to remove {:?}", path))
}

#[cfg(unix)]
#[tracing::instrument]
pub(super) fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .with_context(|| format!("Failed to chmod {:o} {:?}", mode, path))
}

#[cfg(not(unix))]
pub(super) fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
