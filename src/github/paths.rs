use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use super::{GitHubRepo, InstallError};
use crate::runtime::Runtime;

/// Where repositories go when the tool is not run from an `install`
/// directory: `~/Applications/GitHub`.
pub fn fallback_root<R: Runtime + ?Sized>(runtime: &R) -> Result<PathBuf, InstallError> {
    let home = runtime.home_dir().ok_or(InstallError::HomeDirMissing)?;
    Ok(home.join("Applications").join("GitHub"))
}

/// Install directory of a repository, relative to where the tool runs from.
///
/// - `…/desktop/install` installs next to `desktop`, two levels up
/// - `…/install` installs next to `install`, one level up
/// - anything else installs under [`fallback_root`]
///
/// The first two layouts put checkouts under the web root the tool serves.
/// Resolution never touches the file system.
#[tracing::instrument(skip(runtime))]
pub fn resolve_install_dir<R: Runtime + ?Sized>(
    runtime: &R,
    base_dir: &Path,
    repo: &GitHubRepo,
) -> Result<PathBuf, InstallError> {
    let root = match webroot(base_dir) {
        Some(root) => root.to_path_buf(),
        None => fallback_root(runtime)?,
    };
    Ok(root.join(&repo.repo))
}

fn webroot(base_dir: &Path) -> Option<&Path> {
    if base_dir.file_name() != Some(OsStr::new("install")) {
        return None;
    }
    let parent = base_dir.parent()?;
    if parent.file_name() == Some(OsStr::new("desktop")) {
        parent.parent()
    } else {
        Some(parent)
    }
}
