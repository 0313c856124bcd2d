use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use super::{BootstrapRegistry, BootstrapSpec, GitHubRepo, InstallError, resolve_install_dir};
use crate::platform::Os;
use crate::process::{CommandRunner, CommandSpec};
use crate::runtime::Runtime;

const GIT: &str = "git";
const EXECUTABLE_MODE: u32 = 0o755;

/// Clones, updates and removes GitHub-backed catalog entries.
///
/// Install directories are resolved on every call from `base_dir`; nothing
/// about a repository is remembered between calls.
pub struct GitHubInstaller {
    base_dir: PathBuf,
    os: Os,
    registry: BootstrapRegistry,
}

impl GitHubInstaller {
    pub fn new(base_dir: impl Into<PathBuf>, os: Os, registry: BootstrapRegistry) -> Self {
        Self {
            base_dir: base_dir.into(),
            os,
            registry,
        }
    }

    pub fn registry(&self) -> &BootstrapRegistry {
        &self.registry
    }

    pub fn install_dir<R: Runtime + ?Sized>(
        &self,
        runtime: &R,
        repo: &str,
    ) -> Result<PathBuf, InstallError> {
        let repo = repo.parse::<GitHubRepo>()?;
        resolve_install_dir(runtime, &self.base_dir, &repo)
    }

    /// Installed means the resolved checkout directory exists.
    pub fn is_installed<R: Runtime + ?Sized>(&self, runtime: &R, repo: &str) -> bool {
        match self.install_dir(runtime, repo) {
            Ok(dir) => runtime.exists(&dir),
            Err(e) => {
                warn!("Cannot resolve {}: {}", repo, e);
                false
            }
        }
    }

    /// Clone the repository, or pull if it is already checked out, then run
    /// its bootstrap script if it has one registered.
    #[tracing::instrument(skip(self, runtime, runner))]
    pub async fn install<R: Runtime + ?Sized>(
        &self,
        runtime: &R,
        runner: &dyn CommandRunner,
        repo: &str,
    ) -> Result<(), InstallError> {
        let repo = repo.parse::<GitHubRepo>()?;
        if !runner.program_exists(GIT) {
            return Err(InstallError::ToolMissing(GIT));
        }

        let dir = resolve_install_dir(runtime, &self.base_dir, &repo)?;
        let command = if runtime.exists(&dir) {
            info!("Updating {} in {:?}", repo, dir);
            CommandSpec::new(GIT).arg("pull").current_dir(&dir)
        } else {
            info!("Cloning {} into {:?}", repo, dir);
            if let Some(parent) = dir.parent()
                && !runtime.exists(parent)
            {
                runtime.create_dir_all(parent)?;
            }
            CommandSpec::new(GIT)
                .arg("clone")
                .arg(repo.clone_url())
                .arg(dir.to_string_lossy())
        };

        let output = runner.run(&command).await?;
        if !output.is_success() {
            return Err(InstallError::Vcs {
                command: command.to_string(),
                message: output.diagnostic(),
            });
        }

        match self.registry.get(&repo.repo) {
            Some(spec) => self.bootstrap(runtime, runner, &repo, &dir, spec).await,
            None => {
                debug!("{} has no bootstrap step", repo);
                Ok(())
            }
        }
    }

    async fn bootstrap<R: Runtime + ?Sized>(
        &self,
        runtime: &R,
        runner: &dyn CommandRunner,
        repo: &GitHubRepo,
        dir: &Path,
        spec: &BootstrapSpec,
    ) -> Result<(), InstallError> {
        let relative = spec
            .script_for(self.os)
            .ok_or_else(|| InstallError::NoBootstrapForOs {
                repo: repo.to_string(),
                os: self.os,
            })?;
        let script = dir.join(relative);
        if !runtime.exists(&script) {
            return Err(InstallError::BootstrapMissing(script));
        }

        runtime.set_permissions(&script, EXECUTABLE_MODE)?;

        info!("Running bootstrap {:?}", script);
        let output = runner
            .run(&script_command(&script).current_dir(dir))
            .await?;
        if !output.is_success() {
            return Err(InstallError::BootstrapFailed {
                script,
                output: format!("{}{}", output.stdout, output.stderr).trim().to_string(),
            });
        }

        if self.os == Os::Macos
            && let Some(launcher) = &spec.launcher
        {
            let home = runtime.home_dir().ok_or(InstallError::HomeDirMissing)?;
            let path = home.join(&launcher.path);
            if let Some(parent) = path.parent() {
                runtime.create_dir_all(parent)?;
            }
            runtime.write(&path, launcher.contents.as_bytes())?;
            runtime.set_permissions(&path, EXECUTABLE_MODE)?;
            info!("Wrote launcher {:?}", path);
        }

        Ok(())
    }

    /// Remove the checkout and any launcher the bootstrap wrote.
    ///
    /// Returns `Ok(false)` when there was no checkout to remove.
    #[tracing::instrument(skip(self, runtime))]
    pub fn uninstall<R: Runtime + ?Sized>(&self, runtime: &R, repo: &str) -> Result<bool, InstallError> {
        let repo = repo.parse::<GitHubRepo>()?;
        let dir = resolve_install_dir(runtime, &self.base_dir, &repo)?;

        if let Some(launcher) = self.registry.get(&repo.repo).and_then(|s| s.launcher.as_ref())
            && let Some(home) = runtime.home_dir()
        {
            let path = home.join(&launcher.path);
            if runtime.exists(&path) {
                runtime.remove_file(&path)?;
                info!("Removed launcher {:?}", path);
            }
        }

        if !runtime.exists(&dir) {
            debug!("{} is not installed at {:?}", repo, dir);
            return Ok(false);
        }

        runtime.remove_dir_all(&dir)?;
        info!("Removed {:?}", dir);
        Ok(true)
    }
}

/// PowerShell scripts need an interpreter; everything else runs directly
/// through its shebang or file association.
fn script_command(script: &Path) -> CommandSpec {
    match script.extension().and_then(|e| e.to_str()) {
        Some("ps1") => CommandSpec::new("powershell")
            .args(["-NoProfile", "-ExecutionPolicy", "Bypass", "-File"])
            .arg(script.to_string_lossy()),
        _ => CommandSpec::new(script.to_string_lossy()),
    }
}
