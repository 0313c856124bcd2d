//! Platform package manager adapters.
//!
//! Each [`BackendKind`] has one adapter implementing [`Backend`]. An adapter
//! owns the command recipes for its package manager: the batched listing used
//! to build the installed index, the legacy single-package probe, and the
//! install/update/uninstall actions. Actions an adapter does not implement
//! fall back to the trait defaults, which report "not supported" without
//! running anything.

mod apt;
mod brew;
mod flatpak;
mod rpm;
mod unavailable;
mod winget;

pub use apt::Apt;
pub use brew::Brew;
pub use flatpak::Flatpak;
pub use rpm::Rpm;
pub use unavailable::Unavailable;
pub use winget::Winget;

use async_trait::async_trait;
use log::warn;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::platform::BackendKind;
use crate::process::{CommandOutput, CommandRunner, CommandSpec, ProcessError};

/// Installed package name to version, from one batched listing.
pub type InstalledIndex = HashMap<String, String>;

/// Result of a batched listing. `complete` is false when any listing
/// command timed out, failed to start or exited nonzero, so a name missing
/// from `index` may still be installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub index: InstalledIndex,
    pub complete: bool,
}

impl Listing {
    pub fn new() -> Self {
        Self {
            index: InstalledIndex::new(),
            complete: true,
        }
    }
}

impl Default for Listing {
    fn default() -> Self {
        Self::new()
    }
}

/// Version reported for packages that are installed but whose version could
/// not be read.
pub const UNKNOWN_VERSION: &str = "unknown";

/// Listing timeout for most backends.
pub const LISTING_TIMEOUT: Duration = Duration::from_secs(10);
/// Listing timeout for the slower brew and winget listings.
pub const SLOW_LISTING_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Install,
    Update,
    Uninstall,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Install => "install",
            Action::Update => "update",
            Action::Uninstall => "uninstall",
        })
    }
}

/// Per-package result of a mutating operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl ActionOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
        }
    }

    /// Failure without a message: there was nothing to act on.
    pub fn nothing_to_do() -> Self {
        Self::default()
    }

    pub fn unsupported(action: Action, kind: BackendKind) -> Self {
        Self::failed(format!("{} is not supported for {}", action, kind))
    }

    pub fn unavailable() -> Self {
        Self::failed("No supported package manager was detected")
    }

    fn from_output(output: &CommandOutput) -> Self {
        if output.is_success() {
            Self::ok()
        } else {
            Self::failed(output.diagnostic())
        }
    }
}

/// State of one package as reported by the legacy single-package probe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageProbe {
    pub installed: bool,
    pub version: Option<String>,
    pub update_available: bool,
    pub new_version: Option<String>,
}

#[async_trait]
pub trait Backend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Build the installed index with as few invocations as possible.
    ///
    /// Never fails: timeouts and command errors are logged, whatever was
    /// parsed up to that point is returned and the listing is marked
    /// incomplete.
    async fn list_installed(&self, runner: &dyn CommandRunner) -> Listing;

    async fn query_installed(&self, runner: &dyn CommandRunner) -> InstalledIndex {
        self.list_installed(runner).await.index
    }

    /// Probe a single package, including update information where the
    /// package manager can provide it cheaply.
    async fn probe(&self, runner: &dyn CommandRunner, name: &str) -> PackageProbe {
        let index = self.query_installed(runner).await;
        match index.get(name) {
            Some(version) => PackageProbe {
                installed: true,
                version: Some(version.clone()),
                ..Default::default()
            },
            None => PackageProbe::default(),
        }
    }

    async fn install(&self, _runner: &dyn CommandRunner, _name: &str) -> ActionOutcome {
        ActionOutcome::unsupported(Action::Install, self.kind())
    }

    async fn update(&self, _runner: &dyn CommandRunner, _name: &str) -> ActionOutcome {
        ActionOutcome::unsupported(Action::Update, self.kind())
    }

    async fn uninstall(&self, _runner: &dyn CommandRunner, _name: &str) -> ActionOutcome {
        ActionOutcome::unsupported(Action::Uninstall, self.kind())
    }
}

/// Select the adapter for a backend kind.
///
/// `privileged` tells system package managers that the process already has
/// administrator rights, so `sudo` is not needed.
pub fn adapter_for(kind: BackendKind, privileged: bool) -> Box<dyn Backend> {
    match kind {
        BackendKind::Brew => Box::new(Brew),
        BackendKind::Apt => Box::new(Apt::new(privileged)),
        BackendKind::Dnf => Box::new(Rpm::dnf(privileged)),
        BackendKind::Yum => Box::new(Rpm::yum()),
        BackendKind::Flatpak => Box::new(Flatpak),
        BackendKind::Winget => Box::new(Winget),
        BackendKind::None => Box::new(Unavailable),
    }
}

/// Prefix a system package manager command with `sudo` unless already root.
pub(crate) fn elevated<I, S>(privileged: bool, program: &str, args: I) -> CommandSpec
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    if privileged {
        CommandSpec::new(program).args(args)
    } else {
        CommandSpec::new("sudo").arg(program).args(args)
    }
}

/// Run a mutating command and turn its exit status into an outcome.
pub(crate) async fn run_action(runner: &dyn CommandRunner, command: CommandSpec) -> ActionOutcome {
    match runner.run(&command).await {
        Ok(output) => {
            let outcome = ActionOutcome::from_output(&output);
            if !outcome.success {
                warn!("`{}` failed: {}", command, output.diagnostic());
            }
            outcome
        }
        Err(e) => {
            warn!("`{}` could not be run: {}", command, e);
            ActionOutcome::failed(e.to_string())
        }
    }
}

/// Run a listing command and merge its parsed output into `listing`.
///
/// Output of a command that exits nonzero is still parsed; a timeout or
/// spawn failure leaves the index as it was. Either way the listing is no
/// longer complete.
pub(crate) async fn collect_listing<F>(
    runner: &dyn CommandRunner,
    command: CommandSpec,
    listing: &mut Listing,
    parse: F,
) where
    F: Fn(&str) -> Vec<(String, String)>,
{
    match runner.run(&command).await {
        Ok(output) => {
            if !output.is_success() {
                warn!("`{}` exited with {:?}: {}", command, output.code, output.diagnostic());
                listing.complete = false;
            }
            listing.index.extend(parse(&output.stdout));
        }
        Err(e) => {
            match e.downcast_ref::<ProcessError>() {
                Some(ProcessError::Timeout { .. }) => warn!(
                    "{}; reporting {} package(s) parsed so far",
                    e,
                    listing.index.len()
                ),
                _ => warn!("Listing installed packages failed: {:#}", e),
            }
            listing.complete = false;
        }
    }
}

/// Normalize a raw version string, falling back to [`UNKNOWN_VERSION`] when
/// it does not look like a version at all.
pub fn normalize_version(raw: &str) -> String {
    let raw = raw.trim();
    if raw.chars().any(|c| c.is_ascii_digit()) {
        raw.to_string()
    } else {
        UNKNOWN_VERSION.to_string()
    }
}

/// Parse `name<TAB>version[<TAB>…]` rows. Rows without a name are skipped.
pub(crate) fn parse_tab_rows(output: &str) -> Vec<(String, String)> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let name = fields.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let version = fields.next().unwrap_or_default();
            Some((name.to_string(), normalize_version(version)))
        })
        .collect()
}
