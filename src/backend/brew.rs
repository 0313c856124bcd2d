//! Homebrew. Casks and formulae live in separate namespaces, so every action
//! tries the cask first and falls back to the formula.

use async_trait::async_trait;
use log::debug;
use regex::Regex;
use std::sync::LazyLock;

use super::{
    ActionOutcome, Backend, Listing, PackageProbe, SLOW_LISTING_TIMEOUT, UNKNOWN_VERSION,
    collect_listing, run_action,
};
use crate::platform::BackendKind;
use crate::process::{CommandRunner, CommandSpec};

static OUTDATED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+\.\d+(?:\.\d+)?)\S*\)?\s*(?:<|!=)\s*(\d+\.\d+(?:\.\d+)?\S*)")
        .expect("valid outdated regex")
});

pub struct Brew;

fn brew<'a>(args: impl IntoIterator<Item = &'a str>) -> CommandSpec {
    CommandSpec::new("brew").args(args)
}

/// Parse `brew list --versions` lines: `name v1 [v2 …]`. The last listed
/// version is kept.
pub(crate) fn parse_versions(output: &str) -> Vec<(String, String)> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let name = fields.next()?;
            let version = fields
                .last()
                .map(super::normalize_version)
                .unwrap_or_else(|| UNKNOWN_VERSION.to_string());
            Some((name.to_string(), version))
        })
        .collect()
}

/// Extract the newer version from `brew outdated --verbose` output, e.g.
/// `firefox (120.0) != 121.0` or `wget (1.21.3) < 1.21.4`.
fn parse_outdated(output: &str, name: &str) -> Option<String> {
    output
        .lines()
        .filter(|line| line.split_whitespace().next() == Some(name))
        .find_map(|line| OUTDATED_RE.captures(line))
        .map(|caps| caps[2].to_string())
}

impl Brew {
    async fn outdated(&self, runner: &dyn CommandRunner, name: &str) -> Option<String> {
        for args in [
            ["outdated", "--cask", "--verbose", name].as_slice(),
            ["outdated", "--verbose", name].as_slice(),
        ] {
            match runner.run(&brew(args.iter().copied())).await {
                Ok(out) if out.is_success() => return parse_outdated(&out.stdout, name),
                Ok(_) => continue,
                Err(e) => {
                    debug!("brew outdated {} failed: {}", name, e);
                    return None;
                }
            }
        }
        None
    }
}

#[async_trait]
impl Backend for Brew {
    fn kind(&self) -> BackendKind {
        BackendKind::Brew
    }

    #[tracing::instrument(skip(self, runner))]
    async fn list_installed(&self, runner: &dyn CommandRunner) -> Listing {
        let mut listing = Listing::new();
        collect_listing(
            runner,
            brew(["list", "--cask", "--versions"]).timeout(SLOW_LISTING_TIMEOUT),
            &mut listing,
            parse_versions,
        )
        .await;
        collect_listing(
            runner,
            brew(["list", "--formula", "--versions"]).timeout(SLOW_LISTING_TIMEOUT),
            &mut listing,
            parse_versions,
        )
        .await;
        listing
    }

    #[tracing::instrument(skip(self, runner))]
    async fn probe(&self, runner: &dyn CommandRunner, name: &str) -> PackageProbe {
        let mut listed = None;
        for kind in ["--cask", "--formula"] {
            match runner.run(&brew(["list", kind, "--versions", name])).await {
                Ok(out) if out.is_success() && !out.stdout.trim().is_empty() => {
                    listed = Some(out.stdout);
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    debug!("brew list {} failed: {}", name, e);
                    break;
                }
            }
        }

        let Some(listing) = listed else {
            return PackageProbe::default();
        };

        let version = parse_versions(&listing)
            .into_iter()
            .next()
            .map(|(_, v)| v)
            .unwrap_or_else(|| UNKNOWN_VERSION.to_string());
        let new_version = self.outdated(runner, name).await;

        PackageProbe {
            installed: true,
            version: Some(version),
            update_available: new_version.is_some(),
            new_version,
        }
    }

    #[tracing::instrument(skip(self, runner))]
    async fn install(&self, runner: &dyn CommandRunner, name: &str) -> ActionOutcome {
        let cask = run_action(runner, brew(["install", "--cask", name])).await;
        if cask.success {
            return cask;
        }
        debug!("{} is not a cask, trying formula", name);
        run_action(runner, brew(["install", name])).await
    }

    /// Upgrades both namespaces; either succeeding counts as success.
    #[tracing::instrument(skip(self, runner))]
    async fn update(&self, runner: &dyn CommandRunner, name: &str) -> ActionOutcome {
        let cask = run_action(runner, brew(["upgrade", "--cask", name])).await;
        let formula = run_action(runner, brew(["upgrade", name])).await;
        if cask.success { cask } else { formula }
    }

    #[tracing::instrument(skip(self, runner))]
    async fn uninstall(&self, runner: &dyn CommandRunner, name: &str) -> ActionOutcome {
        let cask = run_action(runner, brew(["uninstall", "--cask", name])).await;
        if cask.success {
            return cask;
        }
        run_action(runner, brew(["uninstall", name])).await
    }
}
