//! Debian/Ubuntu apt, with dpkg-query for the installed index.

use async_trait::async_trait;
use log::debug;

use super::{
    ActionOutcome, Backend, Listing, LISTING_TIMEOUT, PackageProbe, collect_listing,
    elevated, normalize_version, run_action,
};
use crate::platform::BackendKind;
use crate::process::{CommandRunner, CommandSpec};

const LIST_FORMAT: &str = "-f=${Package}\t${Version}\t${db:Status-Status}\n";

pub struct Apt {
    privileged: bool,
}

impl Apt {
    pub fn new(privileged: bool) -> Self {
        Self { privileged }
    }

    fn apt_get(&self, args: &[&str]) -> CommandSpec {
        elevated(self.privileged, "apt-get", args.iter().copied())
    }
}

/// Parse `package<TAB>version<TAB>status` rows, keeping installed packages.
/// Packages that were removed but not purged show up as `config-files`.
fn parse_dpkg_rows(output: &str) -> Vec<(String, String)> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let name = fields.next()?.trim();
            let version = fields.next().unwrap_or_default();
            let status = fields.next().unwrap_or("installed").trim();
            (!name.is_empty() && status == "installed")
                .then(|| (name.to_string(), normalize_version(version)))
        })
        .collect()
}

/// `apt list --upgradable` prints `name/suite new-version arch [upgradable from: old]`.
fn parse_upgradable(output: &str, name: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let mut fields = line.split_whitespace();
        let package = fields.next()?.split('/').next()?;
        if package != name || !line.contains("upgradable from") {
            return None;
        }
        Some(fields.next().unwrap_or("available").to_string())
    })
}

#[async_trait]
impl Backend for Apt {
    fn kind(&self) -> BackendKind {
        BackendKind::Apt
    }

    #[tracing::instrument(skip(self, runner))]
    async fn list_installed(&self, runner: &dyn CommandRunner) -> Listing {
        let mut listing = Listing::new();
        collect_listing(
            runner,
            CommandSpec::new("dpkg-query")
                .args(["-W", LIST_FORMAT])
                .timeout(LISTING_TIMEOUT),
            &mut listing,
            parse_dpkg_rows,
        )
        .await;
        listing
    }

    #[tracing::instrument(skip(self, runner))]
    async fn probe(&self, runner: &dyn CommandRunner, name: &str) -> PackageProbe {
        let query = CommandSpec::new("dpkg-query").args(["-W", LIST_FORMAT, name]);
        let version = match runner.run(&query).await {
            Ok(out) if out.is_success() => parse_dpkg_rows(&out.stdout)
                .into_iter()
                .find(|(pkg, _)| pkg == name)
                .map(|(_, version)| version),
            Ok(_) => None,
            Err(e) => {
                debug!("dpkg-query {} failed: {}", name, e);
                None
            }
        };

        let Some(version) = version else {
            return PackageProbe::default();
        };

        let upgradable = CommandSpec::new("apt").args(["list", "--upgradable", name]);
        let new_version = match runner.run(&upgradable).await {
            Ok(out) => parse_upgradable(&out.stdout, name),
            Err(e) => {
                debug!("apt list --upgradable {} failed: {}", name, e);
                None
            }
        };

        PackageProbe {
            installed: true,
            version: Some(version),
            update_available: new_version.is_some(),
            new_version,
        }
    }

    #[tracing::instrument(skip(self, runner))]
    async fn install(&self, runner: &dyn CommandRunner, name: &str) -> ActionOutcome {
        run_action(runner, self.apt_get(&["install", "-y", name])).await
    }

    #[tracing::instrument(skip(self, runner))]
    async fn update(&self, runner: &dyn CommandRunner, name: &str) -> ActionOutcome {
        run_action(runner, self.apt_get(&["install", "--only-upgrade", "-y", name])).await
    }

    #[tracing::instrument(skip(self, runner))]
    async fn uninstall(&self, runner: &dyn CommandRunner, name: &str) -> ActionOutcome {
        run_action(runner, self.apt_get(&["remove", "-y", name])).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{CommandOutput, MockCommandRunner};

    #[test]
    fn test_parse_dpkg_rows_skips_config_files() {
        let rows = parse_dpkg_rows(
            "firefox\t120.0+build2-0ubuntu1\tinstalled\nold\t1.0\tconfig-files\nvim\t2:9.0.1\tinstalled\n",
        );
        assert_eq!(
            rows,
            vec![
                ("firefox".to_string(), "120.0+build2-0ubuntu1".to_string()),
                ("vim".to_string(), "2:9.0.1".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_upgradable() {
        let out = "Listing...\nvim/jammy-updates 2:9.0.2 amd64 [upgradable from: 2:9.0.1]\n";
        assert_eq!(parse_upgradable(out, "vim").as_deref(), Some("2:9.0.2"));
        assert_eq!(parse_upgradable(out, "vi"), None);
        assert_eq!(parse_upgradable("Listing...\n", "vim"), None);
    }

    #[tokio::test]
    async fn test_query_installed_uses_single_batched_call() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|cmd| cmd.program == "dpkg-query" && cmd.timeout == Some(LISTING_TIMEOUT))
            .times(1)
            .returning(|_| Ok(CommandOutput::success("git\t1:2.34.1-1ubuntu1\tinstalled\n")));

        let index = Apt::new(false).query_installed(&runner).await;
        assert_eq!(index["git"], "1:2.34.1-1ubuntu1");
    }

    #[tokio::test]
    async fn test_install_uses_sudo() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|cmd| cmd.is(&["sudo", "apt-get", "install", "-y", "vim"]))
            .times(1)
            .returning(|_| Ok(CommandOutput::success("")));

        assert!(Apt::new(false).install(&runner, "vim").await.success);
    }

    #[tokio::test]
    async fn test_update_only_upgrade_as_root() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|cmd| cmd.is(&["apt-get", "install", "--only-upgrade", "-y", "vim"]))
            .times(1)
            .returning(|_| Ok(CommandOutput::success("")));

        assert!(Apt::new(true).update(&runner, "vim").await.success);
    }

    #[tokio::test]
    async fn test_uninstall_failure_carries_stderr() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|cmd| cmd.is(&["sudo", "apt-get", "remove", "-y", "vim"]))
            .returning(|_| Ok(CommandOutput::failure(100, "E: Could not open lock file\n")));

        assert_eq!(
            Apt::new(false).uninstall(&runner, "vim").await,
            ActionOutcome::failed("E: Could not open lock file")
        );
    }

    #[tokio::test]
    async fn test_probe_installed_with_update() {
        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(|cmd| {
            if cmd.program == "dpkg-query" {
                Ok(CommandOutput::success("vim\t2:9.0.1\tinstalled"))
            } else {
                Ok(CommandOutput::success(
                    "vim/jammy 2:9.0.2 amd64 [upgradable from: 2:9.0.1]\n",
                ))
            }
        });

        let probe = Apt::new(false).probe(&runner, "vim").await;
        assert!(probe.installed);
        assert_eq!(probe.version.as_deref(), Some("2:9.0.1"));
        assert!(probe.update_available);
        assert_eq!(probe.new_version.as_deref(), Some("2:9.0.2"));
    }

    #[tokio::test]
    async fn test_probe_not_installed_skips_update_check() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|cmd| cmd.program == "dpkg-query")
            .times(1)
            .returning(|_| Ok(CommandOutput::failure(1, "no packages found matching ghost")));

        assert_eq!(Apt::new(false).probe(&runner, "ghost").await, PackageProbe::default());
    }
}
