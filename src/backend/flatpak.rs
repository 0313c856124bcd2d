//! Flatpak applications, keyed by application id.

use async_trait::async_trait;

use super::{
    ActionOutcome, Backend, Listing, LISTING_TIMEOUT, collect_listing, parse_tab_rows,
    run_action,
};
use crate::platform::BackendKind;
use crate::process::{CommandRunner, CommandSpec};

pub struct Flatpak;

#[async_trait]
impl Backend for Flatpak {
    fn kind(&self) -> BackendKind {
        BackendKind::Flatpak
    }

    #[tracing::instrument(skip(self, runner))]
    async fn list_installed(&self, runner: &dyn CommandRunner) -> Listing {
        let mut listing = Listing::new();
        collect_listing(
            runner,
            CommandSpec::new("flatpak")
                .args(["list", "--app", "--columns=application,version"])
                .timeout(LISTING_TIMEOUT),
            &mut listing,
            parse_tab_rows,
        )
        .await;
        listing
    }

    #[tracing::instrument(skip(self, runner))]
    async fn uninstall(&self, runner: &dyn CommandRunner, name: &str) -> ActionOutcome {
        run_action(
            runner,
            CommandSpec::new("flatpak").args(["uninstall", "-y", name]),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::UNKNOWN_VERSION;
    use crate::process::{CommandOutput, MockCommandRunner};

    #[tokio::test]
    async fn test_query_installed_handles_missing_versions() {
        let mut runner = MockCommandRunner::new();
        runner.expect_run().times(1).returning(|_| {
            Ok(CommandOutput::success(
                "org.mozilla.firefox\t121.0\ncom.spotify.Client\t\n",
            ))
        });

        let index = Flatpak.query_installed(&runner).await;
        assert_eq!(index["org.mozilla.firefox"], "121.0");
        assert_eq!(index["com.spotify.Client"], UNKNOWN_VERSION);
    }

    #[tokio::test]
    async fn test_install_and_update_not_supported() {
        let runner = MockCommandRunner::new();

        assert_eq!(
            Flatpak.install(&runner, "org.gimp.GIMP").await.error.as_deref(),
            Some("install is not supported for flatpak")
        );
        assert!(!Flatpak.update(&runner, "org.gimp.GIMP").await.success);
    }

    #[tokio::test]
    async fn test_uninstall() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|cmd| cmd.is(&["flatpak", "uninstall", "-y", "org.gimp.GIMP"]))
            .times(1)
            .returning(|_| Ok(CommandOutput::success("")));

        assert!(Flatpak.uninstall(&runner, "org.gimp.GIMP").await.success);
    }
}
