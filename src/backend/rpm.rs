//! RPM based distributions: dnf and yum share the rpm database for the
//! installed index. Only dnf has install and remove recipes.

use async_trait::async_trait;

use super::{
    Action, ActionOutcome, Backend, Listing, LISTING_TIMEOUT, collect_listing, elevated,
    parse_tab_rows, run_action,
};
use crate::platform::BackendKind;
use crate::process::{CommandRunner, CommandSpec};

const QUERY_FORMAT: &str = "%{NAME}\t%{VERSION}-%{RELEASE}\n";

pub struct Rpm {
    kind: BackendKind,
    privileged: bool,
}

impl Rpm {
    pub fn dnf(privileged: bool) -> Self {
        Self {
            kind: BackendKind::Dnf,
            privileged,
        }
    }

    pub fn yum() -> Self {
        Self {
            kind: BackendKind::Yum,
            privileged: false,
        }
    }

    fn dnf_command(&self, args: &[&str]) -> CommandSpec {
        elevated(self.privileged, "dnf", args.iter().copied())
    }
}

#[async_trait]
impl Backend for Rpm {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    #[tracing::instrument(skip(self, runner))]
    async fn list_installed(&self, runner: &dyn CommandRunner) -> Listing {
        let mut listing = Listing::new();
        collect_listing(
            runner,
            CommandSpec::new("rpm")
                .args(["-qa", "--queryformat", QUERY_FORMAT])
                .timeout(LISTING_TIMEOUT),
            &mut listing,
            parse_tab_rows,
        )
        .await;
        listing
    }

    async fn install(&self, runner: &dyn CommandRunner, name: &str) -> ActionOutcome {
        match self.kind {
            BackendKind::Dnf => run_action(runner, self.dnf_command(&["install", "-y", name])).await,
            kind => ActionOutcome::unsupported(Action::Install, kind),
        }
    }

    async fn uninstall(&self, runner: &dyn CommandRunner, name: &str) -> ActionOutcome {
        match self.kind {
            BackendKind::Dnf => run_action(runner, self.dnf_command(&["remove", "-y", name])).await,
            kind => ActionOutcome::unsupported(Action::Uninstall, kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{CommandOutput, MockCommandRunner};

    #[tokio::test]
    async fn test_query_installed_parses_rpm_rows() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|cmd| cmd.is(&["rpm", "-qa", "--queryformat", QUERY_FORMAT]))
            .times(1)
            .returning(|_| Ok(CommandOutput::success("firefox\t120.0-1.fc39\nbash\t5.2.21-1.fc39\n")));

        let index = Rpm::dnf(false).query_installed(&runner).await;
        assert_eq!(index["firefox"], "120.0-1.fc39");
        assert_eq!(index["bash"], "5.2.21-1.fc39");
    }

    #[tokio::test]
    async fn test_dnf_install_and_remove() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|cmd| cmd.is(&["sudo", "dnf", "install", "-y", "htop"]))
            .times(1)
            .returning(|_| Ok(CommandOutput::success("")));
        runner
            .expect_run()
            .withf(|cmd| cmd.is(&["sudo", "dnf", "remove", "-y", "htop"]))
            .times(1)
            .returning(|_| Ok(CommandOutput::success("")));

        let dnf = Rpm::dnf(false);
        assert!(dnf.install(&runner, "htop").await.success);
        assert!(dnf.uninstall(&runner, "htop").await.success);
    }

    #[tokio::test]
    async fn test_dnf_update_not_supported() {
        let runner = MockCommandRunner::new();

        let outcome = Rpm::dnf(false).update(&runner, "htop").await;
        assert_eq!(outcome.error.as_deref(), Some("update is not supported for dnf"));
    }

    #[tokio::test]
    async fn test_yum_actions_not_supported() {
        let runner = MockCommandRunner::new();
        let yum = Rpm::yum();

        assert_eq!(yum.kind(), BackendKind::Yum);
        for outcome in [
            yum.install(&runner, "htop").await,
            yum.update(&runner, "htop").await,
            yum.uninstall(&runner, "htop").await,
        ] {
            assert!(!outcome.success);
            assert!(outcome.error.unwrap().contains("not supported for yum"));
        }
    }
}
