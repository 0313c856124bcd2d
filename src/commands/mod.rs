//! Command-line operations. Each returns a [`Report`] that `main` prints as
//! JSON; none of them print anything else.

use anyhow::Result;
use log::debug;
use serde::Serialize;
use serde_json::{Value, json};

use crate::backend::ActionOutcome;
use crate::catalog::PackageEntry;
use crate::engine::{ActionResults, Engine, PackageStatus, UpdateMode};
use crate::process::CommandRunner;
use crate::runtime::Runtime;

mod uninstall;

pub use uninstall::uninstall;

/// JSON payload of a command and whether any part of it failed.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub value: Value,
    pub failed: bool,
}

impl Report {
    pub fn ok(value: impl Serialize) -> Result<Self> {
        Ok(Self {
            value: serde_json::to_value(value)?,
            failed: false,
        })
    }

    /// Wrap per-package outcomes. Any unsuccessful package fails the report.
    pub fn from_results(results: &ActionResults) -> Result<Self> {
        let failed = results.values().any(|outcome| !outcome.success);
        Ok(Self {
            value: json!({ "success": !failed, "results": serde_json::to_value(results)? }),
            failed,
        })
    }
}

#[tracing::instrument(skip(engine))]
pub async fn status<R: Runtime, C: CommandRunner>(
    engine: &Engine<R, C>,
    refresh: bool,
) -> Result<Report> {
    let packages = engine.get_status(refresh).await?;
    Report::ok(json!({
        "packages": packages,
        "os": engine.os(),
        "package_manager": engine.backend(),
    }))
}

#[tracing::instrument(skip(engine))]
pub async fn refresh<R: Runtime, C: CommandRunner>(engine: &Engine<R, C>) -> Result<Report> {
    let status = engine.get_status_cheap().await?;
    let mut value = json!({
        "success": true,
        "packages": status.packages,
        "cached": status.cached,
    });
    if status.cached {
        value["cache_age"] = json!(status.age);
    }
    Report::ok(value)
}

/// Catalog contents without touching any package manager.
#[tracing::instrument(skip(engine))]
pub fn list<R: Runtime, C: CommandRunner>(engine: &Engine<R, C>) -> Result<Report> {
    let catalog = engine.catalog()?;
    Report::ok(json!({
        "packages": catalog.entries(),
        "enabled": catalog.enabled_names(),
    }))
}

/// Per-package probe with update information. Names not in the catalog are
/// probed as enabled entries without a description.
#[tracing::instrument(skip(engine))]
pub async fn probe<R: Runtime, C: CommandRunner>(
    engine: &Engine<R, C>,
    names: &[String],
) -> Result<Report> {
    let catalog = engine.catalog()?;
    let mut packages: Vec<PackageStatus> = Vec::with_capacity(names.len());
    for name in names {
        let entry = match catalog.entries().iter().find(|e| &e.name == name) {
            Some(entry) => entry.clone(),
            None => {
                debug!("{} is not in the catalog", name);
                PackageEntry {
                    name: name.clone(),
                    enabled: true,
                    description: String::new(),
                }
            }
        };
        packages.push(engine.package_status(&entry).await);
    }
    Report::ok(json!({ "packages": packages }))
}

#[tracing::instrument(skip(engine))]
pub async fn install<R: Runtime, C: CommandRunner>(
    engine: &Engine<R, C>,
    names: &[String],
) -> Result<Report> {
    Report::from_results(&engine.install(names).await)
}

/// `--all` updates whatever the status reports as outdated; otherwise the
/// given names, and nothing at all when there are none.
#[tracing::instrument(skip(engine))]
pub async fn update<R: Runtime, C: CommandRunner>(
    engine: &Engine<R, C>,
    all: bool,
    names: &[String],
) -> Result<Report> {
    let mode = match (all, names.is_empty()) {
        (true, _) => UpdateMode::All,
        (false, true) => UpdateMode::None,
        (false, false) => UpdateMode::List,
    };
    if mode == UpdateMode::None {
        return Report::ok(json!({ "success": true, "message": "No updates performed" }));
    }
    Report::from_results(&engine.update(mode, names).await?)
}

pub fn detect<R: Runtime, C: CommandRunner>(engine: &Engine<R, C>) -> Result<Report> {
    Report::ok(json!({
        "os": engine.os(),
        "package_manager": engine.backend(),
        "base_dir": engine.config().base_dir,
        "catalog": engine.config().catalog_path,
        "version": env!("PKGSYNC_VERSION"),
    }))
}

/// Where a `github:owner/repo` entry installs to, and whether it is there.
#[tracing::instrument(skip(engine))]
pub fn resolve<R: Runtime, C: CommandRunner>(engine: &Engine<R, C>, repo: &str) -> Result<Report> {
    let github = engine.github();
    match github.install_dir(engine.runtime(), repo) {
        Ok(dir) => Report::ok(json!({
            "repo": repo,
            "dir": dir,
            "installed": github.is_installed(engine.runtime(), repo),
        })),
        Err(e) => Ok(Report {
            value: serde_json::to_value(ActionOutcome::failed(e.to_string()))?,
            failed: true,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Brew, Unavailable};
    use crate::config::Config;
    use crate::platform::Os;
    use crate::process::{CommandOutput, MockCommandRunner};
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;
    use std::path::PathBuf;

    fn engine(
        runtime: MockRuntime,
        runner: MockCommandRunner,
    ) -> Engine<MockRuntime, MockCommandRunner> {
        Engine::with_backend(
            runtime,
            runner,
            Config::with_base_dir("/srv/install"),
            Os::Linux,
            Box::new(Unavailable),
        )
    }

    fn runtime_with_catalog(text: &'static str) -> MockRuntime {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_exists()
            .with(eq(PathBuf::from("/srv/install/desktop.conf")))
            .returning(|_| true);
        runtime
            .expect_read_to_string()
            .returning(move |_| Ok(text.to_string()));
        runtime
    }

    #[test]
    fn test_report_from_results() {
        let mut results = ActionResults::new();
        results.insert("firefox".into(), ActionOutcome::ok());
        let report = Report::from_results(&results).unwrap();
        assert!(!report.failed);
        assert_eq!(report.value["results"]["firefox"]["success"], json!(true));
        assert_eq!(report.value["results"]["firefox"]["error"], Value::Null);

        results.insert("vlc".into(), ActionOutcome::nothing_to_do());
        let report = Report::from_results(&results).unwrap();
        assert!(report.failed);
        assert_eq!(report.value["success"], json!(false));
    }

    #[tokio::test]
    async fn test_status_report() {
        let engine = engine(runtime_with_catalog("firefox # Browser\n"), MockCommandRunner::new());
        let report = status(&engine, false).await.unwrap();

        assert!(!report.failed);
        assert_eq!(report.value["os"], json!("linux"));
        assert_eq!(report.value["package_manager"], json!("none"));
        assert_eq!(report.value["packages"][0]["name"], json!("firefox"));
        assert_eq!(report.value["packages"][0]["installed"], json!(false));
    }

    #[tokio::test]
    async fn test_refresh_reports_cache_age_only_when_cached() {
        let engine = engine(runtime_with_catalog("firefox\n"), MockCommandRunner::new());

        let first = refresh(&engine).await.unwrap();
        assert_eq!(first.value["cached"], json!(false));
        assert!(first.value.get("cache_age").is_none());

        let second = refresh(&engine).await.unwrap();
        assert_eq!(second.value["cached"], json!(true));
        assert!(second.value["cache_age"].as_f64().unwrap() < 10.0);
    }

    #[test]
    fn test_list_report() {
        let engine = engine(
            runtime_with_catalog("## Media\nfirefox # Browser\n#vlc # Player\n"),
            MockCommandRunner::new(),
        );
        let report = list(&engine).unwrap();

        assert_eq!(report.value["enabled"], json!(["firefox"]));
        assert_eq!(report.value["packages"][1]["name"], json!("vlc"));
        assert_eq!(report.value["packages"][1]["enabled"], json!(false));
        assert_eq!(report.value["packages"][1]["description"], json!("Player"));
    }

    #[tokio::test]
    async fn test_probe_uses_catalog_description() {
        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(|cmd| {
            if cmd.is(&["brew", "list", "--cask", "--versions", "firefox"]) {
                Ok(CommandOutput::success("firefox 120.0\n"))
            } else {
                Ok(CommandOutput::success(""))
            }
        });
        let engine = Engine::with_backend(
            runtime_with_catalog("firefox # Browser\n"),
            runner,
            Config::with_base_dir("/srv/install"),
            Os::Macos,
            Box::new(Brew),
        );

        let report = probe(&engine, &["firefox".to_string(), "wget".to_string()])
            .await
            .unwrap();
        let packages = &report.value["packages"];
        assert_eq!(packages[0]["description"], json!("Browser"));
        assert_eq!(packages[0]["version"], json!("120.0"));
        assert_eq!(packages[0]["update_available"], json!(false));
        assert_eq!(packages[1]["installed"], json!(false));
    }

    #[tokio::test]
    async fn test_update_without_names_does_nothing() {
        let engine = engine(MockRuntime::new(), MockCommandRunner::new());
        let report = update(&engine, false, &[]).await.unwrap();
        assert!(!report.failed);
        assert_eq!(report.value["message"], json!("No updates performed"));
    }

    #[tokio::test]
    async fn test_install_without_backend_fails_report() {
        let engine = engine(MockRuntime::new(), MockCommandRunner::new());
        let report = install(&engine, &["firefox".to_string()]).await.unwrap();
        assert!(report.failed);
        assert_eq!(
            report.value["results"]["firefox"]["error"],
            json!("No supported package manager was detected")
        );
    }

    #[test]
    fn test_resolve_report() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_exists()
            .with(eq(PathBuf::from("/srv/bar")))
            .returning(|_| false);
        let engine = engine(runtime, MockCommandRunner::new());

        let report = resolve(&engine, "github:foo/bar").unwrap();
        assert!(!report.failed);
        assert_eq!(report.value["dir"], json!("/srv/bar"));
        assert_eq!(report.value["installed"], json!(false));

        let report = resolve(&engine, "foo").unwrap();
        assert!(report.failed);
        assert_eq!(report.value["success"], json!(false));
    }

    #[test]
    fn test_detect_report() {
        let engine = engine(MockRuntime::new(), MockCommandRunner::new());
        let report = detect(&engine).unwrap();
        assert_eq!(report.value["package_manager"], json!("none"));
        assert_eq!(report.value["base_dir"], json!("/srv/install"));
    }
}
