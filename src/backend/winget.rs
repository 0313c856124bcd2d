//! Windows Package Manager. Packages are addressed by exact id.
//!
//! `winget list` prints a fixed-width table whose column widths depend on the
//! content, so the header row is used to locate the `Id` and `Version`
//! columns:
//!
//! ```text
//! Name               Id                  Version   Available Source
//! ---------------------------------------------------------------
//! Mozilla Firefox    Mozilla.Firefox     120.0     121.0     winget
//! ```

use async_trait::async_trait;

use super::{
    ActionOutcome, Backend, Listing, SLOW_LISTING_TIMEOUT, collect_listing,
    normalize_version, run_action,
};
use crate::platform::BackendKind;
use crate::process::{CommandRunner, CommandSpec};

pub struct Winget;

struct Columns {
    id: usize,
    version: usize,
    version_end: Option<usize>,
}

impl Columns {
    fn from_header(header: &[char]) -> Option<Self> {
        let id = find_word(header, "Id")?;
        let version = find_word(header, "Version")?;
        if version <= id {
            return None;
        }
        let version_end = ["Available", "Source"]
            .iter()
            .filter_map(|word| find_word(header, word))
            .filter(|&pos| pos > version)
            .min();
        Some(Self {
            id,
            version,
            version_end,
        })
    }
}

/// Char offset of `word` as a standalone column title.
fn find_word(line: &[char], word: &str) -> Option<usize> {
    let word: Vec<char> = word.chars().collect();
    (0..line.len().saturating_sub(word.len() - 1)).find(|&i| {
        line[i..].starts_with(&word)
            && (i == 0 || line[i - 1].is_whitespace())
            && line.get(i + word.len()).is_none_or(|c| c.is_whitespace())
    })
}

fn column(line: &[char], start: usize, end: Option<usize>) -> String {
    let end = end.unwrap_or(line.len()).min(line.len());
    if start >= end {
        return String::new();
    }
    line[start..end].iter().collect::<String>().trim().to_string()
}

/// Parse `winget list` output into `(id, version)` pairs.
pub(crate) fn parse_table(output: &str) -> Vec<(String, String)> {
    // Progress spinners are redrawn with carriage returns before the table.
    let lines: Vec<Vec<char>> = output
        .lines()
        .map(|line| line.rsplit('\r').next().unwrap_or(line).chars().collect())
        .collect();

    let Some(header_at) = lines.iter().position(|l| Columns::from_header(l).is_some()) else {
        return Vec::new();
    };
    let Some(columns) = Columns::from_header(&lines[header_at]) else {
        return Vec::new();
    };

    lines[header_at + 1..]
        .iter()
        .filter(|line| !line.iter().all(|c| *c == '-' || c.is_whitespace()))
        .filter_map(|line| {
            let id = column(line, columns.id, Some(columns.version));
            if id.is_empty() {
                return None;
            }
            let version = column(line, columns.version, columns.version_end);
            Some((id, normalize_version(&version)))
        })
        .collect()
}

#[async_trait]
impl Backend for Winget {
    fn kind(&self) -> BackendKind {
        BackendKind::Winget
    }

    #[tracing::instrument(skip(self, runner))]
    async fn list_installed(&self, runner: &dyn CommandRunner) -> Listing {
        let mut listing = Listing::new();
        collect_listing(
            runner,
            CommandSpec::new("winget")
                .args(["list", "--accept-source-agreements"])
                .timeout(SLOW_LISTING_TIMEOUT),
            &mut listing,
            parse_table,
        )
        .await;
        listing
    }

    #[tracing::instrument(skip(self, runner))]
    async fn install(&self, runner: &dyn CommandRunner, name: &str) -> ActionOutcome {
        run_action(
            runner,
            CommandSpec::new("winget").args(["install", "-e", "--id", name]),
        )
        .await
    }

    #[tracing::instrument(skip(self, runner))]
    async fn uninstall(&self, runner: &dyn CommandRunner, name: &str) -> ActionOutcome {
        run_action(
            runner,
            CommandSpec::new("winget").args(["uninstall", "-e", "--id", name]),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::UNKNOWN_VERSION;
    use crate::process::{CommandOutput, MockCommandRunner};

    const LISTING: &str = "\r   - \r   \\ \r\
Name               Id                  Version   Available Source
-----------------------------------------------------------------
Mozilla Firefox    Mozilla.Firefox     120.0     121.0     winget
Git                Git.Git             2.43.0              winget
Some Driver        ARP\\Machine\\X64\\drv Unknown
";

    #[test]
    fn test_parse_table() {
        let rows = parse_table(LISTING);
        assert_eq!(
            rows,
            vec![
                ("Mozilla.Firefox".to_string(), "120.0".to_string()),
                ("Git.Git".to_string(), "2.43.0".to_string()),
                ("ARP\\Machine\\X64\\drv".to_string(), UNKNOWN_VERSION.to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_table_without_header() {
        assert!(parse_table("No installed package found matching input criteria.\n").is_empty());
        assert!(parse_table("").is_empty());
    }

    #[test]
    fn test_find_word_requires_whole_column_title() {
        let line: Vec<char> = "Identity  Id  Version".chars().collect();
        assert_eq!(find_word(&line, "Id"), Some(10));
        assert_eq!(find_word(&line, "Version"), Some(14));
        assert_eq!(find_word(&line, "Source"), None);
    }

    #[tokio::test]
    async fn test_query_installed() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|cmd| cmd.program == "winget" && cmd.timeout == Some(SLOW_LISTING_TIMEOUT))
            .times(1)
            .returning(|_| Ok(CommandOutput::success(LISTING)));

        let index = Winget.query_installed(&runner).await;
        assert_eq!(index["Mozilla.Firefox"], "120.0");
    }

    #[tokio::test]
    async fn test_install_by_exact_id_and_update_unsupported() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|cmd| cmd.is(&["winget", "install", "-e", "--id", "Git.Git"]))
            .times(1)
            .returning(|_| Ok(CommandOutput::failure(-1978335212, "No package found")));

        assert_eq!(
            Winget.install(&runner, "Git.Git").await,
            ActionOutcome::failed("No package found")
        );
        assert!(!Winget.update(&runner, "Git.Git").await.success);
    }
}
