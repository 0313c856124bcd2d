//! Package catalog: the declared list of desired packages.
//!
//! One entry per line. `#` disables an entry and also separates the name from
//! its description; `##` starts a section header that is ignored entirely.
//!
//! ```text
//! ## Browsers
//! firefox          # web browser
//! #vlc             # media player (disabled)
//! github:foo/bar   # cloned from GitHub
//! ```

use anyhow::Result;
use log::debug;
use serde::Serialize;
use std::path::Path;

use crate::github::GITHUB_PREFIX;
use crate::runtime::Runtime;

const COMMENT_MARKER: char = '#';
const SECTION_MARKER: &str = "##";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageEntry {
    pub name: String,
    pub enabled: bool,
    pub description: String,
}

impl PackageEntry {
    /// The `owner/repo` part of a `github:` entry.
    pub fn github_repo(&self) -> Option<&str> {
        self.name.strip_prefix(GITHUB_PREFIX)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<PackageEntry>,
}

impl Catalog {
    pub fn parse(text: &str) -> Self {
        let entries = text.lines().filter_map(parse_line).collect();
        Self { entries }
    }

    /// Read and parse a catalog file. A missing file is an empty catalog.
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime + ?Sized>(runtime: &R, path: &Path) -> Result<Self> {
        if !runtime.exists(path) {
            debug!("Catalog {:?} does not exist, treating as empty", path);
            return Ok(Self::default());
        }
        let text = runtime.read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    /// Every entry in file order, enabled or not.
    pub fn entries(&self) -> &[PackageEntry] {
        &self.entries
    }

    /// Names of enabled entries in file order.
    pub fn enabled_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.enabled)
            .map(|e| e.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_line(line: &str) -> Option<PackageEntry> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(SECTION_MARKER) {
        return None;
    }

    let (enabled, rest) = match line.strip_prefix(COMMENT_MARKER) {
        Some(rest) => (false, rest.trim()),
        None => (true, line),
    };

    let (name, description) = match rest.split_once(COMMENT_MARKER) {
        Some((name, description)) => (name.trim(), description.trim()),
        None => (rest.trim(), ""),
    };

    if name.is_empty() {
        return None;
    }

    Some(PackageEntry {
        name: name.to_string(),
        enabled,
        description: description.to_string(),
    })
}
