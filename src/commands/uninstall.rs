use anyhow::Result;
use log::debug;
use serde_json::json;

use super::Report;
use crate::engine::Engine;
use crate::process::CommandRunner;
use crate::runtime::Runtime;

/// Uninstall packages, asking first unless `yes` is set.
#[tracing::instrument(skip(engine))]
pub async fn uninstall<R: Runtime, C: CommandRunner>(
    engine: &Engine<R, C>,
    names: &[String],
    yes: bool,
) -> Result<Report> {
    if !yes {
        let prompt = format!(
            "Uninstall {} package(s): {}?",
            names.len(),
            names.join(", ")
        );
        if !engine.runtime().confirm(&prompt)? {
            debug!("Uninstall cancelled");
            return Report::ok(json!({ "success": false, "message": "Uninstall cancelled" }));
        }
    }
    Report::from_results(&engine.uninstall(names).await)
}
