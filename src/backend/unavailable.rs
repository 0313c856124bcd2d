use async_trait::async_trait;

use super::{ActionOutcome, Backend, Listing};
use crate::platform::BackendKind;
use crate::process::CommandRunner;

/// Stands in when no package manager was detected. Nothing is ever run.
pub struct Unavailable;

#[async_trait]
impl Backend for Unavailable {
    fn kind(&self) -> BackendKind {
        BackendKind::None
    }

    async fn list_installed(&self, _runner: &dyn CommandRunner) -> Listing {
        Listing::new()
    }

    async fn install(&self, _runner: &dyn CommandRunner, _name: &str) -> ActionOutcome {
        ActionOutcome::unavailable()
    }

    async fn update(&self, _runner: &dyn CommandRunner, _name: &str) -> ActionOutcome {
        ActionOutcome::unavailable()
    }

    async fn uninstall(&self, _runner: &dyn CommandRunner, _name: &str) -> ActionOutcome {
        ActionOutcome::unavailable()
    }
}
