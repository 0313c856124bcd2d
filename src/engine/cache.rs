use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, MutexGuard};

use super::PackageStatus;

/// One reconciliation result and when it was computed.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub taken_at: Instant,
    pub packages: Arc<[PackageStatus]>,
}

impl Snapshot {
    pub fn new(packages: Vec<PackageStatus>) -> Self {
        Self {
            taken_at: Instant::now(),
            packages: packages.into(),
        }
    }

    pub fn age(&self) -> Duration {
        self.taken_at.elapsed()
    }

    pub fn is_younger_than(&self, window: Duration) -> bool {
        self.age() < window
    }
}

/// Single-slot status cache, replaced wholesale on every refresh.
///
/// The slot lock is meant to be held across a refresh so that concurrent
/// callers wait for the running pass instead of starting their own.
#[derive(Debug, Default)]
pub struct StatusCache {
    slot: Mutex<Option<Snapshot>>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self) -> MutexGuard<'_, Option<Snapshot>> {
        self.slot.lock().await
    }

    #[cfg(test)]
    pub(crate) async fn snapshot(&self) -> Option<Snapshot> {
        self.slot.lock().await.clone()
    }
}
