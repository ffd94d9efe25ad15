use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;

use jobsparser_common::{JobsError, Result, Site};

/// Serializes provider traffic per site. Workers hitting the same site take
/// turns; different sites never wait on each other.
#[derive(Default)]
pub struct RateLimiter {
    sites: Mutex<HashMap<Site, Arc<AsyncMutex<()>>>>,
}

/// Held while a worker sleeps and calls a site. Dropping it lets the next
/// worker for that site proceed.
pub struct SitePermit {
    _guard: OwnedMutexGuard<()>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `site`, or until the run is cancelled.
    pub async fn acquire(&self, site: Site, cancel: &CancellationToken) -> Result<SitePermit> {
        let lock = {
            let mut sites = self.sites.lock().unwrap_or_else(|e| e.into_inner());
            sites.entry(site).or_default().clone()
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(JobsError::Cancelled),
            guard = lock.lock_owned() => Ok(SitePermit { _guard: guard }),
        }
    }
}

/// Sleep for `delay` unless `cancel` fires first.
pub async fn sleep_cancellable(delay: Duration, cancel: &CancellationToken) -> Result<()> {
    if delay.is_zero() {
        return if cancel.is_cancelled() {
            Err(JobsError::Cancelled)
        } else {
            Ok(())
        };
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(JobsError::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}
