//! Bounded reconnect loop.

use std::time::{Duration, Instant};

use gds_transport::CancelToken;
use tracing::{info, warn};

use crate::config::ReconnectPolicy;
use crate::device::GdsDevice;

/// Granularity of the abandonable inter-attempt sleep.
const SLEEP_SLICE: Duration = Duration::from_millis(25);

impl GdsDevice {
    /// Drive [`GdsDevice::open`] under the configured reconnect policy and
    /// the device's current abandon token (cancelled on detach).
    pub fn try_open(&self) -> bool {
        let policy = self.config().reconnect.clone();
        let abandon = self.abandon_token();
        self.try_open_with(&policy, &abandon)
    }

    /// Attempt to open, retrying up to `policy.retry_limit` additional times
    /// with `policy.retry_interval` between attempts.
    ///
    /// When `abandon` fires mid-loop the controller stops early and reports
    /// the last known connection state instead of forcing another attempt.
    pub fn try_open_with(&self, policy: &ReconnectPolicy, abandon: &CancelToken) -> bool {
        let total = policy.retry_limit.saturating_add(1);
        for attempt in 1..=total {
            if abandon.is_cancelled() {
                info!(attempt, "reconnect abandoned");
                return self.is_connected();
            }

            info!(attempt, total, "opening device");
            if self.open() {
                return true;
            }
            warn!(attempt, total, "open attempt failed");

            if attempt < total {
                sleep_unless_cancelled(policy.retry_interval, abandon);
            }
        }
        self.is_connected()
    }
}

fn sleep_unless_cancelled(interval: Duration, abandon: &CancelToken) {
    let deadline = Instant::now() + interval;
    loop {
        if abandon.is_cancelled() {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        std::thread::sleep((deadline - now).min(SLEEP_SLICE));
    }
}
