//! Retry/wait parameters shared by `wait-url` and `wait-kube`.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_INTERVAL_SECS: u64 = 1;

/// Delay / interval / attempt-count controlling a bounded retry loop.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WaitParams {
    /// Seconds to wait before the first attempt.
    #[serde(default)]
    pub delay_secs: u64,
    /// Seconds between attempts. Defaults to 1s.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,
    /// Maximum number of attempts. Must be positive.
    pub attempts: u32,
}

impl Default for WaitParams {
    fn default() -> Self {
        Self {
            delay_secs: 0,
            interval_secs: None,
            attempts: 1,
        }
    }
}

impl WaitParams {
    /// Validate and fill in defaults. Idempotent.
    pub fn hydrate(&mut self) -> Result<()> {
        ensure!(self.attempts > 0, "wait attempts must be positive");
        if self.interval_secs.is_none() {
            self.interval_secs = Some(DEFAULT_INTERVAL_SECS);
        }
        Ok(())
    }

    /// Delay before the first attempt.
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    /// Interval between attempts, defaulting to 1s if never hydrated.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.unwrap_or(DEFAULT_INTERVAL_SECS))
    }

    /// The total maximum time this wait can run for: `delay + attempts * interval`.
    pub fn max_total(&self) -> Duration {
        self.delay() + self.interval() * self.attempts
    }
}
