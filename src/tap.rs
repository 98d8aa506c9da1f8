//! Tap-tempo estimation
//!
//! Each tap blends the newly measured interval into the running estimate
//! with a weight of 1/2. A tap arriving after the staleness window starts
//! a fresh measurement instead of blending with an old one.

use tracing::debug;

/// Silence after which the last tap no longer seeds the next interval.
pub const TAP_TIMEOUT_MS: u64 = 2000;

const INITIAL_ESTIMATE_MS: u32 = 1000;

/// Running tap interval estimator.
#[derive(Debug)]
pub struct TapTempo {
    last_tap_ms: Option<u64>,
    estimate_ms: u32,
    sent: bool,
}

impl Default for TapTempo {
    fn default() -> Self {
        Self {
            last_tap_ms: None,
            estimate_ms: INITIAL_ESTIMATE_MS,
            sent: false,
        }
    }
}

impl TapTempo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tap at `now_ms`. Updates the estimate as the mean of the
    /// previous estimate and the newly measured interval, and re-arms the
    /// display update.
    pub fn tap(&mut self, now_ms: u64) {
        if let Some(last) = self.last_tap_ms {
            let interval = (now_ms - last).min(u32::MAX as u64) as u32;
            self.estimate_ms = (self.estimate_ms + interval) / 2;
        }
        self.last_tap_ms = Some(now_ms);
        self.sent = false;
        debug!(estimate_ms = self.estimate_ms, "tap");
    }

    /// Poll for staleness and a pending display update.
    ///
    /// Clears the tap baseline once the timeout elapses; otherwise returns
    /// the estimate exactly once per tap, to be pushed to the display.
    pub fn tick(&mut self, now_ms: u64) -> Option<u32> {
        let last = self.last_tap_ms?;
        if now_ms.saturating_sub(last) > TAP_TIMEOUT_MS {
            self.last_tap_ms = None;
            return None;
        }
        if !self.sent {
            self.sent = true;
            return Some(self.estimate_ms);
        }
        None
    }

    pub fn estimate_ms(&self) -> u32 {
        self.estimate_ms
    }
}
