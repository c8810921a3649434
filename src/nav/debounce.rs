//! Route-start debouncing
//!
//! A gesture or voice trigger can fire more than once in quick succession;
//! duplicate route-start triggers inside the window are suppressed. The
//! window covers the triggering action only, never the routing call itself.

use std::time::{Duration, Instant};

/// Suppresses duplicate route-start triggers within a short window
#[derive(Debug)]
pub struct StartDebounce {
    window: Duration,
    last_trigger: Option<Instant>,
}

impl StartDebounce {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_trigger: None,
        }
    }

    /// Record a trigger; returns `false` when it falls inside the
    /// suppression window of a previous one
    pub fn try_trigger(&mut self) -> bool {
        let now = Instant::now();

        if let Some(last) = self.last_trigger {
            if now.duration_since(last) < self.window {
                return false;
            }
        }

        self.last_trigger = Some(now);
        true
    }

    /// Clear the window, e.g. on session reset
    pub fn reset(&mut self) {
        self.last_trigger = None;
    }
}
