//! Debounce primitive for enqueue bursts.
//!
//! Rendering a list of data sources tends to request the status of every row
//! within a few milliseconds. The [`Debouncer`] folds such a burst into a
//! single trigger: every call to [`Debouncer::trigger`] pushes the deadline
//! to `now + window`, and [`Debouncer::fired`] completes once no new trigger
//! arrived for a full window.

use std::time::Duration;

use super::timer::DelayTimer;

/// Default debounce window (50ms).
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(50);

/// Trailing-edge debouncer over a [`DelayTimer`].
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    timer: DelayTimer,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            timer: DelayTimer::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Arm the debouncer, restarting the window if it is already armed.
    pub fn trigger(&mut self) {
        self.timer.schedule(self.window);
    }

    pub fn cancel(&mut self) {
        self.timer.cancel();
    }

    pub fn is_armed(&self) -> bool {
        self.timer.is_scheduled()
    }

    /// Completes once the window has passed without another trigger.
    ///
    /// Pending forever while disarmed; cancel safe.
    pub async fn fired(&mut self) {
        self.timer.elapsed().await;
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_WINDOW)
    }
}
