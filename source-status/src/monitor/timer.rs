//! Cancel-and-reschedule delay timer.
//!
//! A [`DelayTimer`] stores at most one pending deadline. Scheduling again
//! replaces the deadline, cancelling drops it, and [`DelayTimer::elapsed`]
//! can sit in a `select!` loop: it is pending forever while nothing is
//! scheduled and is cancel safe.

use std::future;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Instant, Sleep, sleep_until};

/// A single re-armable timer slot.
#[derive(Debug, Default)]
pub struct DelayTimer {
    sleep: Option<Pin<Box<Sleep>>>,
}

impl DelayTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule the timer `delay` from now, replacing any pending deadline.
    pub fn schedule(&mut self, delay: Duration) {
        let deadline = Instant::now() + delay;
        if let Some(sleep) = self.sleep.as_mut() {
            sleep.as_mut().reset(deadline);
            return;
        }
        self.sleep = Some(Box::pin(sleep_until(deadline)));
    }

    /// Drop the pending deadline, if any.
    pub fn cancel(&mut self) {
        self.sleep = None;
    }

    pub fn is_scheduled(&self) -> bool {
        self.sleep.is_some()
    }

    /// Wait for the pending deadline, then clear it.
    pub async fn elapsed(&mut self) {
        match self.sleep.as_mut() {
            Some(sleep) => sleep.as_mut().await,
            None => future::pending::<()>().await,
        }
        self.sleep = None;
    }
}
