use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{Error, Result};

/// Exponential backoff with optional jitter and at most one scheduled retry.
///
/// The delay starts at `min` and grows on every failure by
/// `current * 2 * r`, where `r` is 1 without jitter and uniform in `[0, 1)`
/// with it, clamped to `max`.
pub struct Backoff {
    min: Duration,
    max: Duration,
    jitter: bool,
    current: Duration,
    fails: u32,
    retry: Option<JoinHandle<()>>,
}

impl Backoff {
    pub fn new(min: Duration, max: Duration, jitter: bool) -> Self {
        Self {
            min,
            max,
            jitter,
            current: min,
            fails: 0,
            retry: None,
        }
    }

    /// Register a failure and return the grown delay.
    pub fn fail(&mut self) -> Duration {
        self.fails += 1;
        let factor = if self.jitter { rand::random::<f64>() } else { 1.0 };
        let grown = self.current.as_secs_f64() * (1.0 + 2.0 * factor);
        self.current = Duration::from_secs_f64(grown).min(self.max);
        debug!("backoff failure #{}, delay now {:?}", self.fails, self.current);
        self.current
    }

    /// Register a failure and schedule `callback` to run once after the new
    /// delay. Scheduling while a retry is already outstanding is a programmer
    /// error and fails loudly instead of silently replacing it.
    pub fn fail_with<F>(&mut self, callback: F) -> Result<Duration>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.pending() {
            return Err(Error::RetryPending);
        }
        let delay = self.fail();
        self.retry = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        }));
        Ok(delay)
    }

    /// Cancel the pending retry and reset the delay to its minimum.
    pub fn succeed(&mut self) {
        self.cancel();
        self.fails = 0;
        self.current = self.min;
    }

    /// Cancel the pending retry without touching the delay or fail counter.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.retry.take() {
            handle.abort();
        }
    }

    pub fn pending(&self) -> bool {
        self.retry.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn fails(&self) -> u32 {
        self.fails
    }
}

impl Drop for Backoff {
    fn drop(&mut self) {
        self.cancel();
    }
}
