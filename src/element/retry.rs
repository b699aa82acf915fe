//! Bounded retry loop
//!
//! Every "wait until interactable" loop of a test element runs through
//! [`RetryPolicy::run`]: an operation is attempted at most `max_try` times,
//! transient failures are absorbed with a delay between attempts, and an
//! exhausted budget is reported after a cool-down with the last transient
//! message and the elapsed time.

use std::future::Future;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::RetryTiming;
use crate::report::{ActionStatus, StatusCode};
use crate::Error;

/// Delay between two attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay after every failure
    Fixed(Duration),
    /// `step * tries remaining`, counted down from the budget
    Progressive(Duration),
}

impl Backoff {
    /// Delay after the given number of failed attempts (1-based) out of `max_try`
    pub fn delay(&self, failures: u32, max_try: u32) -> Duration {
        match self {
            Backoff::Fixed(delay) => *delay,
            Backoff::Progressive(step) => {
                *step * (max_try.saturating_sub(failures.max(1)) + 1)
            }
        }
    }
}

/// Budget and timing of a retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_try: u32,
    pub backoff: Backoff,
    pub cooldown: Duration,
}

/// Result of a retry loop
#[derive(Debug)]
pub enum RetryOutcome<T> {
    /// The operation succeeded after `retries` transient failures
    Success { value: T, retries: u32 },
    /// Every attempt failed with a transient error
    Exhausted {
        message: String,
        elapsed: Duration,
        attempts: u32,
    },
    /// A non transient error stopped the loop
    Failed(Error),
}

impl RetryPolicy {
    /// Fixed delay policy of the "not interactable" waits
    pub fn interactable(timing: &RetryTiming, max_try: u32) -> Self {
        Self {
            max_try,
            backoff: Backoff::Fixed(timing.interactable_delay),
            cooldown: timing.cooldown,
        }
    }

    /// Progressive policy of click retries
    pub fn progressive(timing: &RetryTiming, max_try: u32) -> Self {
        Self {
            max_try,
            backoff: Backoff::Progressive(timing.progressive_step),
            cooldown: timing.cooldown,
        }
    }

    /// Run `op` until it succeeds, fails terminally or the budget is spent
    pub async fn run<T, F, Fut>(&self, mut op: F) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let start = Instant::now();
        let mut failures = 0;
        let mut last_message = String::new();

        while failures < self.max_try {
            match op().await {
                Ok(value) => {
                    return RetryOutcome::Success {
                        value,
                        retries: failures,
                    }
                }
                Err(e) if e.is_transient() => {
                    failures += 1;
                    last_message = e.to_string();
                    debug!(
                        remaining = self.max_try - failures,
                        "Element is not interactable, wait before try action again"
                    );
                    tokio::time::sleep(self.backoff.delay(failures, self.max_try)).await;
                }
                Err(e) => return RetryOutcome::Failed(e),
            }
        }

        tokio::time::sleep(self.cooldown).await;

        RetryOutcome::Exhausted {
            message: last_message,
            elapsed: start.elapsed(),
            attempts: failures,
        }
    }
}

impl<T> RetryOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, RetryOutcome::Success { .. })
    }

    /// Report failures into `status`, returning the value on success
    pub fn apply_to(self, status: &mut ActionStatus) -> Option<T> {
        match self {
            RetryOutcome::Success { value, .. } => Some(value),
            RetryOutcome::Exhausted {
                message, elapsed, ..
            } => {
                status.set_error(StatusCode::ObjectNotInteractable, message);
                status.set_elapsed(elapsed);
                None
            }
            RetryOutcome::Failed(e) => {
                status.set_error(StatusCode::from(&e), e.to_string());
                None
            }
        }
    }
}
