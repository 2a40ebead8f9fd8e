//! Bounded status polling for asynchronous jobs on the model provider's side.
//!
//! Every poll loop has three limits: a maximum number of status checks, an overall
//! deadline, and a delay between checks that is either fixed or doubles up to a cap.
//! Running out of either budget is reported as [`PollError::TimedOut`], which callers
//! keep distinct from the job itself failing.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::collaborator::CollaboratorError;

/// Stand-in deadline for timeouts too large to add to the current instant.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    Fixed,
    /// Doubles the delay after every check, never exceeding `max_interval`.
    Exponential { max_interval: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    pub timeout: Duration,
    pub backoff: Backoff,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 60,
            timeout: Duration::from_secs(120),
            backoff: Backoff::Fixed,
        }
    }
}

impl PollPolicy {
    fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.interval,
            Backoff::Exponential { max_interval } => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1).min(16));
                self.interval.saturating_mul(factor).min(max_interval)
            }
        }
    }
}

/// Outcome of a single status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState<T> {
    Pending,
    Ready(T),
    Failed(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PollError {
    #[error("gave up after {attempts} status checks")]
    TimedOut { attempts: u32 },
    #[error("job failed: {0}")]
    Failed(String),
}

impl From<PollError> for CollaboratorError {
    fn from(err: PollError) -> Self {
        match err {
            PollError::TimedOut { attempts } => CollaboratorError::TimedOut { attempts },
            PollError::Failed(reason) => CollaboratorError::Failed(reason),
        }
    }
}

/// Calls `check` until it reports a terminal state or the policy runs out.
///
/// The first check happens immediately. Errors returned by `check` itself are
/// treated as job failures.
pub async fn poll_until<T, F, Fut>(policy: &PollPolicy, mut check: F) -> Result<T, PollError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = anyhow::Result<PollState<T>>>,
{
    let now = Instant::now();
    let deadline = now
        .checked_add(policy.timeout)
        .unwrap_or_else(|| now + FAR_FUTURE);
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let remaining = deadline.saturating_duration_since(Instant::now());
        let state = match tokio::time::timeout(remaining, check(attempts)).await {
            Ok(result) => result.map_err(|e| PollError::Failed(e.to_string()))?,
            Err(_) => return Err(PollError::TimedOut { attempts }),
        };

        match state {
            PollState::Ready(value) => return Ok(value),
            PollState::Failed(reason) => return Err(PollError::Failed(reason)),
            PollState::Pending => {
                debug!(attempt = attempts, "job still pending");
            }
        }

        if attempts >= policy.max_attempts {
            return Err(PollError::TimedOut { attempts });
        }

        let delay = policy.delay_after(attempts);
        match Instant::now().checked_add(delay) {
            Some(wake) if wake < deadline => {}
            _ => return Err(PollError::TimedOut { attempts }),
        }
        sleep(delay).await;
    }
}
