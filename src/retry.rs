use crate::error::Result;
use std::future::Future;
use tokio::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    /// Maximum number of attempts.
    pub steps: u32,
    /// Wait before the first retry.
    pub duration: Duration,
    /// Multiplier applied to the wait after every retry, anything below 1 or
    /// not finite counts as 1.
    pub factor: f64,
    /// Upper bound for a single wait.
    pub cap: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            steps: 5,
            duration: Duration::from_millis(10),
            factor: 1.0,
            cap: Duration::from_secs(30),
        }
    }
}

impl Backoff {
    fn next_wait(&self, wait: Duration) -> Duration {
        let factor = if self.factor.is_finite() && self.factor >= 1.0 {
            self.factor
        } else {
            1.0
        };

        Duration::try_from_secs_f64(wait.as_secs_f64() * factor)
            .unwrap_or(self.cap)
            .min(self.cap)
    }
}

/// Runs `attempt` until it succeeds, fails with something other than a
/// conflict, or `backoff.steps` attempts have been made.
pub async fn retry_on_conflict<T, F, Fut>(backoff: Backoff, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut wait = backoff.duration.min(backoff.cap);
    let mut tries = 0;

    loop {
        tries += 1;
        match attempt().await {
            Err(err) if err.is_conflict() && tries < backoff.steps.max(1) => {
                tracing::debug!(tries, ?wait, "conflict, retrying");
                tokio::time::sleep(wait).await;
                wait = backoff.next_wait(wait);
            }
            result => return result,
        }
    }
}
