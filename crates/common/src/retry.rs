use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};

use rand::Rng;

/// Bounded retry around calls to an external store.
///
/// A call is attempted at most `max_attempts` times, and no retry is
/// scheduled whose sleep would push the total time past `max_elapsed`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub max_elapsed: Duration,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub jitter_fraction: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            max_elapsed: Duration::from_secs(15),
            initial_delay: Duration::from_millis(500),
            backoff_factor: 2.0,
            jitter_fraction: 0.0,
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Saturates at `max_elapsed` when the product does not fit a `Duration`.
    fn next_delay(&self, current: Duration) -> Duration {
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff_factor.max(1.0))
            .unwrap_or(self.max_elapsed)
    }

    fn jittered(&self, base: Duration) -> Duration {
        apply_jitter(base, self.jitter_fraction)
    }
}

pub fn apply_jitter(base: Duration, jitter_fraction: f64) -> Duration {
    if !(jitter_fraction > 0.0) {
        return base;
    }
    let jitter_max = base.as_secs_f64() * jitter_fraction.min(1.0);
    let offset = rand::thread_rng().gen_range(0.0..=jitter_max);
    Duration::try_from_secs_f64(base.as_secs_f64() + offset).unwrap_or(base)
}

pub async fn retry_async<F, Fut, T, E>(policy: &RetryPolicy, op: &str, f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    retry_async_if(policy, op, f, |_| true).await
}

/// Like [`retry_async`], but errors for which `should_retry` returns false
/// are returned immediately.
pub async fn retry_async_if<F, Fut, T, E, P>(
    policy: &RetryPolicy,
    op: &str,
    mut f: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    P: Fn(&E) -> bool,
{
    let started = Instant::now();
    let mut delay = policy.initial_delay;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                let wait = policy.jittered(delay);
                let exhausted = attempt >= policy.max_attempts
                    || started.elapsed() + wait > policy.max_elapsed;
                if exhausted || !should_retry(&e) {
                    if attempt > 1 {
                        tracing::error!(op, attempt, error = %e, "giving up after retries");
                    }
                    return Err(e);
                }
                tracing::warn!(
                    op,
                    attempt,
                    max_attempts = policy.max_attempts,
                    wait_ms = wait.as_millis() as u64,
                    error = %e,
                    "store call failed, retrying"
                );
                tokio::time::sleep(wait).await;
                delay = policy.next_delay(delay);
            }
        }
    }
}
