//! Fixed-delay retry for flaky external commands

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// How often to try and how long to wait in between
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first; zero is treated as one
    pub max_attempts: usize,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// A single attempt
    pub fn once() -> Self {
        Self::fixed(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_millis(500))
    }
}

/// Run `operation` until it succeeds or `policy` runs out, returning the last error
///
/// ```rust
/// use clamsweep::core::retry::{retry_async, RetryPolicy};
/// use std::time::Duration;
///
/// # async fn example() -> Result<&'static str, String> {
/// let policy = RetryPolicy::fixed(2, Duration::from_secs(2));
/// retry_async("signature database update", policy, || async {
///     Ok::<_, String>("updated")
/// })
/// .await
/// # }
/// ```
pub async fn retry_async<F, T, E, Fut>(
    operation_name: &str,
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = policy.max_attempts.max(1);

    for attempt in 1..attempts {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                log::debug!(
                    "{} failed (attempt {}/{}), retrying in {:?}: {}",
                    operation_name,
                    attempt,
                    attempts,
                    policy.delay,
                    error
                );
                sleep(policy.delay).await;
            }
        }
    }
    operation().await
}
