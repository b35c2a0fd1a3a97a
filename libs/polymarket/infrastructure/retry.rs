//! Generic retry-with-backoff decorator
//!
//! Shared by the Reconciler and `ExchangeAdapter`: exponential backoff with a
//! configurable base delay and factor, capped at a maximum attempt count.
//! Only retries when the caller's `is_transient` predicate says so; anything
//! else propagates on the first failure. Grounded in the same shape as
//! `StrategiesConfig`'s validated, logged config structs - a small decorator
//! type rather than a free function per call site, so call sites can log
//! which policy they're running under.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

/// Backoff policy: `max_retries` attempts total, starting at `base_delay` and
/// multiplying by `factor` after each failed attempt.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub factor: u32,
}

impl RetryPolicy {
    /// The policy named in the ExchangeAdapter port: initial 2s, factor 2,
    /// at most 3 attempts.
    pub const EXCHANGE_DEFAULT: RetryPolicy = RetryPolicy {
        max_retries: 3,
        base_delay: Duration::from_secs(2),
        factor: 2,
    };
}

/// Run `op` under `policy`, retrying while `is_transient(&err)` is true.
/// Returns the first non-transient error immediately, or the last error once
/// `max_retries` attempts are exhausted.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: RetryPolicy,
    is_transient: impl Fn(&E) -> bool,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = policy.base_delay;
    let mut last_err = None;

    for attempt in 1..=policy.max_retries {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                if !is_transient(&e) {
                    return Err(e);
                }
                warn!("[retry] attempt {}/{} failed: {}", attempt, policy.max_retries, e);
                last_err = Some(e);
                if attempt < policy.max_retries {
                    sleep(delay).await;
                    delay *= policy.factor;
                }
            }
        }
    }

    Err(last_err.expect("loop runs at least once"))
}
