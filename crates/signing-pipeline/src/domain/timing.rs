//! # Duration Normalizer
//!
//! Stretches a fast success to a minimum wall-clock duration so a broadcast
//! is never reported faster than a user can perceive it.

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Run `action` now and, if it succeeds in less than `min`, hold the result
/// until `min` has elapsed since the call.
///
/// Failures are returned as soon as they happen. A slow success is not
/// delayed further.
pub async fn exec_and_wait_at_least<F, Fut, T, E>(min: Duration, action: F) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let started = Instant::now();
    let value = action().await?;

    let remaining = min.saturating_sub(started.elapsed());
    if !remaining.is_zero() {
        sleep(remaining).await;
    }

    Ok(value)
}
