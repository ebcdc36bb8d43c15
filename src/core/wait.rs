//! Bounded predicate polling.
//!
//! The target UI gives us no events to subscribe to, so every readiness gate
//! in the crate (loader gone, button clickable) is a poll: evaluate a
//! predicate, sleep, repeat, give up at the deadline. Centralizing the loop
//! here keeps timing tuning out of the wizard and search logic.

use std::future::Future;
use std::time::{Duration, Instant};

/// Poll `pred` every `poll` until it returns `true` or `timeout` elapses.
///
/// Returns whether the predicate ever succeeded. A timeout is not an error —
/// callers treat `false` as "not ready" and move on.
pub async fn wait_until<F, Fut>(poll: Duration, timeout: Duration, mut pred: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = Instant::now();
    loop {
        if pred().await {
            return true;
        }
        if start.elapsed() >= timeout {
            return false;
        }
        tokio::time::sleep(poll).await;
    }
}

/// Sleep for a uniformly random duration in `[min_ms, max_ms]`.
///
/// Fixed-length pauses are a bot fingerprint; everything human-paced in the
/// crate jitters through this helper.
pub async fn jitter_sleep(min_ms: u64, max_ms: u64) {
    use rand::RngExt;
    let ms = if max_ms > min_ms {
        rand::rng().random_range(min_ms..=max_ms)
    } else {
        min_ms
    };
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
