//! Bounded polling with a fixed interval.

use std::future::Future;
use std::time::Duration;

/// Result of a bounded poll that did not abort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Polled<T> {
    /// The condition was met on the given attempt (1-based).
    Ready { value: T, attempt: u32 },
    /// Every attempt came back pending.
    Exhausted { attempts: u32 },
}

/// Runs `action` up to `max_attempts` times, sleeping `interval` between attempts.
///
/// `action` receives the 1-based attempt number and returns `Ok(Some(_))` when
/// done, `Ok(None)` to keep polling, or `Err(_)` to stop immediately.
///
/// # Errors
/// Returns the first error produced by `action`.
pub async fn poll_until<T, E, F, Fut>(
    max_attempts: u32,
    interval: Duration,
    mut action: F,
) -> Result<Polled<T>, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    for attempt in 1..=max_attempts {
        if let Some(value) = action(attempt).await? {
            return Ok(Polled::Ready { value, attempt });
        }
        if attempt < max_attempts && !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }
    }
    Ok(Polled::Exhausted {
        attempts: max_attempts,
    })
}
