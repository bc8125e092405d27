use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Outcome of a bounded retry loop.
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt hit the retryable error class.
    Exhausted { attempts: u32, last: E },
    /// A non-retryable error: surfaced immediately, attempts left unused.
    Fatal(E),
}

/// Run `op` up to `max_attempts` times, sleeping `delay` between attempts,
/// retrying only when `is_retryable` classifies the error as transient
/// lock contention. Any other error fails immediately.
///
/// Kept generic over the error type so the policy is testable without a
/// live database.
pub async fn retry_locked<T, E, F, Fut, P>(
    max_attempts: u32,
    delay: Duration,
    is_retryable: P,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut attempts = 0u32;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if is_retryable(&e) => {
                attempts += 1;
                if attempts >= max_attempts {
                    return Err(RetryError::Exhausted { attempts, last: e });
                }
                debug!(attempt = attempts, error = %e, "retrying after lock contention");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(RetryError::Fatal(e)),
        }
    }
}
