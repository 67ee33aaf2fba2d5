//! Fixed-interval retry combinator.

use std::future::Future;
use std::time::Duration;

use tokio_retry::strategy::FixedInterval;
use tokio_retry::Retry;

/// Runs `operation` up to `1 + retries` times with a fixed delay between
/// attempts, returning the first success or the most recent error.
///
/// The same shape serves the attachment fetcher and the page-extractor
/// reachability probe; both want "try, brief pause, try again" rather than
/// exponential backoff.
pub async fn retry_fixed<T, E, F, Fut>(retries: usize, delay: Duration, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let strategy = FixedInterval::new(delay).take(retries);
    Retry::spawn(strategy, operation).await
}
