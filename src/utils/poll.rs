//! Cooperative wait-with-deadline primitive.
//!
//! Every polling loop in the pipeline (tab URL checks, form readiness,
//! results tables, detail container) goes through [`poll_until`] so there is
//! exactly one implementation of interval/timeout bookkeeping.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Outcome of a [`poll_until`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// The probe produced a value before the deadline.
    Ready(T),
    /// The deadline passed without the probe producing a value.
    TimedOut,
}

impl<T> PollOutcome<T> {
    /// Converts the outcome into an `Option`, discarding the timeout marker.
    pub fn ready(self) -> Option<T> {
        match self {
            PollOutcome::Ready(value) => Some(value),
            PollOutcome::TimedOut => None,
        }
    }
}

/// Re-runs `probe` at a fixed interval until it yields `Some`, or the budget
/// elapses.
///
/// The probe runs immediately once before the first sleep, so a condition
/// that already holds resolves without waiting an interval. The budget is
/// checked before each re-run; a probe already in flight is not cancelled.
pub async fn poll_until<T, F, Fut>(interval: Duration, budget: Duration, mut probe: F) -> PollOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + budget;
    loop {
        if let Some(value) = probe().await {
            return PollOutcome::Ready(value);
        }
        if Instant::now() + interval > deadline {
            return PollOutcome::TimedOut;
        }
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn resolves_immediately_when_condition_holds() {
        let outcome = poll_until(Duration::from_millis(50), Duration::from_millis(10), || async {
            Some(42)
        })
        .await;
        assert_eq!(outcome, PollOutcome::Ready(42));
    }

    #[tokio::test]
    async fn times_out_when_condition_never_holds() {
        let calls = AtomicUsize::new(0);
        let outcome: PollOutcome<()> =
            poll_until(Duration::from_millis(10), Duration::from_millis(35), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { None }
            })
            .await;
        assert_eq!(outcome, PollOutcome::TimedOut);
        // Immediate probe plus at most three interval re-checks.
        assert!(calls.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn resolves_after_a_few_attempts() {
        let calls = AtomicUsize::new(0);
        let outcome = poll_until(Duration::from_millis(5), Duration::from_secs(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n >= 2 {
                    Some(n)
                } else {
                    None
                }
            }
        })
        .await;
        assert_eq!(outcome, PollOutcome::Ready(2));
    }
}
