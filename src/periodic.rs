//! Periodic background tasks.
//!
//! A task runs once after an initial jitter, then on every interval tick
//! until its cancellation signal fires.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::lifecycle::CancellationSignal;
use crate::observability::metrics::record_periodic_run;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Spawn `task` on the runtime and return immediately.
///
/// The jitter wait is cancellable; a run in progress is not interrupted.
pub fn spawn<S, F>(signal: S, interval: Duration, jitter: Duration, mut task: F) -> JoinHandle<()>
where
    S: CancellationSignal + 'static,
    F: FnMut() + Send + 'static,
{
    let interval = if interval < MIN_INTERVAL {
        tracing::warn!(?interval, "Periodic interval too small, clamping to 1ms");
        MIN_INTERVAL
    } else {
        interval
    };

    tokio::spawn(async move {
        let mut signal = signal;
        let stopped = signal.stopped();
        tokio::pin!(stopped);

        tokio::select! {
            biased;
            _ = &mut stopped => return,
            _ = time::sleep(jitter) => {}
        }

        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = &mut stopped => {
                    tracing::debug!("Periodic task stopped");
                    break;
                }
                _ = ticker.tick() => {
                    task();
                    record_periodic_run();
                }
            }
        }
    })
}

/// A uniformly random duration in `[0, max]`.
pub fn random_jitter(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    let nanos = u64::try_from(max.as_nanos()).unwrap_or(u64::MAX);
    Duration::from_nanos(fastrand::u64(0..=nanos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn counter() -> (Arc<AtomicUsize>, impl FnMut() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        (count, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn runs_immediately_without_jitter() {
        let token = CancellationToken::new();
        let (count, task) = counter();

        let handle = spawn(token.clone(), Duration::from_secs(3600), Duration::ZERO, task);
        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn runs_on_every_interval() {
        let token = CancellationToken::new();
        let (count, task) = counter();

        let handle = spawn(token.clone(), Duration::from_millis(50), Duration::ZERO, task);
        time::sleep(Duration::from_millis(225)).await;
        // t = 0, 50, 100, 150, 200
        assert_eq!(count.load(Ordering::SeqCst), 5);

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_signalled() {
        let token = CancellationToken::new();
        let (count, task) = counter();

        let handle = spawn(token.clone(), Duration::from_millis(50), Duration::ZERO, task);
        time::sleep(Duration::from_millis(110)).await;
        token.cancel();
        handle.await.unwrap();

        let at_cancel = count.load(Ordering::SeqCst);
        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), at_cancel);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_jitter_before_first_run() {
        let token = CancellationToken::new();
        let (count, task) = counter();

        let handle = spawn(token.clone(), Duration::from_secs(3600), Duration::from_millis(100), task);
        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_millis(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_during_jitter_never_runs() {
        let token = CancellationToken::new();
        let (count, task) = counter();

        let handle = spawn(token.clone(), Duration::from_millis(10), Duration::from_secs(60), task);
        time::sleep(Duration::from_millis(5)).await;
        token.cancel();
        handle.await.unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_is_clamped() {
        let token = CancellationToken::new();
        let (count, task) = counter();

        let handle = spawn(token.clone(), Duration::ZERO, Duration::ZERO, task);
        time::sleep(Duration::from_millis(5)).await;
        token.cancel();
        handle.await.unwrap();

        assert!(count.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn random_jitter_stays_in_range() {
        assert_eq!(random_jitter(Duration::ZERO), Duration::ZERO);

        let max = Duration::from_millis(250);
        for _ in 0..100 {
            assert!(random_jitter(max) <= max);
        }
    }
}
