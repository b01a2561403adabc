//! Bounded fixed-period readiness polling.
//!
//! [`wait_until_ready`] is the single retry primitive in the pipeline:
//! every stage and the scenario runner express "wait for this remote
//! condition" through it, with the budget taken from a named
//! [`IntervalProfile`](crate::intervals::IntervalProfile). The remote
//! APIs are eventually consistent, so probes must be side-effect-free
//! and re-checkable.
//!
//! Polling uses a fixed sleep, not exponential backoff: a bounded
//! total wait matters more here than minimizing probe count.

use std::future::Future;

use tokio::time::Instant;
use tracing::debug;

use crate::error::{ProbeError, WaitError};
use crate::intervals::IntervalProfile;

/// Poll `probe` at the profile's period until it reports ready.
///
/// Returns on the first `Ok(true)`. A probe error is non-transient by
/// contract and is propagated immediately without further polling.
/// When the profile's timeout elapses first, returns
/// [`WaitError::Timeout`].
///
/// The probe is always invoked at least once, even with a timeout
/// shorter than one poll period.
///
/// # Errors
///
/// - [`WaitError::Probe`] when the probe reports a remote fault.
/// - [`WaitError::Timeout`] when readiness was never observed within
///   the profile's timeout.
pub async fn wait_until_ready<F, Fut>(
    profile: &IntervalProfile,
    mut probe: F,
) -> Result<(), WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, ProbeError>>,
{
    let started = Instant::now();
    let deadline = started + profile.timeout;
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        if probe().await? {
            debug!(
                profile = %profile.name,
                attempts,
                waited = ?started.elapsed(),
                "condition ready"
            );
            return Ok(());
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(WaitError::Timeout {
                profile: profile.name.clone(),
                timeout: profile.timeout,
            });
        }

        debug!(
            profile = %profile.name,
            attempts,
            poll_period = ?profile.poll_period,
            "condition not ready, polling again"
        );
        // Clamp the final sleep so the last probe lands on the
        // deadline rather than overshooting it.
        tokio::time::sleep(profile.poll_period.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;

    fn profile(timeout_secs: u64, poll_secs: u64) -> IntervalProfile {
        IntervalProfile {
            name: "wait-test".to_owned(),
            timeout: Duration::from_secs(timeout_secs),
            poll_period: Duration::from_secs(poll_secs),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_readiness_returns_without_sleeping() {
        let started = Instant::now();
        wait_until_ready(&profile(60, 5), || async { Ok(true) })
            .await
            .unwrap();
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn becomes_ready_within_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let probe_calls = Arc::clone(&calls);
        let started = Instant::now();

        wait_until_ready(&profile(60, 5), move || {
            let calls = Arc::clone(&probe_calls);
            async move { Ok(calls.fetch_add(1, Ordering::SeqCst) >= 3) }
        })
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // Elapsed <= timeout + poll_period (spec bound); here exactly
        // three sleeps.
        assert_eq!(started.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn never_ready_times_out_after_budget() {
        let started = Instant::now();
        let err = wait_until_ready(&profile(60, 7), || async { Ok(false) })
            .await
            .unwrap_err();

        match err {
            WaitError::Timeout { profile, timeout } => {
                assert_eq!(profile, "wait-test");
                assert_eq!(timeout, Duration::from_secs(60));
            }
            other => panic!("expected timeout, got {other}"),
        }
        // The final probe lands exactly on the deadline: elapsed time
        // is >= timeout and never more than timeout + one period.
        assert_eq!(started.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn probe_error_propagates_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let probe_calls = Arc::clone(&calls);

        let err = wait_until_ready(&profile(600, 5), move || {
            let calls = Arc::clone(&probe_calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ProbeError::new("ingress", "install rejected"))
            }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, WaitError::Probe(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1, "probe must not be retried");
    }

    #[tokio::test(start_paused = true)]
    async fn tiny_timeout_still_probes_at_start_and_deadline() {
        let calls = Arc::new(AtomicU32::new(0));
        let probe_calls = Arc::clone(&calls);

        let profile = IntervalProfile {
            name: "wait-tiny".to_owned(),
            timeout: Duration::from_millis(1),
            poll_period: Duration::from_secs(5),
        };
        let err = wait_until_ready(&profile, move || {
            let calls = Arc::clone(&probe_calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(false)
            }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, WaitError::Timeout { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
