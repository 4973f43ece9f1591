//! Background rollover of chart buckets.
//!
//! The scheduler wakes at every bucket boundary and asks its target to roll
//! over, so that a candle exists for every bucket even when no trade arrives.

use std::sync::Arc;
use std::time::Duration;

use candela_types::{ChartError, Result};
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::Clock;

/// Receiver of scheduled rollovers.
pub trait RolloverTarget: Send + Sync + 'static {
    /// Returns the next bucket boundary after `after`.
    ///
    /// # Errors
    ///
    /// Returns an error if no boundary is reachable.
    fn next_boundary(&self, after: DateTime<Utc>) -> Result<DateTime<Utc>>;

    /// Ensures a candle exists for the bucket following `at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the rollover could not be applied.
    fn roll(&self, at: DateTime<Utc>) -> Result<()>;
}

/// Lifecycle state of a rollover scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RolloverState {
    /// Waiting for the first boundary.
    Scheduled,
    /// Woken at a boundary, rolling the target over.
    Fired,
    /// Waiting for a later boundary.
    Rescheduled,
    /// Shut down. Terminal.
    Stopped,
}

impl RolloverState {
    /// Returns true once the scheduler has stopped.
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

/// A cancelable background task that rolls a target over at each boundary.
///
/// Exactly one task runs per scheduler. [`stop`](Self::stop) cancels the
/// pending wake-up and is safe to call any number of times.
#[derive(Debug)]
pub struct RolloverScheduler {
    shutdown: CancellationToken,
    state: Arc<Mutex<RolloverState>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RolloverScheduler {
    /// Spawns a scheduler on the current tokio runtime.
    ///
    /// The first wake-up is armed for `target.next_boundary(clock.now())`.
    /// Cancelling `shutdown` stops the scheduler.
    ///
    /// # Errors
    ///
    /// Returns the target's error if no first boundary is reachable, or
    /// [`ChartError::NoRuntime`] outside of a tokio runtime.
    pub fn spawn<T: RolloverTarget>(
        target: Arc<T>,
        clock: Arc<dyn Clock>,
        fallback: Duration,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let first = target.next_boundary(clock.now())?;
        let runtime = Handle::try_current().map_err(|_| ChartError::NoRuntime)?;

        let state = Arc::new(Mutex::new(RolloverState::Scheduled));
        let task = runtime.spawn(run(
            target,
            clock,
            first,
            fallback,
            shutdown.clone(),
            Arc::clone(&state),
        ));
        info!(first = %first, "rollover scheduler started");

        Ok(Self {
            shutdown,
            state,
            task: Mutex::new(Some(task)),
        })
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> RolloverState {
        *self.state.lock()
    }

    /// Stops the scheduler. Repeated calls are no-ops.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if state.is_stopped() {
            return;
        }
        *state = RolloverState::Stopped;
        self.shutdown.cancel();
        info!("rollover scheduler stopped");
    }

    /// Waits for the background task to exit.
    ///
    /// Returns immediately if the task has already been joined.
    pub async fn join(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                warn!(error = %err, "rollover task ended abnormally");
            }
        }
    }
}

impl Drop for RolloverScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run<T: RolloverTarget>(
    target: Arc<T>,
    clock: Arc<dyn Clock>,
    mut deadline: DateTime<Utc>,
    fallback: Duration,
    shutdown: CancellationToken,
    state: Arc<Mutex<RolloverState>>,
) {
    let fallback_delta = TimeDelta::from_std(fallback).unwrap_or(TimeDelta::hours(1));

    loop {
        let wait = (deadline - clock.now()).to_std().unwrap_or(Duration::ZERO);
        tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            () = tokio::time::sleep(wait) => {}
        }
        transition(&state, RolloverState::Fired);

        // An early wake must not roll the same boundary twice.
        let at = clock.now().max(deadline);
        if let Err(err) = target.roll(at) {
            debug!(error = %err, at = %at, "rollover skipped");
        }

        deadline = match target.next_boundary(at) {
            Ok(next) => next,
            Err(err) => {
                if let Some(retry) = at.checked_add_signed(fallback_delta) {
                    warn!(error = %err, retry_in = ?fallback, "no next bucket, retrying later");
                    retry
                } else {
                    // No instant is left to retry at.
                    warn!(error = %err, "no next bucket before the end of time, waiting for shutdown");
                    transition(&state, RolloverState::Rescheduled);
                    shutdown.cancelled().await;
                    break;
                }
            }
        };
        transition(&state, RolloverState::Rescheduled);
        debug!(next = %deadline, "rollover re-armed");
    }

    *state.lock() = RolloverState::Stopped;
}

fn transition(state: &Mutex<RolloverState>, next: RolloverState) {
    let mut state = state.lock();
    if !state.is_stopped() {
        *state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TokioClock;
    use chrono::TimeZone;

    /// Target with minute boundaries that runs out after `last`.
    #[derive(Debug)]
    struct MinuteTarget {
        last: DateTime<Utc>,
        rolls: Mutex<Vec<DateTime<Utc>>>,
    }

    impl MinuteTarget {
        fn new(last: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self {
                last,
                rolls: Mutex::new(Vec::new()),
            })
        }

        fn rolls(&self) -> Vec<DateTime<Utc>> {
            self.rolls.lock().clone()
        }
    }

    impl RolloverTarget for MinuteTarget {
        fn next_boundary(&self, after: DateTime<Utc>) -> Result<DateTime<Utc>> {
            let secs = after.timestamp();
            let next = DateTime::from_timestamp(secs - secs.rem_euclid(60) + 60, 0)
                .ok_or(ChartError::NoNextBucket { after })?;
            if next > self.last {
                return Err(ChartError::NoNextBucket { after });
            }
            Ok(next)
        }

        fn roll(&self, at: DateTime<Utc>) -> Result<()> {
            let whole_seconds = DateTime::from_timestamp(at.timestamp(), 0).unwrap_or(at);
            self.rolls.lock().push(whole_seconds);
            Ok(())
        }
    }

    fn origin() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 7, 27, 10, 0, 30).unwrap()
    }

    fn spawn(target: &Arc<MinuteTarget>, fallback: Duration) -> RolloverScheduler {
        let clock: Arc<dyn Clock> = Arc::new(TokioClock::starting_at(origin()));
        RolloverScheduler::spawn(Arc::clone(target), clock, fallback, CancellationToken::new())
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_at_each_boundary() {
        let target = MinuteTarget::new(origin() + TimeDelta::hours(1));
        let scheduler = spawn(&target, Duration::from_secs(3600));
        assert_eq!(scheduler.state(), RolloverState::Scheduled);

        tokio::time::sleep(Duration::from_secs(170)).await;

        let base = Utc.with_ymd_and_hms(2023, 7, 27, 10, 1, 0).unwrap();
        assert_eq!(
            target.rolls(),
            vec![base, base + TimeDelta::minutes(1), base + TimeDelta::minutes(2)]
        );
        assert_eq!(scheduler.state(), RolloverState::Rescheduled);
        scheduler.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_and_is_idempotent() {
        let target = MinuteTarget::new(origin() + TimeDelta::hours(1));
        let scheduler = spawn(&target, Duration::from_secs(3600));

        tokio::time::sleep(Duration::from_secs(45)).await;
        assert_eq!(target.rolls().len(), 1);

        scheduler.stop();
        scheduler.stop();
        scheduler.join().await;
        scheduler.join().await;
        assert_eq!(scheduler.state(), RolloverState::Stopped);

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(target.rolls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_falls_back_when_no_boundary() {
        // Only the first boundary (10:01) is reachable.
        let last = Utc.with_ymd_and_hms(2023, 7, 27, 10, 1, 0).unwrap();
        let target = MinuteTarget::new(last);
        let scheduler = spawn(&target, Duration::from_secs(300));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(target.rolls(), vec![last]);

        // Retries five minutes after the failed lookup.
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(target.rolls(), vec![last, last + TimeDelta::minutes(5)]);
        assert_eq!(scheduler.state(), RolloverState::Rescheduled);
        scheduler.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_at_end_of_time_keeps_running() {
        // 23:58:30 on the last representable day; only 23:59 is reachable.
        let origin = DateTime::<Utc>::MAX_UTC - TimeDelta::seconds(90);
        let target = MinuteTarget::new(DateTime::<Utc>::MAX_UTC);
        let clock: Arc<dyn Clock> = Arc::new(TokioClock::starting_at(origin));
        let scheduler = RolloverScheduler::spawn(
            Arc::clone(&target),
            clock,
            Duration::from_secs(3600),
            CancellationToken::new(),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_secs(600)).await;

        assert_eq!(target.rolls().len(), 1);
        assert_eq!(scheduler.state(), RolloverState::Rescheduled);
        scheduler.stop();
        scheduler.join().await;
        assert_eq!(scheduler.state(), RolloverState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_fails_without_first_boundary() {
        let target = MinuteTarget::new(origin() - TimeDelta::hours(1));
        let clock: Arc<dyn Clock> = Arc::new(TokioClock::starting_at(origin()));
        let result = RolloverScheduler::spawn(
            target,
            clock,
            Duration::from_secs(60),
            CancellationToken::new(),
        );
        assert!(matches!(result, Err(ChartError::NoNextBucket { .. })));
    }

    #[test]
    fn test_spawn_requires_runtime() {
        let target = MinuteTarget::new(origin() + TimeDelta::hours(1));
        let clock: Arc<dyn Clock> = Arc::new(TokioClock::starting_at(origin()));
        let result = RolloverScheduler::spawn(
            target,
            clock,
            Duration::from_secs(60),
            CancellationToken::new(),
        );
        assert!(matches!(result, Err(ChartError::NoRuntime)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_cancellation_stops_task() {
        let target = MinuteTarget::new(origin() + TimeDelta::hours(1));
        let clock: Arc<dyn Clock> = Arc::new(TokioClock::starting_at(origin()));
        let shutdown = CancellationToken::new();
        let scheduler = RolloverScheduler::spawn(
            Arc::clone(&target),
            clock,
            Duration::from_secs(60),
            shutdown.clone(),
        )
        .unwrap();

        shutdown.cancel();
        scheduler.join().await;
        assert_eq!(scheduler.state(), RolloverState::Stopped);
        assert!(target.rolls().is_empty());
    }
}
