//! Clock and identifier-generator dependencies.
//!
//! All time and identity sources are abstracted behind traits and injected
//! through [`Dependencies`](crate::dependencies::Dependencies), so tests can
//! drive timers with a [`TestClock`] and predict every generated id.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::effect::BoxFuture;

/// Clock trait - abstracts time operations for testability
///
/// # Examples
///
/// ```ignore
/// let clock = deps.get::<ClockKey>();
/// loop {
///     clock.sleep(Duration::from_secs(1)).await;
///     send.send(CounterAction::TimerTick).await;
/// }
/// ```
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;

    /// Suspend the calling task for `duration`
    fn sleep(&self, duration: Duration) -> BoxFuture<()>;
}

/// Wall clock backed by tokio timers
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Clock whose sleeps complete immediately, for previews
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateClock;

impl Clock for ImmediateClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, _duration: Duration) -> BoxFuture<()> {
        Box::pin(tokio::task::yield_now())
    }
}

#[derive(Debug, Default)]
struct Timeline {
    elapsed: Duration,
    next_sleeper: u64,
    sleepers: BTreeMap<(Duration, u64), oneshot::Sender<()>>,
}

/// Virtual clock that only moves when told to
///
/// Sleeps are registered when [`Clock::sleep`] is called (not when the
/// returned future is first polled), and complete only when
/// [`TestClock::advance`] moves virtual time past their deadline.
/// Dropping a sleep future withdraws it.
#[derive(Debug)]
pub struct TestClock {
    start: DateTime<Utc>,
    timeline: Mutex<Timeline>,
}

/// Scheduler yields performed before and between wake-ups
///
/// Gives woken tasks the chance to run up to their next sleep, so a periodic
/// loop re-arms before the clock decides whether its next deadline is due.
const SETTLE_YIELDS: usize = 32;

impl TestClock {
    /// Create a test clock starting at `start`
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            start,
            timeline: Mutex::new(Timeline::default()),
        }
    }

    /// Virtual time elapsed since creation
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.timeline().elapsed
    }

    /// Number of sleeps waiting for virtual time to pass
    #[must_use]
    pub fn pending_sleepers(&self) -> usize {
        let mut timeline = self.timeline();
        timeline.sleepers.retain(|_, waker| !waker.is_closed());
        timeline.sleepers.len()
    }

    /// Move virtual time forward by `by`, waking due sleepers in deadline order
    ///
    /// Between wake-ups the current task yields to the scheduler so that
    /// woken effects can run (and register their next sleep) before later
    /// deadlines are considered. Run effects on the same `current_thread`
    /// runtime as the test; on a multi-threaded runtime woken tasks may not
    /// have run by the time the next deadline is checked.
    pub async fn advance(&self, by: Duration) {
        settle().await;

        let target = self.timeline().elapsed + by;
        loop {
            let due = {
                let mut timeline = self.timeline();
                timeline.sleepers.retain(|_, waker| !waker.is_closed());
                let is_due = matches!(
                    timeline.sleepers.first_key_value(),
                    Some((&(deadline, _), _)) if deadline <= target
                );
                if is_due {
                    match timeline.sleepers.pop_first() {
                        Some(((deadline, _), waker)) => {
                            timeline.elapsed = timeline.elapsed.max(deadline);
                            Some(waker)
                        },
                        None => None,
                    }
                } else {
                    None
                }
            };

            match due {
                Some(waker) => {
                    // Receiver may be gone already; that's a withdrawn sleep.
                    let _ = waker.send(());
                    settle().await;
                },
                None => break,
            }
        }

        self.timeline().elapsed = target;
        settle().await;
    }

    /// Run every pending sleep to completion, however far in the future
    pub async fn run(&self) {
        loop {
            let next = {
                let mut timeline = self.timeline();
                timeline.sleepers.retain(|_, waker| !waker.is_closed());
                timeline
                    .sleepers
                    .first_key_value()
                    .map(|(&(deadline, _), _)| deadline.saturating_sub(timeline.elapsed))
            };
            match next {
                Some(step) => self.advance(step).await,
                None => break,
            }
        }
    }

    fn timeline(&self) -> std::sync::MutexGuard<'_, Timeline> {
        self.timeline.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }
}

async fn settle() {
    for _ in 0..SETTLE_YIELDS {
        tokio::task::yield_now().await;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        chrono::Duration::from_std(self.elapsed())
            .ok()
            .and_then(|elapsed| self.start.checked_add_signed(elapsed))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<()> {
        let (waker, wait) = oneshot::channel();
        {
            let mut timeline = self.timeline();
            let deadline = timeline.elapsed + duration;
            let order = timeline.next_sleeper;
            timeline.next_sleeper += 1;
            timeline.sleepers.insert((deadline, order), waker);
        }
        Box::pin(async move {
            // A dropped clock never wakes anyone; the sleep simply never completes.
            if wait.await.is_err() {
                std::future::pending::<()>().await;
            }
        })
    }
}

/// Generator of unique identifiers
pub trait UuidGenerator: Send + Sync {
    /// Produce the next identifier
    fn next(&self) -> Uuid;
}

/// Random (v4) identifiers
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomUuidGenerator;

impl UuidGenerator for RandomUuidGenerator {
    fn next(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Deterministic identifiers `00000000-0000-0000-0000-000000000000`, `…001`, …
#[derive(Debug, Default)]
pub struct IncrementingUuidGenerator {
    next: AtomicU64,
}

impl IncrementingUuidGenerator {
    /// Create a generator starting at zero
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(0),
        }
    }
}

impl UuidGenerator for IncrementingUuidGenerator {
    fn next(&self) -> Uuid {
        Uuid::from_u128(u128::from(self.next.fetch_add(1, Ordering::Relaxed)))
    }
}
