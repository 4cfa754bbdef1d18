//! Store wrapper that asserts every state change and every effect action.
//!
//! A [`TestStore`] runs the real reducer in a queued store: actions produced
//! by effects are held back until the test [`receive`](TestStore::receive)s
//! them, so each one is asserted and reduced in order. Time-based effects
//! are driven by a [`TestClock`](composable_core::environment::TestClock)
//! injected through the environment.
//!
//! Test stores need a `current_thread` runtime (the `#[tokio::test]`
//! default). Effects then only make progress when the test yields, so a
//! fixed number of yields is enough to let them run up to their next await.
//!
//! Assertion failures panic with a diff of expected and actual state.

#![allow(clippy::panic)] // Test assertions report failures by panicking
#![allow(clippy::module_name_repetitions)] // TestStoreConfig is the natural name

use crate::diff::diff_debug;
use composable_core::reducer::Reducer;
use composable_runtime::{Store, StoreConfig};
use std::collections::VecDeque;
use std::fmt::Debug;
use std::time::{Duration, Instant};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::mpsc;

/// How strictly a [`TestStore`] checks state and effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Exhaustivity {
    /// Every state change, received action and effect must be accounted for
    #[default]
    Exhaustive,
    /// Only what the test asserts is checked; the rest is skipped
    NonExhaustive,
}

/// Configuration for [`TestStore`]
#[derive(Debug, Clone)]
pub struct TestStoreConfig {
    /// How long `receive` waits for an effect to produce an action
    pub timeout: Duration,
    /// Initial exhaustivity
    pub exhaustivity: Exhaustivity,
}

impl TestStoreConfig {
    /// Set the receive timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the exhaustivity
    #[must_use]
    pub const fn with_exhaustivity(mut self, exhaustivity: Exhaustivity) -> Self {
        self.exhaustivity = exhaustivity;
        self
    }
}

impl Default for TestStoreConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(1),
            exhaustivity: Exhaustivity::Exhaustive,
        }
    }
}

/// Yields given to effect tasks before looking at what they produced
const SETTLE_YIELDS: usize = 16;

/// A store for tests
///
/// # Example
///
/// ```ignore
/// let mut store = TestStore::new(CounterState::default(), counter(), deps);
///
/// store.send(CounterAction::FactButtonTapped, |s| s.is_loading = true).await;
/// store
///     .receive_action(CounterAction::FactResponse("0 is a good number.".into()), |s| {
///         s.is_loading = false;
///         s.fact = Some("0 is a good number.".into());
///     })
///     .await;
/// store.finish().await;
/// ```
///
/// In exhaustive mode a test store that is dropped without
/// [`finish`](TestStore::finish) still fails if actions were left unreceived
/// or effects left running.
pub struct TestStore<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
    S: Clone + PartialEq + Debug + Send + Sync + 'static,
    A: Clone + Debug + Send + 'static,
    E: Send + Sync + 'static,
{
    store: Store<S, A, E, R>,
    received: mpsc::UnboundedReceiver<A>,
    pending: VecDeque<A>,
    config: TestStoreConfig,
    finished: bool,
}

impl<S, A, E, R> TestStore<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
    S: Clone + PartialEq + Debug + Send + Sync + 'static,
    A: Clone + Debug + Send + 'static,
    E: Send + Sync + 'static,
{
    /// Create an exhaustive test store
    ///
    /// # Panics
    ///
    /// See [`TestStore::with_config`].
    #[must_use]
    pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
        Self::with_config(initial_state, reducer, environment, TestStoreConfig::default())
    }

    /// Create a test store with custom configuration
    ///
    /// # Panics
    ///
    /// Panics when called on a multi-threaded runtime.
    #[must_use]
    pub fn with_config(initial_state: S, reducer: R, environment: E, config: TestStoreConfig) -> Self {
        let multi_thread =
            Handle::try_current().is_ok_and(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread);
        if multi_thread {
            panic!(
                "TestStore requires a current_thread runtime; \
                 use #[tokio::test] without flavor = \"multi_thread\""
            );
        }

        let (store, received) = Store::queued(initial_state, reducer, environment, StoreConfig::default());
        Self {
            store,
            received,
            pending: VecDeque::new(),
            config,
            finished: false,
        }
    }

    /// Change how strictly the rest of the test is checked
    pub fn set_exhaustivity(&mut self, exhaustivity: Exhaustivity) {
        self.config.exhaustivity = exhaustivity;
    }

    /// Current exhaustivity
    #[must_use]
    pub const fn exhaustivity(&self) -> Exhaustivity {
        self.config.exhaustivity
    }

    /// The environment reducers and effects run with
    #[must_use]
    pub fn environment(&self) -> &E {
        self.store.environment()
    }

    /// Clone of the actual current state
    pub async fn state(&self) -> S {
        self.store.snapshot().await
    }

    /// Send an action and assert the state change it causes
    ///
    /// `update` describes the expected change. Exhaustive stores apply it to
    /// the state before the action and require the result to equal the
    /// actual state. Non-exhaustive stores apply it to the actual state and
    /// require it to change nothing, so only the fields it sets are checked.
    ///
    /// # Panics
    ///
    /// Panics if the state does not match, or (exhaustive only) if actions
    /// produced by effects have not been received yet.
    pub async fn send<F>(&mut self, action: A, update: F)
    where
        F: FnOnce(&mut S),
    {
        self.collect_received().await;
        if !self.pending.is_empty() {
            match self.config.exhaustivity {
                Exhaustivity::Exhaustive => self.fail(format!(
                    "Must handle {} received action(s) before sending {action:?}:\n{}",
                    self.pending.len(),
                    self.describe_pending()
                )),
                Exhaustivity::NonExhaustive => self.reduce_pending().await,
            }
        }

        tracing::debug!(?action, "TestStore send");
        self.reduce_and_assert(action, update).await;
    }

    /// Receive the next action produced by an effect and assert its state change
    ///
    /// Waits up to the configured timeout for an action to arrive. The timeout
    /// is real time: virtual time never passes while waiting, so an effect
    /// sleeping on a test clock only delivers after the clock is advanced.
    /// Exhaustive stores require the next action to match `predicate`;
    /// non-exhaustive stores reduce and skip actions until one matches.
    ///
    /// # Panics
    ///
    /// Panics if no matching action arrives in time or the state does not match.
    pub async fn receive<P, F>(&mut self, predicate: P, update: F)
    where
        P: Fn(&A) -> bool,
        F: FnOnce(&mut S),
    {
        loop {
            let Some(action) = self.next_received().await else {
                self.fail(format!(
                    "Expected to receive an action, but none arrived within {:?}",
                    self.config.timeout
                ));
            };

            if predicate(&action) {
                tracing::debug!(?action, "TestStore receive");
                self.reduce_and_assert(action, update).await;
                return;
            }

            match self.config.exhaustivity {
                Exhaustivity::Exhaustive => self.fail(format!("Received unexpected action: {action:?}")),
                Exhaustivity::NonExhaustive => {
                    tracing::debug!(?action, "Skipping received action");
                    self.reduce_unasserted(action).await;
                },
            }
        }
    }

    /// Receive exactly `expected` and assert its state change
    ///
    /// # Panics
    ///
    /// See [`TestStore::receive`].
    pub async fn receive_action<F>(&mut self, expected: A, update: F)
    where
        A: PartialEq,
        F: FnOnce(&mut S),
    {
        self.receive(move |action| *action == expected, update).await;
    }

    /// Reduce every action received so far without asserting on it
    pub async fn skip_received_actions(&mut self) {
        self.collect_received().await;
        let skipped = self.pending.len();
        self.reduce_pending().await;
        tracing::debug!(skipped, "Skipped received actions");
    }

    /// Cancel every effect still running
    pub fn skip_in_flight_effects(&mut self) {
        let cancelled = self.store.cancel_all_effects();
        tracing::debug!(cancelled, "Skipped in-flight effects");
    }

    /// Assert on the current state without sending anything
    ///
    /// `update` is applied to a copy of the actual state and must not change it.
    ///
    /// # Panics
    ///
    /// Panics if `update` changes the state.
    pub async fn assert<F>(&mut self, update: F)
    where
        F: FnOnce(&mut S),
    {
        let actual = self.store.snapshot().await;
        let mut expected = actual.clone();
        update(&mut expected);
        if expected != actual {
            self.fail(format!(
                "State does not match expectation (- expected, + actual):\n{}",
                diff_debug(&expected, &actual)
            ));
        }
    }

    /// End the test
    ///
    /// Exhaustive stores wait (up to the timeout) for effects to finish and
    /// then require that no action is left unreceived and no effect is still
    /// running. Non-exhaustive stores reduce leftover actions and cancel
    /// leftover effects.
    ///
    /// # Panics
    ///
    /// Panics (exhaustive only) on unreceived actions or running effects.
    pub async fn finish(mut self) {
        self.finished = true;

        match self.config.exhaustivity {
            Exhaustivity::Exhaustive => {
                self.wait_for_effects().await;
                self.collect_received().await;

                if !self.pending.is_empty() {
                    self.store.cancel_all_effects();
                    self.fail(format!(
                        "Test finished with {} unreceived action(s):\n{}",
                        self.pending.len(),
                        self.describe_pending()
                    ));
                }

                let in_flight = self.store.in_flight_effects();
                if in_flight > 0 {
                    self.store.cancel_all_effects();
                    self.fail(format!(
                        "Test finished with {in_flight} effect(s) still running; \
                         cancel them or call skip_in_flight_effects()"
                    ));
                }
            },
            Exhaustivity::NonExhaustive => {
                self.skip_received_actions().await;
                self.skip_in_flight_effects();
            },
        }
    }

    async fn reduce_and_assert<F>(&mut self, action: A, update: F)
    where
        F: FnOnce(&mut S),
    {
        let before = self.store.snapshot().await;
        if let Err(error) = self.store.send(action.clone()).await {
            self.fail(format!("Store rejected {action:?}: {error}"));
        }
        let actual = self.store.snapshot().await;

        let mut expected = match self.config.exhaustivity {
            Exhaustivity::Exhaustive => before,
            Exhaustivity::NonExhaustive => actual.clone(),
        };
        update(&mut expected);

        if expected != actual {
            self.fail(format!(
                "State change after {action:?} does not match expectation (- expected, + actual):\n{}",
                diff_debug(&expected, &actual)
            ));
        }
    }

    async fn reduce_unasserted(&mut self, action: A) {
        if let Err(error) = self.store.send(action).await {
            tracing::warn!(%error, "Store rejected skipped action");
        }
    }

    async fn reduce_pending(&mut self) {
        while let Some(action) = self.pending.pop_front() {
            self.reduce_unasserted(action).await;
        }
    }

    async fn next_received(&mut self) -> Option<A> {
        if let Some(action) = self.pending.pop_front() {
            return Some(action);
        }
        tokio::time::timeout(self.config.timeout, self.received.recv())
            .await
            .ok()
            .flatten()
    }

    /// Give effects a chance to run, then move whatever they produced to `pending`
    async fn collect_received(&mut self) {
        for _ in 0..SETTLE_YIELDS {
            tokio::task::yield_now().await;
        }
        while let Ok(action) = self.received.try_recv() {
            self.pending.push_back(action);
        }
    }

    async fn wait_for_effects(&self) {
        let deadline = Instant::now() + self.config.timeout;
        while self.store.in_flight_effects() > 0 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    fn describe_pending(&self) -> String {
        self.pending
            .iter()
            .map(|action| format!("  {action:?}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn fail(&self, message: String) -> ! {
        panic!("{message}");
    }
}

impl<S, A, E, R> Drop for TestStore<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
    S: Clone + PartialEq + Debug + Send + Sync + 'static,
    A: Clone + Debug + Send + 'static,
    E: Send + Sync + 'static,
{
    fn drop(&mut self) {
        while let Ok(action) = self.received.try_recv() {
            self.pending.push_back(action);
        }
        let in_flight = self.store.in_flight_effects();
        self.store.cancel_all_effects();

        if self.finished
            || std::thread::panicking()
            || self.config.exhaustivity == Exhaustivity::NonExhaustive
        {
            return;
        }
        if !self.pending.is_empty() {
            panic!(
                "TestStore dropped with {} unreceived action(s):\n{}",
                self.pending.len(),
                self.describe_pending()
            );
        }
        if in_flight > 0 {
            panic!("TestStore dropped with {in_flight} effect(s) still running");
        }
    }
}
