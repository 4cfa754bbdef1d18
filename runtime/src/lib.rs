//! # Composable Runtime
//!
//! Runtime for composable features: the [`Store`] owns a feature's state,
//! reduces actions one at a time and executes the effects reducers return.
//!
//! ## Core Components
//!
//! - **Store**: Owns state, serializes dispatch, executes effects
//! - **Effect Executor**: Spawns effect tasks and feeds their actions back
//! - **Cancellation**: Running effect tasks indexed by cancellation id
//!
//! ## Example
//!
//! ```
//! use composable_core::{Effect, Reduce, SmallVec};
//! use composable_runtime::Store;
//!
//! # tokio_test::block_on(async {
//! let reducer = Reduce::new(|count: &mut i64, delta: i64, _env: &()| {
//!     *count += delta;
//!     SmallVec::<[Effect<i64>; 4]>::new()
//! });
//! let store = Store::new(0_i64, reducer, ());
//!
//! store.send(5).await?;
//! store.send(-2).await?;
//! assert_eq!(store.state(|count| *count).await, 3);
//! # Ok::<(), composable_runtime::error::StoreError>(())
//! # });
//! ```

use composable_core::{Effect, reducer::Reducer};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, mpsc, watch};

mod cancellation;

/// Metric names emitted by the runtime
pub mod metrics;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// This error is returned when `send()` is called after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        ///
        /// Some effects were still running when the timeout elapsed.
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for a matching action
        ///
        /// Returned by `send_and_wait_for` when the timeout expires before
        /// a matching action is received.
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

/// Configuration for Store instances
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use composable_runtime::StoreConfig;
///
/// let config = StoreConfig::default()
///     .with_broadcast_capacity(256)
///     .with_shutdown_timeout(Duration::from_secs(5));
/// assert_eq!(config.broadcast_capacity, 256);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Number of effect-produced actions buffered for slow observers
    pub broadcast_capacity: usize,
    /// Default timeout for graceful shutdown
    pub default_shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Create a new configuration with custom values
    #[must_use]
    pub const fn new(broadcast_capacity: usize, default_shutdown_timeout: Duration) -> Self {
        Self {
            broadcast_capacity,
            default_shutdown_timeout,
        }
    }

    /// Set the action broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the default shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.default_shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 16,
            default_shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`]. Completes once every effect task started
/// directly by that action has finished or been cancelled. Actions those
/// effects feed back get handles of their own, which are not tracked here.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(Action::Start).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    /// Create a handle and the tracking context effect tasks report to
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };
        let tracking = EffectTracking {
            counter,
            notifier: Arc::new(tx),
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    ///
    /// Useful for initialization in loops where you need a `last_handle`.
    #[must_use]
    pub fn completed() -> Self {
        let (_tx, rx) = watch::channel(());

        Self {
            effects: Arc::new(AtomicUsize::new(0)),
            completion: rx,
        }
    }

    /// Whether every tracked effect has finished
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.effects.load(Ordering::SeqCst) == 0
    }

    /// Wait for all effects to complete
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                break;
            }
        }
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the timeout expires before all
    /// effects complete.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: effect tracking context passed through effect execution
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: Arc<watch::Sender<()>>,
}

impl EffectTracking {
    /// Increment the effect counter (effect started)
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrement the effect counter (effect completed)
    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notifier.send_replace(());
        }
    }
}

/// Internal: destination for actions produced by effects
///
/// - Auto: reduce them right away (production)
/// - Queued: hand them to a test harness, which reduces them on demand
enum FeedbackDestination<A> {
    Auto,
    Queued(mpsc::UnboundedSender<A>),
}

impl<A> Clone for FeedbackDestination<A> {
    fn clone(&self) -> Self {
        match self {
            Self::Auto => Self::Auto,
            Self::Queued(queue) => Self::Queued(queue.clone()),
        }
    }
}

/// Internal: RAII guard that decrements effect counter on drop
///
/// Runs whether the effect finished, panicked or was aborted.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
        metrics::gauge!(metrics::EFFECTS_IN_FLIGHT).decrement(1.0);
    }
}

/// Store runtime for coordinating reducer execution and effect handling.
pub mod store {
    use super::cancellation::TaskRegistry;
    use super::{
        Arc, AtomicBool, AtomicCounterGuard, AtomicUsize, DecrementGuard, Duration, Effect,
        EffectHandle, EffectTracking, FeedbackDestination, Ordering, Reducer, RwLock, StoreConfig,
        StoreError, metrics, mpsc, watch,
    };
    use composable_core::{ActionSender, CancelId};
    use std::future::Future;
    use tokio::sync::broadcast;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock`; written only by the reducer)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution, feedback and cancellation
    ///
    /// Actions are reduced strictly one at a time, whether they come from
    /// callers or from effects. Effects returned for an action are started
    /// before the next action is reduced, so an `Effect::Cancel` issued by a
    /// later action always sees the tasks started by earlier ones.
    ///
    /// Cloning a store is cheap and yields another handle to the same runtime.
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: Arc<R>,
        environment: Arc<E>,
        config: StoreConfig,
        registry: Arc<TaskRegistry>,
        feedback: FeedbackDestination<A>,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        /// Every action produced by effects, for observers
        action_broadcast: broadcast::Sender<A>,
        /// Latest state, published after each reduction while someone observes
        observers: Arc<watch::Sender<S>>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        S: Clone + Send + Sync + 'static,
        A: Clone + Send + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_config(initial_state, reducer, environment, StoreConfig::default())
        }

        /// Create a new store with custom configuration
        #[must_use]
        pub fn with_config(initial_state: S, reducer: R, environment: E, config: StoreConfig) -> Self {
            Self::build(initial_state, reducer, environment, config, FeedbackDestination::Auto)
        }

        /// Create a store whose effect-produced actions are queued instead of reduced
        ///
        /// Every action an effect sends is pushed to the returned receiver and
        /// left for the caller to reduce with [`Store::send`]. This is how test
        /// harnesses observe and assert on effect output one action at a time.
        #[must_use]
        pub fn queued(
            initial_state: S,
            reducer: R,
            environment: E,
            config: StoreConfig,
        ) -> (Self, mpsc::UnboundedReceiver<A>) {
            let (tx, rx) = mpsc::unbounded_channel();
            let store = Self::build(initial_state, reducer, environment, config, FeedbackDestination::Queued(tx));
            (store, rx)
        }

        fn build(
            initial_state: S,
            reducer: R,
            environment: E,
            config: StoreConfig,
            feedback: FeedbackDestination<A>,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(config.broadcast_capacity.max(1));
            let (observers, _) = watch::channel(initial_state.clone());

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer: Arc::new(reducer),
                environment: Arc::new(environment),
                config,
                registry: Arc::new(TaskRegistry::default()),
                feedback,
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                action_broadcast,
                observers: Arc::new(observers),
            }
        }

        /// The store's environment
        #[must_use]
        pub fn environment(&self) -> &E {
            &self.environment
        }

        /// Number of effect tasks neither finished nor cancelled
        ///
        /// A cancelled task stops counting immediately, even if the runtime has
        /// not dropped it yet.
        #[must_use]
        pub fn in_flight_effects(&self) -> usize {
            self.registry.len()
        }

        /// Cancel every running effect task
        ///
        /// Returns how many tasks were cancelled.
        pub fn cancel_all_effects(&self) -> usize {
            let cancelled = self.registry.cancel_all();
            if cancelled > 0 {
                tracing::debug!(cancelled, "Cancelled all in-flight effects");
                metrics::counter!(metrics::EFFECTS_CANCELLED).increment(cancelled as u64);
            }
            cancelled
        }

        /// Initiate graceful shutdown of the store
        ///
        /// This method:
        /// 1. Sets the shutdown flag (rejecting new actions)
        /// 2. Waits for pending effects to complete (with timeout)
        /// 3. Returns when all effects finish or timeout expires
        ///
        /// Effects still running at the timeout are left running; call
        /// [`Store::cancel_all_effects`] to stop them.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before all
        /// pending effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            metrics::counter!(metrics::SHUTDOWN_INITIATED).increment(1);

            self.shutdown.store(true, Ordering::Release);

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(10);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    metrics::counter!(metrics::SHUTDOWN_COMPLETED).increment(1);
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(pending_effects = pending, "Shutdown timeout: {pending} effects still running");
                    metrics::counter!(metrics::SHUTDOWN_TIMEOUT).increment(1);
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tracing::debug!(
                    pending_effects = pending,
                    elapsed_ms = start.elapsed().as_millis(),
                    "Waiting for effects to complete"
                );

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Graceful shutdown using the configured default timeout
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if effects are still running
        /// when the timeout expires.
        pub async fn shutdown_gracefully(&self) -> Result<(), StoreError> {
            self.shutdown(self.config.default_shutdown_timeout).await
        }

        /// Send an action to the store
        ///
        /// 1. Acquires write lock on state
        /// 2. Calls reducer with (state, action, environment)
        /// 3. Starts the returned effects
        /// 4. Effects may produce more actions (feedback loop)
        ///
        /// `send()` returns once the effects have been started, not completed.
        /// Use the returned [`EffectHandle`] to wait for them.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        ///
        /// # Panics
        ///
        /// If the reducer panics, the panic propagates to the caller.
        /// Reducers should be pure functions that do not panic.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            self.send_internal(action, None).await
        }

        /// Send an action and wait for a matching action produced by effects
        ///
        /// Subscribes to the action broadcast before sending, so a response
        /// produced immediately is not missed.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: Timeout expired before matching action received
        /// - [`StoreError::ChannelClosed`]: Action broadcast channel closed
        /// - [`StoreError::ShutdownInProgress`]: Store is shutting down
        pub async fn send_and_wait_for<F>(&self, action: A, predicate: F, timeout: Duration) -> Result<A, StoreError>
        where
            F: Fn(&A) -> bool,
        {
            let mut rx = self.action_broadcast.subscribe();

            self.send(action).await?;

            tokio::time::timeout(timeout, async {
                loop {
                    match rx.recv().await {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Action observer lagged, {skipped} actions skipped");
                        },
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        },
                    }
                }
            })
            .await
            .map_err(|_| StoreError::Timeout)?
        }

        /// Subscribe to every action produced by effects
        ///
        /// Actions sent by callers through [`Store::send`] are not broadcast.
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let count = store.state(|s| s.count).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&state)
        }

        /// Clone of the current state
        pub async fn snapshot(&self) -> S {
            S::clone(&*self.state.read().await)
        }

        /// Observe state changes
        ///
        /// The receiver starts at the current state and is updated after
        /// every reduction.
        pub async fn observe(&self) -> watch::Receiver<S> {
            let state = self.state.read().await;
            self.observers.send_replace(S::clone(&state));
            self.observers.subscribe()
        }

        /// A view of this store restricted to one child feature
        ///
        /// The scoped store reads the child's slice of state and embeds
        /// child actions into parent actions before sending them.
        #[must_use]
        pub fn scope<ChildState, ChildAction>(
            &self,
            state: fn(&S) -> &ChildState,
            embed: fn(ChildAction) -> A,
        ) -> ScopedStore<S, A, E, R, ChildState, ChildAction> {
            ScopedStore {
                store: self.clone(),
                state,
                embed,
            }
        }

        /// Reduce one action; `origin` is the cancellation flag of the effect
        /// that produced it, if any.
        async fn send_internal(&self, action: A, origin: Option<&AtomicBool>) -> Result<EffectHandle, StoreError> {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!(metrics::SHUTDOWN_REJECTED_ACTIONS).increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            let (handle, tracking) = EffectHandle::new();

            let mut state = self.state.write().await;
            tracing::trace!("Acquired write lock on state");

            if let Some(cancelled) = origin {
                // The effect may have been cancelled while this action waited for the lock.
                if cancelled.load(Ordering::Acquire) {
                    tracing::trace!("Dropping action from cancelled effect");
                    metrics::counter!(metrics::ACTIONS_DROPPED).increment(1);
                    return Ok(EffectHandle::completed());
                }
                let _ = self.action_broadcast.send(action.clone());
            }

            metrics::counter!(metrics::ACTIONS_TOTAL).increment(1);

            let start = std::time::Instant::now();
            let effects = {
                let span = tracing::debug_span!("reducer_execution");
                let _enter = span.enter();
                self.reducer.reduce(&mut *state, action, &self.environment)
            };
            metrics::histogram!(metrics::REDUCER_DURATION).record(start.elapsed().as_secs_f64());
            tracing::trace!("Reducer completed, returned {} effects", effects.len());

            for effect in effects {
                self.execute_effect(effect, &tracking, &[]);
            }

            if self.observers.receiver_count() > 0 {
                self.observers.send_replace(S::clone(&state));
            }

            Ok(handle)
        }

        /// Deliver an action produced by an effect
        async fn feed_back(&self, action: A, cancelled: &AtomicBool) {
            match &self.feedback {
                FeedbackDestination::Auto => {
                    if let Err(error) = self.send_internal(action, Some(cancelled)).await {
                        tracing::debug!(%error, "Action produced by effect was not reduced");
                    }
                },
                FeedbackDestination::Queued(queue) => {
                    if cancelled.load(Ordering::Acquire) {
                        metrics::counter!(metrics::ACTIONS_DROPPED).increment(1);
                        return;
                    }
                    let _ = self.action_broadcast.send(action.clone());
                    if queue.send(action).is_err() {
                        tracing::debug!("Action queue closed, dropping action produced by effect");
                    }
                },
            }
        }

        fn sender_for(&self, cancelled: Arc<AtomicBool>) -> ActionSender<A> {
            let store = self.clone();
            let flag = Arc::clone(&cancelled);
            ActionSender::new(cancelled, move |action| {
                let store = store.clone();
                let flag = Arc::clone(&flag);
                Box::pin(async move { store.feed_back(action, &flag).await })
            })
        }

        /// Start an effect
        ///
        /// `ids` are the cancellation ids of every `Cancellable` wrapping this
        /// effect; each spawned task is registered under all of them.
        fn execute_effect(&self, effect: Effect<A>, tracking: &EffectTracking, ids: &[CancelId]) {
            match effect {
                Effect::None => {
                    metrics::counter!(metrics::EFFECTS_EXECUTED, "type" => "none").increment(1);
                },
                Effect::Future(future) => {
                    self.spawn_effect(tracking, ids, "future", move |send| async move {
                        if let Some(action) = future.await {
                            send.send(action).await;
                        }
                    });
                },
                Effect::Run(operation) => {
                    self.spawn_effect(tracking, ids, "run", move |send| async move {
                        if let Err(error) = operation(send).await {
                            tracing::warn!(error = %error, "Effect failed");
                            metrics::counter!(metrics::EFFECTS_FAILED).increment(1);
                        }
                    });
                },
                Effect::Parallel(effects) => {
                    metrics::counter!(metrics::EFFECTS_EXECUTED, "type" => "parallel").increment(1);
                    for effect in effects {
                        self.execute_effect(effect, tracking, ids);
                    }
                },
                Effect::Sequential(effects) => {
                    let store = self.clone();
                    let ids_for_steps = ids.to_vec();
                    self.spawn_effect(tracking, ids, "sequential", move |send| async move {
                        for effect in effects {
                            if send.is_cancelled() {
                                break;
                            }
                            let (mut step, step_tracking) = EffectHandle::new();
                            store.execute_effect(effect, &step_tracking, &ids_for_steps);
                            drop(step_tracking);
                            step.wait().await;
                        }
                    });
                },
                Effect::Cancellable {
                    id,
                    cancel_in_flight,
                    effect,
                } => {
                    if cancel_in_flight {
                        self.cancel_effects(&id);
                    }
                    let mut ids = ids.to_vec();
                    ids.push(id);
                    self.execute_effect(*effect, tracking, &ids);
                },
                Effect::Cancel(id) => {
                    metrics::counter!(metrics::EFFECTS_EXECUTED, "type" => "cancel").increment(1);
                    self.cancel_effects(&id);
                },
            }
        }

        fn cancel_effects(&self, id: &CancelId) {
            let cancelled = self.registry.cancel(id);
            if cancelled > 0 {
                tracing::debug!(%id, cancelled, "Cancelled in-flight effects");
                metrics::counter!(metrics::EFFECTS_CANCELLED).increment(cancelled as u64);
            }
        }

        /// Spawn one effect task
        ///
        /// Uses [`DecrementGuard`] so the handle's counter is decremented
        /// however the task ends: finished, panicked or aborted.
        fn spawn_effect<F, Fut>(&self, tracking: &EffectTracking, ids: &[CancelId], kind: &'static str, body: F)
        where
            F: FnOnce(ActionSender<A>) -> Fut,
            Fut: Future<Output = ()> + Send + 'static,
        {
            metrics::counter!(metrics::EFFECTS_EXECUTED, "type" => kind).increment(1);
            metrics::gauge!(metrics::EFFECTS_IN_FLIGHT).increment(1.0);

            tracking.increment();
            self.pending_effects.fetch_add(1, Ordering::SeqCst);
            let guard = DecrementGuard(tracking.clone());
            let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));

            let cancelled = Arc::new(AtomicBool::new(false));
            let task = body(self.sender_for(Arc::clone(&cancelled)));

            self.registry.spawn(ids, cancelled, move |registration| async move {
                let _registration = registration;
                let _guard = guard;
                let _pending_guard = pending_guard;
                task.await;
            });
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: Arc::clone(&self.reducer),
                environment: Arc::clone(&self.environment),
                config: self.config.clone(),
                registry: Arc::clone(&self.registry),
                feedback: self.feedback.clone(),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                action_broadcast: self.action_broadcast.clone(),
                observers: Arc::clone(&self.observers),
            }
        }
    }

    /// A store restricted to one child feature
    ///
    /// Created by [`Store::scope`]. Shares state and effects with the parent
    /// store; only the view differs.
    pub struct ScopedStore<S, A, E, R, ChildState, ChildAction>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        store: Store<S, A, E, R>,
        state: fn(&S) -> &ChildState,
        embed: fn(ChildAction) -> A,
    }

    impl<S, A, E, R, ChildState, ChildAction> ScopedStore<S, A, E, R, ChildState, ChildAction>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        S: Clone + Send + Sync + 'static,
        A: Clone + Send + 'static,
        E: Send + Sync + 'static,
    {
        /// Send a child action through the parent store
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        pub async fn send(&self, action: ChildAction) -> Result<EffectHandle, StoreError> {
            self.store.send((self.embed)(action)).await
        }

        /// Read the child state via a closure
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&ChildState) -> T,
        {
            let get = self.state;
            self.store.state(|parent| f(get(parent))).await
        }

        /// Clone of the current child state
        pub async fn snapshot(&self) -> ChildState
        where
            ChildState: Clone,
        {
            self.state(ChildState::clone).await
        }
    }

    impl<S, A, E, R, ChildState, ChildAction> Clone for ScopedStore<S, A, E, R, ChildState, ChildAction>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn clone(&self) -> Self {
            Self {
                store: self.store.clone(),
                state: self.state,
                embed: self.embed,
            }
        }
    }
}

pub use store::{ScopedStore, Store};

#[cfg(test)]
mod tests {
    #![allow(clippy::panic, clippy::expect_used)]

    use super::*;
    use composable_core::{SmallVec, smallvec};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct TestState {
        value: i32,
        log: Vec<String>,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum TestAction {
        Increment,
        Decrement,
        NoOp,
        Record(String),
        ProduceEffect,
        ProduceParallelEffects,
        ProduceSequentialEffects,
        ProducePanickingEffect,
        StartTicking,
        StopTicking,
        Tick,
        Fetch(i32),
        FetchResponse(i32),
        StartJob,
        CancelJob,
        FailingEffect,
    }

    #[derive(Debug, Clone)]
    struct TestEnv;

    #[derive(Debug, Clone)]
    struct TestReducer;

    fn delayed(ms: u64, action: TestAction) -> Effect<TestAction> {
        Effect::future(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Some(action)
        })
    }

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = TestEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                TestAction::Increment => {
                    state.value += 1;
                    smallvec![Effect::None]
                },
                TestAction::Decrement => {
                    state.value -= 1;
                    smallvec![Effect::None]
                },
                TestAction::NoOp => smallvec![Effect::None],
                TestAction::Record(entry) => {
                    state.log.push(entry);
                    smallvec![]
                },
                TestAction::ProduceEffect => smallvec![Effect::send(TestAction::Increment)],
                TestAction::ProduceParallelEffects => smallvec![Effect::merge(vec![
                    Effect::send(TestAction::Increment),
                    Effect::send(TestAction::Increment),
                    Effect::send(TestAction::Increment),
                ])],
                TestAction::ProduceSequentialEffects => smallvec![Effect::chain(vec![
                    delayed(20, TestAction::Record("first".into())),
                    Effect::send(TestAction::Record("second".into())),
                    delayed(5, TestAction::Record("third".into())),
                ])],
                TestAction::ProducePanickingEffect => smallvec![Effect::future(async {
                    let response: Option<TestAction> = None;
                    assert!(response.is_some(), "Intentional panic in effect for testing");
                    response
                })],
                TestAction::StartTicking => smallvec![
                    Effect::run(|send| async move {
                        loop {
                            tokio::time::sleep(Duration::from_millis(10)).await;
                            send.send(TestAction::Tick).await;
                        }
                    })
                    .cancellable("ticker")
                ],
                TestAction::StopTicking => smallvec![Effect::cancel("ticker")],
                TestAction::Tick => {
                    state.value += 1;
                    smallvec![]
                },
                TestAction::Fetch(n) => {
                    smallvec![delayed(30, TestAction::FetchResponse(n)).cancellable("fetch")]
                },
                TestAction::FetchResponse(n) => {
                    state.log.push(format!("response {n}"));
                    smallvec![]
                },
                TestAction::StartJob => smallvec![
                    Effect::run(|send| async move {
                        send.send(TestAction::Record("started".into())).await;
                        tokio::time::sleep(Duration::from_millis(30)).await;
                        send.send(TestAction::Record("finished".into())).await;
                    })
                    .cancellable("job")
                ],
                TestAction::CancelJob => smallvec![Effect::cancel("job")],
                TestAction::FailingEffect => smallvec![Effect::try_run(|_send| async {
                    Err::<(), _>(std::io::Error::other("boom"))
                })],
            }
        }
    }

    fn store() -> Store<TestState, TestAction, TestEnv, TestReducer> {
        Store::new(TestState::default(), TestReducer, TestEnv)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_store_creation() {
        let store = store();
        assert_eq!(store.state(|s| s.value).await, 0);
        assert_eq!(store.in_flight_effects(), 0);
    }

    #[tokio::test]
    async fn test_send_action() {
        let store = store();

        let _ = store.send(TestAction::Increment).await;
        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn test_multiple_actions() {
        let store = store();

        let _ = store.send(TestAction::Increment).await;
        let _ = store.send(TestAction::Increment).await;
        let _ = store.send(TestAction::Decrement).await;

        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn test_effect_none() {
        let store = store();

        let mut handle = store.send(TestAction::NoOp).await.expect("send");
        assert!(handle.is_complete());
        handle.wait().await;
        assert_eq!(store.state(|s| s.value).await, 0);
    }

    #[tokio::test]
    async fn test_effect_feeds_action_back() {
        let store = store();

        let mut handle = store.send(TestAction::ProduceEffect).await.expect("send");
        handle
            .wait_with_timeout(Duration::from_secs(1))
            .await
            .expect("effect should complete");

        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn test_parallel_effects() {
        let store = store();

        let mut handle = store.send(TestAction::ProduceParallelEffects).await.expect("send");
        handle.wait().await;

        assert_eq!(store.state(|s| s.value).await, 3);
    }

    #[tokio::test]
    async fn test_sequential_effects_run_in_order() {
        let store = store();

        let mut handle = store.send(TestAction::ProduceSequentialEffects).await.expect("send");
        handle
            .wait_with_timeout(Duration::from_secs(1))
            .await
            .expect("sequence should complete");

        assert_eq!(store.state(|s| s.log.clone()).await, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_panicking_effect_does_not_poison_store() {
        let store = store();

        let mut handle = store.send(TestAction::ProducePanickingEffect).await.expect("send");
        handle
            .wait_with_timeout(Duration::from_secs(1))
            .await
            .expect("counter is released on panic");

        let _ = store.send(TestAction::Increment).await;
        assert_eq!(store.state(|s| s.value).await, 1);
        assert_eq!(store.in_flight_effects(), 0);
    }

    #[tokio::test]
    async fn test_failing_effect_is_logged_not_propagated() {
        let store = store();

        let mut handle = store.send(TestAction::FailingEffect).await.expect("send");
        handle.wait().await;

        assert_eq!(store.snapshot().await, TestState::default());
    }

    #[tokio::test]
    async fn test_cancel_stops_long_running_effect() {
        let store = store();

        let _ = store.send(TestAction::StartTicking).await;
        tokio::time::sleep(Duration::from_millis(55)).await;
        let _ = store.send(TestAction::StopTicking).await;
        let ticks = store.state(|s| s.value).await;
        assert!(ticks >= 1, "expected ticks before cancelling, got {ticks}");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.state(|s| s.value).await, ticks);
        assert_eq!(store.in_flight_effects(), 0);
    }

    #[tokio::test]
    async fn test_cancel_in_flight_keeps_only_latest_request() {
        let store = store();

        let mut first = store.send(TestAction::Fetch(1)).await.expect("send");
        let mut second = store.send(TestAction::Fetch(2)).await.expect("send");
        first.wait().await;
        second
            .wait_with_timeout(Duration::from_secs(1))
            .await
            .expect("latest fetch completes");

        assert_eq!(store.state(|s| s.log.clone()).await, vec!["response 2"]);
    }

    #[tokio::test]
    async fn test_cancelled_effect_never_sends_again() {
        let store = store();

        let mut job = store.send(TestAction::StartJob).await.expect("send");
        tokio::time::sleep(Duration::from_millis(5)).await;
        let _ = store.send(TestAction::CancelJob).await;
        job.wait_with_timeout(Duration::from_secs(1))
            .await
            .expect("cancelled job releases its handle");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.state(|s| s.log.clone()).await, vec!["started"]);
    }

    #[tokio::test]
    async fn test_cancel_all_effects() {
        let store = store();

        let _ = store.send(TestAction::StartTicking).await;
        let _ = store.send(TestAction::StartJob).await;
        settle().await;

        assert_eq!(store.cancel_all_effects(), 2);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(store.in_flight_effects(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_actions() {
        let store = store();

        store.shutdown(Duration::from_secs(1)).await.expect("no effects running");

        assert_eq!(store.send(TestAction::Increment).await.err(), Some(StoreError::ShutdownInProgress));
        assert_eq!(store.state(|s| s.value).await, 0);
    }

    #[tokio::test]
    async fn test_shutdown_times_out_with_running_effects() {
        let store = store();
        let _ = store.send(TestAction::StartTicking).await;

        let result = store.shutdown(Duration::from_millis(30)).await;
        assert_eq!(result, Err(StoreError::ShutdownTimeout(1)));

        store.cancel_all_effects();
    }

    #[tokio::test]
    async fn test_send_and_wait_for() {
        let store = store();

        let response = store
            .send_and_wait_for(
                TestAction::Fetch(7),
                |a| matches!(a, TestAction::FetchResponse(_)),
                Duration::from_secs(1),
            )
            .await
            .expect("response arrives");

        assert_eq!(response, TestAction::FetchResponse(7));
    }

    #[tokio::test]
    async fn test_send_and_wait_for_times_out() {
        let store = store();

        let result = store
            .send_and_wait_for(TestAction::NoOp, |_| true, Duration::from_millis(20))
            .await;

        assert_eq!(result, Err(StoreError::Timeout));
    }

    #[tokio::test]
    async fn test_subscribe_actions_sees_only_effect_actions() {
        let store = store();
        let mut rx = store.subscribe_actions();

        let mut handle = store.send(TestAction::ProduceEffect).await.expect("send");
        handle.wait().await;

        assert_eq!(rx.recv().await.expect("broadcast"), TestAction::Increment);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_observe_state_changes() {
        let store = store();
        let _ = store.send(TestAction::Increment).await;

        let mut rx = store.observe().await;
        assert_eq!(rx.borrow_and_update().value, 1);

        let _ = store.send(TestAction::Increment).await;
        rx.changed().await.expect("store alive");
        assert_eq!(rx.borrow().value, 2);
    }

    #[tokio::test]
    async fn test_queued_feedback_defers_effect_actions() {
        let (store, mut queue) = Store::queued(TestState::default(), TestReducer, TestEnv, StoreConfig::default());

        let mut handle = store.send(TestAction::ProduceEffect).await.expect("send");
        handle.wait().await;

        assert_eq!(store.state(|s| s.value).await, 0);
        let action = queue.recv().await.expect("queued action");
        assert_eq!(action, TestAction::Increment);

        let _ = store.send(action).await;
        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = store();
        let other = store.clone();

        let _ = other.send(TestAction::Increment).await;
        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_sends_are_serialized() {
        let store = store();

        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    let _ = store.send(TestAction::Increment).await;
                })
            })
            .collect();
        for result in futures::future::join_all(tasks).await {
            result.expect("send task");
        }

        assert_eq!(store.state(|s| s.value).await, 50);
    }

    #[test]
    fn test_effect_handle_completed() {
        let handle = EffectHandle::completed();
        assert!(handle.is_complete());
    }

    #[test]
    fn test_config_builder() {
        let config = StoreConfig::default()
            .with_broadcast_capacity(4)
            .with_shutdown_timeout(Duration::from_millis(5));

        assert_eq!(config.broadcast_capacity, 4);
        assert_eq!(config.default_shutdown_timeout, Duration::from_millis(5));
    }
}
