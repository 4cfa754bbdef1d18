//! Effect descriptions returned by reducers.
//!
//! Effects are NOT executed immediately. They are descriptions of what should
//! happen, returned from reducers and executed by the Store runtime. Work that
//! emits actions over time (timers, streams of responses) is expressed with
//! [`Effect::run`], which receives an [`ActionSender`] feeding actions back into
//! the store that launched it.

use futures::FutureExt;
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Boxed, sendable future used throughout the effect model
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Error raised by the body of a fallible [`Effect::Run`]
pub type EffectError = Box<dyn Error + Send + Sync>;

/// Body of an [`Effect::Run`]
pub type Operation<Action> =
    Box<dyn FnOnce(ActionSender<Action>) -> BoxFuture<Result<(), EffectError>> + Send>;

type DispatchFn<Action> = Arc<dyn Fn(Action) -> BoxFuture<()> + Send + Sync>;
type DismissFn = Arc<dyn Fn() -> BoxFuture<()> + Send + Sync>;

/// Identifier used to cancel in-flight effects
///
/// Identifiers are plain strings. Composition operators namespace the
/// identifiers used by a child feature with [`CancelId::within`], so two
/// presented children using the same literal id never cancel each other.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CancelId(String);

impl CancelId {
    /// Create a cancellation identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Namespace this identifier below `scope` (`scope/id`)
    #[must_use]
    pub fn within(&self, scope: &Self) -> Self {
        Self(format!("{}/{}", scope.0, self.0))
    }

    /// The identifier as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CancelId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for CancelId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for CancelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle given to [`Effect::Run`] bodies for feeding actions back into the store
///
/// Once the owning task has been cancelled, [`ActionSender::send`] drops
/// actions instead of delivering them, so a cancelled effect never mutates
/// state again even if its underlying work keeps running for a while.
pub struct ActionSender<Action> {
    dispatch: DispatchFn<Action>,
    dismiss: Option<DismissFn>,
    cancelled: Arc<AtomicBool>,
}

impl<Action> Clone for ActionSender<Action> {
    fn clone(&self) -> Self {
        Self {
            dispatch: Arc::clone(&self.dispatch),
            dismiss: self.dismiss.clone(),
            cancelled: Arc::clone(&self.cancelled),
        }
    }
}

impl<Action> ActionSender<Action> {
    /// Whether the task owning this sender has been cancelled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl<Action> fmt::Debug for ActionSender<Action> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionSender")
            .field("cancelled", &self.is_cancelled())
            .field("can_dismiss", &self.dismiss.is_some())
            .finish_non_exhaustive()
    }
}

impl<Action: Send + 'static> ActionSender<Action> {
    /// Create a sender from a dispatch function and the task's cancellation flag
    pub fn new<F>(cancelled: Arc<AtomicBool>, dispatch: F) -> Self
    where
        F: Fn(Action) -> BoxFuture<()> + Send + Sync + 'static,
    {
        Self {
            dispatch: Arc::new(dispatch),
            dismiss: None,
            cancelled,
        }
    }

    /// Feed an action back into the store
    ///
    /// Completes once the store has reduced the action (or queued it, for
    /// test stores). A no-op after cancellation.
    pub async fn send(&self, action: Action) {
        if self.is_cancelled() {
            tracing::trace!("Dropping action from cancelled effect");
            return;
        }
        (self.dispatch)(action).await;
    }

    /// Ask the presenting parent to dismiss the feature this effect belongs to
    ///
    /// Only effects of features embedded with `if_let` or `for_each_stack`
    /// know how to dismiss themselves; elsewhere this logs a warning.
    pub async fn dismiss(&self) {
        if self.is_cancelled() {
            return;
        }
        match &self.dismiss {
            Some(dismiss) => dismiss().await,
            None => tracing::warn!("dismiss() called from an effect of a feature that is not presented"),
        }
    }

    /// Derive a sender for a child action type
    #[must_use]
    pub fn contramap<Child, F>(&self, f: F) -> ActionSender<Child>
    where
        F: Fn(Child) -> Action + Send + Sync + 'static,
        Child: 'static,
    {
        let dispatch = Arc::clone(&self.dispatch);
        ActionSender {
            dispatch: Arc::new(move |child| dispatch(f(child))),
            dismiss: self.dismiss.clone(),
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    /// Install the action sent by [`ActionSender::dismiss`]
    ///
    /// Replaces any hook installed further out, so the innermost presentation wins.
    #[must_use]
    pub fn with_dismiss_action(mut self, action: Action) -> Self
    where
        Action: Clone + Sync,
    {
        let dispatch = Arc::clone(&self.dispatch);
        self.dismiss = Some(Arc::new(move || dispatch(action.clone())));
        self
    }
}

/// Effect type - describes a side effect to be executed
///
/// # Type Parameters
///
/// - `Action`: The action type that effects can produce (feedback loop)
pub enum Effect<Action> {
    /// No-op effect
    None,

    /// Arbitrary async computation
    ///
    /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
    Future(BoxFuture<Option<Action>>),

    /// Long-running work that may emit any number of actions
    Run(Operation<Action>),

    /// Run effects in parallel
    Parallel(Vec<Effect<Action>>),

    /// Run effects sequentially
    Sequential(Vec<Effect<Action>>),

    /// Tag every task started by `effect` with `id`
    Cancellable {
        /// Cancellation identifier
        id: CancelId,
        /// Cancel tasks already tagged with `id` before starting
        cancel_in_flight: bool,
        /// The tagged effect
        effect: Box<Effect<Action>>,
    },

    /// Cancel every in-flight task tagged with the identifier
    Cancel(CancelId),
}

// Manual Debug implementation since Future doesn't implement Debug
impl<Action> fmt::Debug for Effect<Action> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::None => write!(f, "Effect::None"),
            Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            Effect::Run(_) => write!(f, "Effect::Run(<operation>)"),
            Effect::Parallel(effects) => f.debug_tuple("Effect::Parallel").field(effects).finish(),
            Effect::Sequential(effects) => {
                f.debug_tuple("Effect::Sequential").field(effects).finish()
            },
            Effect::Cancellable {
                id,
                cancel_in_flight,
                effect,
            } => f
                .debug_struct("Effect::Cancellable")
                .field("id", id)
                .field("cancel_in_flight", cancel_in_flight)
                .field("effect", effect)
                .finish(),
            Effect::Cancel(id) => f.debug_tuple("Effect::Cancel").field(id).finish(),
        }
    }
}

impl<Action> Default for Effect<Action> {
    fn default() -> Self {
        Self::None
    }
}

impl<Action: Send + 'static> Effect<Action> {
    /// An effect that does nothing
    #[must_use]
    pub const fn none() -> Self {
        Self::None
    }

    /// Immediately feed `action` back into the store
    #[must_use]
    pub fn send(action: Action) -> Self {
        Self::Future(Box::pin(async move { Some(action) }))
    }

    /// Await a future producing at most one action
    #[must_use]
    pub fn future<F>(future: F) -> Self
    where
        F: Future<Output = Option<Action>> + Send + 'static,
    {
        Self::Future(Box::pin(future))
    }

    /// Run an infallible operation that may send any number of actions
    #[must_use]
    pub fn run<F, Fut>(operation: F) -> Self
    where
        F: FnOnce(ActionSender<Action>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::Run(Box::new(move |sender| {
            Box::pin(async move {
                operation(sender).await;
                Ok(())
            })
        }))
    }

    /// Run a fallible operation
    ///
    /// An error ends only this task; the runtime logs it and keeps going.
    /// Failures the feature cares about should be modeled as actions with
    /// [`Effect::run_catching`] instead.
    #[must_use]
    pub fn try_run<F, Fut, E>(operation: F) -> Self
    where
        F: FnOnce(ActionSender<Action>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<EffectError>,
    {
        Self::Run(Box::new(move |sender| {
            Box::pin(async move { operation(sender).await.map_err(Into::into) })
        }))
    }

    /// Run a fallible operation, translating its error into actions
    #[must_use]
    pub fn run_catching<F, Fut, E, C, CFut>(operation: F, catch: C) -> Self
    where
        F: FnOnce(ActionSender<Action>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Send + 'static,
        C: FnOnce(E, ActionSender<Action>) -> CFut + Send + 'static,
        CFut: Future<Output = ()> + Send + 'static,
    {
        Self::Run(Box::new(move |sender: ActionSender<Action>| {
            Box::pin(async move {
                if let Err(error) = operation(sender.clone()).await {
                    catch(error, sender).await;
                }
                Ok(())
            })
        }))
    }

    /// Combine effects to run in parallel
    #[must_use]
    pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
        Effect::Parallel(effects)
    }

    /// Chain effects to run sequentially
    #[must_use]
    pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
        Effect::Sequential(effects)
    }

    /// Cancel every in-flight effect tagged with `id`
    #[must_use]
    pub fn cancel(id: impl Into<CancelId>) -> Self {
        Self::Cancel(id.into())
    }

    /// Make this effect cancellable by `id`
    ///
    /// Starting it cancels any effect already in flight with the same id.
    #[must_use]
    pub fn cancellable(self, id: impl Into<CancelId>) -> Self {
        Self::Cancellable {
            id: id.into(),
            cancel_in_flight: true,
            effect: Box::new(self),
        }
    }

    /// Group this effect under `id` without cancelling earlier members of the group
    #[must_use]
    pub fn tagged(self, id: impl Into<CancelId>) -> Self {
        match self {
            Self::None => Self::None,
            effect => Self::Cancellable {
                id: id.into(),
                cancel_in_flight: false,
                effect: Box::new(effect),
            },
        }
    }

    /// Whether this effect describes no work at all
    #[must_use]
    pub fn is_none(&self) -> bool {
        match self {
            Self::None => true,
            Self::Parallel(effects) | Self::Sequential(effects) => {
                effects.iter().all(Effect::is_none)
            },
            Self::Cancellable { effect, .. } => effect.is_none(),
            Self::Future(_) | Self::Run(_) | Self::Cancel(_) => false,
        }
    }

    /// Lift this effect into a parent action type
    #[must_use]
    pub fn map<Parent, F>(self, f: F) -> Effect<Parent>
    where
        F: Fn(Action) -> Parent + Clone + Send + Sync + 'static,
        Parent: Send + 'static,
    {
        match self {
            Self::None => Effect::None,
            Self::Future(future) => Effect::Future(future.map(move |action| action.map(f)).boxed()),
            Self::Run(operation) => Effect::Run(Box::new(move |sender: ActionSender<Parent>| {
                operation(sender.contramap(f))
            })),
            Self::Parallel(effects) => {
                Effect::Parallel(effects.into_iter().map(|e| e.map(f.clone())).collect())
            },
            Self::Sequential(effects) => {
                Effect::Sequential(effects.into_iter().map(|e| e.map(f.clone())).collect())
            },
            Self::Cancellable {
                id,
                cancel_in_flight,
                effect,
            } => Effect::Cancellable {
                id,
                cancel_in_flight,
                effect: Box::new(effect.map(f)),
            },
            Self::Cancel(id) => Effect::Cancel(id),
        }
    }

    /// Install `action` as the dismiss request of every `Run` body in this effect
    #[must_use]
    pub fn with_dismiss(self, action: Action) -> Self
    where
        Action: Clone + Sync,
    {
        match self {
            Self::Run(operation) => Self::Run(Box::new(move |sender: ActionSender<Action>| {
                operation(sender.with_dismiss_action(action))
            })),
            Self::Parallel(effects) => Self::Parallel(
                effects
                    .into_iter()
                    .map(|e| e.with_dismiss(action.clone()))
                    .collect(),
            ),
            Self::Sequential(effects) => Self::Sequential(
                effects
                    .into_iter()
                    .map(|e| e.with_dismiss(action.clone()))
                    .collect(),
            ),
            Self::Cancellable {
                id,
                cancel_in_flight,
                effect,
            } => Self::Cancellable {
                id,
                cancel_in_flight,
                effect: Box::new(effect.with_dismiss(action)),
            },
            other @ (Self::None | Self::Future(_) | Self::Cancel(_)) => other,
        }
    }

    /// Namespace every cancellation id in this effect below `scope`
    #[must_use]
    pub fn scoped(self, scope: &CancelId) -> Self {
        match self {
            Self::Parallel(effects) => {
                Self::Parallel(effects.into_iter().map(|e| e.scoped(scope)).collect())
            },
            Self::Sequential(effects) => {
                Self::Sequential(effects.into_iter().map(|e| e.scoped(scope)).collect())
            },
            Self::Cancellable {
                id,
                cancel_in_flight,
                effect,
            } => Self::Cancellable {
                id: id.within(scope),
                cancel_in_flight,
                effect: Box::new(effect.scoped(scope)),
            },
            Self::Cancel(id) => Self::Cancel(id.within(scope)),
            other @ (Self::None | Self::Future(_) | Self::Run(_)) => other,
        }
    }
}
