//! Dependency registry passed to reducers as their environment.
//!
//! Every dependency is declared by a [`DependencyKey`] with a live and a
//! test implementation. A [`Dependencies`] value resolves keys for one store:
//! explicit overrides first, then a per-instance cache of values resolved
//! from the context's defaults.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use composable_core::dependencies::{Dependencies, UuidKey};
//! use composable_core::environment::IncrementingUuidGenerator;
//!
//! let deps = Dependencies::live().with::<UuidKey>(Arc::new(IncrementingUuidGenerator::new()));
//! let uuid = deps.get::<UuidKey>();
//! assert_eq!(uuid.next().to_string(), "00000000-0000-0000-0000-000000000000");
//! ```

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::environment::{
    Clock, ImmediateClock, IncrementingUuidGenerator, RandomUuidGenerator, SystemClock, TestClock,
    UuidGenerator,
};

/// Declares one injectable dependency
pub trait DependencyKey: 'static {
    /// The dependency's interface, usually an `Arc<dyn Trait>`
    type Value: Clone + Send + Sync + 'static;

    /// Production implementation (real I/O)
    fn live_value() -> Self::Value;

    /// Deterministic implementation for tests
    fn test_value() -> Self::Value;

    /// Implementation for previews; defaults to the test implementation
    fn preview_value() -> Self::Value {
        Self::test_value()
    }
}

/// Which default implementation keys resolve to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DependencyContext {
    /// Real implementations
    #[default]
    Live,
    /// Deterministic implementations
    Test,
    /// Preview implementations
    Preview,
}

type Erased = Arc<dyn Any + Send + Sync>;

/// Explicit dependency context for one store
///
/// Clones keep the overrides but start with an empty cache, so stateful
/// defaults (such as an incrementing id generator) are never shared between
/// stores.
pub struct Dependencies {
    context: DependencyContext,
    overrides: Arc<HashMap<TypeId, Erased>>,
    resolved: Mutex<HashMap<TypeId, Erased>>,
}

impl Dependencies {
    /// Dependencies resolving to the given context's defaults
    #[must_use]
    pub fn new(context: DependencyContext) -> Self {
        Self {
            context,
            overrides: Arc::new(HashMap::new()),
            resolved: Mutex::new(HashMap::new()),
        }
    }

    /// Production dependencies
    #[must_use]
    pub fn live() -> Self {
        Self::new(DependencyContext::Live)
    }

    /// Deterministic test dependencies
    #[must_use]
    pub fn test() -> Self {
        Self::new(DependencyContext::Test)
    }

    /// Preview dependencies
    #[must_use]
    pub fn preview() -> Self {
        Self::new(DependencyContext::Preview)
    }

    /// The context defaults are resolved from
    #[must_use]
    pub const fn context(&self) -> DependencyContext {
        self.context
    }

    /// Override `K` for this instance (and its clones) only
    #[must_use]
    pub fn with<K: DependencyKey>(mut self, value: K::Value) -> Self {
        Arc::make_mut(&mut self.overrides).insert(TypeId::of::<K>(), Arc::new(value));
        self.resolved_mut().remove(&TypeId::of::<K>());
        self
    }

    /// Resolve `K`
    #[must_use]
    pub fn get<K: DependencyKey>(&self) -> K::Value {
        let key = TypeId::of::<K>();
        if let Some(value) = self.overrides.get(&key).and_then(|v| v.downcast_ref::<K::Value>()) {
            return value.clone();
        }

        let mut resolved = self.resolved.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = resolved.get(&key).and_then(|v| v.downcast_ref::<K::Value>()) {
            return value.clone();
        }

        let value = match self.context {
            DependencyContext::Live => K::live_value(),
            DependencyContext::Test => K::test_value(),
            DependencyContext::Preview => K::preview_value(),
        };
        tracing::trace!(key = type_name::<K>(), context = ?self.context, "Resolved dependency");
        resolved.insert(key, Arc::new(value.clone()));
        value
    }

    fn resolved_mut(&mut self) -> &mut HashMap<TypeId, Erased> {
        self.resolved.get_mut().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clone for Dependencies {
    fn clone(&self) -> Self {
        Self {
            context: self.context,
            overrides: Arc::clone(&self.overrides),
            resolved: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for Dependencies {
    fn default() -> Self {
        Self::live()
    }
}

impl fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependencies")
            .field("context", &self.context)
            .field("overrides", &self.overrides.len())
            .finish_non_exhaustive()
    }
}

/// The clock used for timers and timestamps
pub struct ClockKey;

impl DependencyKey for ClockKey {
    type Value = Arc<dyn Clock>;

    fn live_value() -> Self::Value {
        Arc::new(SystemClock)
    }

    fn test_value() -> Self::Value {
        Arc::new(TestClock::default())
    }

    fn preview_value() -> Self::Value {
        Arc::new(ImmediateClock)
    }
}

/// The generator for new identifiers
pub struct UuidKey;

impl DependencyKey for UuidKey {
    type Value = Arc<dyn UuidGenerator>;

    fn live_value() -> Self::Value {
        Arc::new(RandomUuidGenerator)
    }

    fn test_value() -> Self::Value {
        Arc::new(IncrementingUuidGenerator::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct GreetingKey;

    impl DependencyKey for GreetingKey {
        type Value = &'static str;

        fn live_value() -> Self::Value {
            "hello from the network"
        }

        fn test_value() -> Self::Value {
            "hello from a stub"
        }
    }

    #[test]
    fn context_selects_default_implementation() {
        assert_eq!(Dependencies::live().get::<GreetingKey>(), "hello from the network");
        assert_eq!(Dependencies::test().get::<GreetingKey>(), "hello from a stub");
        assert_eq!(Dependencies::preview().get::<GreetingKey>(), "hello from a stub");
    }

    #[test]
    fn overrides_win_and_do_not_leak_to_siblings() {
        let base = Dependencies::test();
        let overridden = base.clone().with::<GreetingKey>("overridden");

        assert_eq!(overridden.get::<GreetingKey>(), "overridden");
        assert_eq!(base.get::<GreetingKey>(), "hello from a stub");
        assert_eq!(overridden.clone().get::<GreetingKey>(), "overridden");
    }

    #[test]
    fn resolved_values_are_cached_per_instance() {
        let deps = Dependencies::test();
        let first = deps.get::<UuidKey>();
        let second = deps.get::<UuidKey>();
        assert_eq!(first.next().to_string(), "00000000-0000-0000-0000-000000000000");
        assert_eq!(second.next().to_string(), "00000000-0000-0000-0000-000000000001");

        // A clone is a separate store's registry and starts from scratch.
        let sibling = deps.clone();
        assert_eq!(
            sibling.get::<UuidKey>().next().to_string(),
            "00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_clock_is_shared_within_one_registry() {
        let deps = Dependencies::test();
        let clock = deps.get::<ClockKey>();
        let same = deps.get::<ClockKey>();

        assert!(Arc::ptr_eq(&clock, &same));
        assert_eq!(clock.now(), chrono::DateTime::<chrono::Utc>::UNIX_EPOCH);
    }
}
