//! Explicit accessors for one case of an enum.
//!
//! A [`CasePath`] pairs an extractor and an embedder for a single enum
//! variant. Composition operators use them to route parent actions to child
//! reducers and to lift child actions back into the parent.

use std::fmt;

/// Extract/embed pair for a single-field enum variant
pub struct CasePath<Root, Value> {
    name: &'static str,
    extract: fn(Root) -> Option<Value>,
    embed: fn(Value) -> Root,
}

impl<Root, Value> Clone for CasePath<Root, Value> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Root, Value> Copy for CasePath<Root, Value> {}

impl<Root, Value> fmt::Debug for CasePath<Root, Value> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CasePath").field(&self.name).finish()
    }
}

impl<Root, Value> CasePath<Root, Value> {
    /// Build a case path from its parts
    ///
    /// Prefer the [`case_path!`](crate::case_path!) macro for tuple variants.
    #[must_use]
    pub const fn new(
        name: &'static str,
        extract: fn(Root) -> Option<Value>,
        embed: fn(Value) -> Root,
    ) -> Self {
        Self {
            name,
            extract,
            embed,
        }
    }

    /// Name of the case, used in logs and as a cancellation scope
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Pull the value out of `root` if `root` is this case
    #[must_use]
    pub fn extract(&self, root: Root) -> Option<Value> {
        (self.extract)(root)
    }

    /// Wrap `value` in this case
    #[must_use]
    pub fn embed(&self, value: Value) -> Root {
        (self.embed)(value)
    }

    /// The embedding function alone
    #[must_use]
    pub const fn embedder(&self) -> fn(Value) -> Root {
        self.embed
    }
}
