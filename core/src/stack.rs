//! Navigation stacks of child features.
//!
//! A [`StackState`] is an ordered collection whose element identifiers are
//! assigned by the stack itself from a monotonic counter, so an id is never
//! reused after its element has been popped.

use std::fmt;

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::case_path::CasePath;
use crate::effect::Effect;
use crate::identified::element_scope;
use crate::reducer::Reducer;

/// Identifier of one element of a [`StackState`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StackElementId(pub u64);

impl fmt::Display for StackElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ordered stack of child states, bottom first
#[derive(Clone)]
pub struct StackState<S> {
    elements: IndexMap<StackElementId, S>,
    next_id: u64,
}

impl<S> StackState<S> {
    /// Create an empty stack
    #[must_use]
    pub fn new() -> Self {
        Self {
            elements: IndexMap::new(),
            next_id: 0,
        }
    }

    /// The id the next [`StackState::push`] will assign
    #[must_use]
    pub const fn next_id(&self) -> StackElementId {
        StackElementId(self.next_id)
    }

    /// Push `state` on top, returning its assigned id
    pub fn push(&mut self, state: S) -> StackElementId {
        let id = StackElementId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.elements.insert(id, state);
        id
    }

    /// Push `state` under an id chosen by the caller (a `Push` action)
    ///
    /// `id` must not have been handed out before: anything below
    /// [`StackState::next_id`] is rejected, whether it is still on the stack
    /// or was popped. On success the counter moves past `id`.
    ///
    /// Returns whether `state` was pushed.
    #[must_use]
    pub fn push_with_id(&mut self, id: StackElementId, state: S) -> bool {
        let Some(next) = id.0.checked_add(1) else {
            return false;
        };
        if id.0 < self.next_id {
            return false;
        }
        self.next_id = next;
        self.elements.insert(id, state);
        true
    }

    /// Remove the top element
    pub fn pop_last(&mut self) -> Option<(StackElementId, S)> {
        self.elements.pop()
    }

    /// Remove the element `id` and everything above it
    ///
    /// Returns the number of removed elements.
    pub fn pop_from(&mut self, id: StackElementId) -> usize {
        match self.elements.get_index_of(&id) {
            Some(index) => {
                let removed = self.elements.len() - index;
                self.elements.truncate(index);
                removed
            },
            None => 0,
        }
    }

    /// Look up an element
    #[must_use]
    pub fn get(&self, id: StackElementId) -> Option<&S> {
        self.elements.get(&id)
    }

    /// Look up an element for mutation
    pub fn get_mut(&mut self, id: StackElementId) -> Option<&mut S> {
        self.elements.get_mut(&id)
    }

    /// Element ids, bottom first
    pub fn ids(&self) -> impl Iterator<Item = StackElementId> + '_ {
        self.elements.keys().copied()
    }

    /// Elements, bottom first
    pub fn iter(&self) -> impl Iterator<Item = (StackElementId, &S)> {
        self.elements.iter().map(|(id, state)| (*id, state))
    }

    /// The top element
    #[must_use]
    pub fn last(&self) -> Option<(StackElementId, &S)> {
        self.elements.last().map(|(id, state)| (*id, state))
    }

    /// Number of elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the stack is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl<S> Default for StackState<S> {
    fn default() -> Self {
        Self::new()
    }
}

// The counter is bookkeeping; two stacks showing the same screens are equal.
impl<S: PartialEq> PartialEq for StackState<S> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|((a_id, a), (b_id, b))| a_id == b_id && a == b)
    }
}

impl<S: fmt::Debug> fmt::Debug for StackState<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Actions of a stack-embedded child
#[derive(Clone, Debug, PartialEq)]
pub enum StackAction<State, Action> {
    /// An action of element `id`
    Element {
        /// Target element
        id: StackElementId,
        /// The element's action
        action: Action,
    },
    /// Push a new element
    Push {
        /// Identifier for the pushed element
        id: StackElementId,
        /// Its initial state
        state: State,
    },
    /// Pop element `id` and everything above it
    PopFrom {
        /// Lowest element to pop
        id: StackElementId,
    },
}

/// A parent reducer with a child embedded on every element of a [`StackState`]
///
/// Created by [`ReducerExt::for_each_stack`](crate::composition::ReducerExt::for_each_stack).
///
/// `Element` actions run the child before the parent. `Push` and `PopFrom`
/// let the parent observe the request first and are applied afterwards. A
/// child asking to dismiss itself sends `PopFrom` for its own id, and
/// elements that leave the stack get their effects cancelled.
pub struct ForEachStack<Parent, Element>
where
    Parent: Reducer,
    Element: Reducer,
{
    parent: Parent,
    element: Element,
    state: fn(&mut Parent::State) -> &mut StackState<Element::State>,
    action: CasePath<Parent::Action, StackAction<Element::State, Element::Action>>,
}

impl<Parent, Element> ForEachStack<Parent, Element>
where
    Parent: Reducer,
    Element: Reducer<Environment = Parent::Environment>,
{
    pub(crate) const fn new(
        parent: Parent,
        state: fn(&mut Parent::State) -> &mut StackState<Element::State>,
        action: CasePath<Parent::Action, StackAction<Element::State, Element::Action>>,
        element: Element,
    ) -> Self {
        Self {
            parent,
            element,
            state,
            action,
        }
    }
}

impl<Parent, Element> Reducer for ForEachStack<Parent, Element>
where
    Parent: Reducer,
    Parent::Action: Clone + Send + Sync + 'static,
    Element: Reducer<Environment = Parent::Environment>,
    Element::State: 'static,
    Element::Action: Send + 'static,
{
    type State = Parent::State;
    type Action = Parent::Action;
    type Environment = Parent::Environment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let ids_before: Vec<StackElementId> = (self.state)(state).ids().collect();
        let mut effects = SmallVec::new();
        let name = self.action.name();

        let mut structural = None;
        match self.action.extract(action.clone()) {
            Some(StackAction::Element { id, action: element_action }) => {
                if let Some(element_state) = (self.state)(state).get_mut(id) {
                    let scope = element_scope(name, &id);
                    let embed = self.action.embedder();
                    effects.extend(
                        self.element
                            .reduce(element_state, element_action, env)
                            .into_iter()
                            .map(|effect| {
                                effect
                                    .map(move |a| embed(StackAction::Element { id, action: a }))
                                    .with_dismiss(embed(StackAction::PopFrom { id }))
                                    .scoped(&scope)
                                    .tagged(scope.clone())
                            }),
                    );
                } else {
                    // Late actions from popped elements are expected; their effects were cancelled.
                    tracing::warn!(stack = name, %id, "Stack element action for an element that is gone");
                }
            },
            other => structural = other,
        }

        effects.extend(self.parent.reduce(state, action, env));

        let stack = (self.state)(state);
        match structural {
            Some(StackAction::Push { id, state: pushed }) => {
                if !stack.push_with_id(id, pushed) {
                    tracing::warn!(stack = name, %id, next = %stack.next_id(), "Ignoring push with a used stack id");
                }
            },
            Some(StackAction::PopFrom { id }) => {
                let removed = stack.pop_from(id);
                tracing::trace!(stack = name, %id, removed, "Popped stack elements");
            },
            Some(StackAction::Element { .. }) | None => {},
        }

        for id in ids_before {
            if stack.get(id).is_none() {
                effects.push(Effect::cancel(element_scope(name, &id)));
            }
        }

        effects
    }
}
