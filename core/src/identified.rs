//! Ordered, identity-keyed collections of child states.
//!
//! Elements are addressed by a stable identifier rather than by position, so
//! actions for an element keep reaching it after other elements are inserted
//! or removed.

use std::fmt;
use std::hash::Hash;

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::case_path::CasePath;
use crate::effect::{CancelId, Effect};
use crate::reducer::Reducer;

/// A value with a stable identity
pub trait Identifiable {
    /// Identifier type
    type Id: Clone + Eq + Hash + fmt::Debug;

    /// The element's identifier
    fn id(&self) -> Self::Id;
}

/// Ordered collection of identifiable elements
///
/// Insertion order is preserved and part of equality.
#[derive(Clone)]
pub struct IdentifiedVec<T: Identifiable> {
    elements: IndexMap<T::Id, T>,
}

impl<T: Identifiable> IdentifiedVec<T> {
    /// Create an empty collection
    #[must_use]
    pub fn new() -> Self {
        Self {
            elements: IndexMap::new(),
        }
    }

    /// Append `element`, replacing any element with the same id in place
    ///
    /// Returns `true` when the id was not present before.
    pub fn append(&mut self, element: T) -> bool {
        self.elements.insert(element.id(), element).is_none()
    }

    /// Insert `element` at `index`, or move an existing element with the same id there
    pub fn insert(&mut self, index: usize, element: T) {
        let (current, _) = self.elements.insert_full(element.id(), element);
        let last = self.elements.len() - 1;
        let target = index.min(last);
        if current != target {
            self.elements.move_index(current, target);
        }
    }

    /// Look up an element by id
    #[must_use]
    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.elements.get(id)
    }

    /// Look up an element by id for mutation
    pub fn get_mut(&mut self, id: &T::Id) -> Option<&mut T> {
        self.elements.get_mut(id)
    }

    /// Remove an element by id, keeping the order of the rest
    pub fn remove(&mut self, id: &T::Id) -> Option<T> {
        self.elements.shift_remove(id)
    }

    /// Whether an element with `id` exists
    #[must_use]
    pub fn contains(&self, id: &T::Id) -> bool {
        self.elements.contains_key(id)
    }

    /// Identifiers in order
    pub fn ids(&self) -> impl Iterator<Item = &T::Id> {
        self.elements.keys()
    }

    /// Elements in order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.elements.values()
    }

    /// Element at a position
    #[must_use]
    pub fn get_index(&self, index: usize) -> Option<&T> {
        self.elements.get_index(index).map(|(_, element)| element)
    }

    /// Number of elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the collection is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl<T: Identifiable> Default for IdentifiedVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Identifiable + PartialEq> PartialEq for IdentifiedVec<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl<T: Identifiable + Eq> Eq for IdentifiedVec<T> {}

impl<T: Identifiable + fmt::Debug> fmt::Debug for IdentifiedVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: Identifiable> FromIterator<T> for IdentifiedVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut collection = Self::new();
        for element in iter {
            collection.append(element);
        }
        collection
    }
}

impl<'a, T: Identifiable> IntoIterator for &'a IdentifiedVec<T> {
    type Item = &'a T;
    type IntoIter = indexmap::map::Values<'a, T::Id, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.values()
    }
}

/// An action addressed to one element of a collection
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementAction<Id, Action> {
    /// Target element
    pub id: Id,
    /// The element's action
    pub action: Action,
}

impl<Id, Action> ElementAction<Id, Action> {
    /// Address `action` to element `id`
    pub const fn new(id: Id, action: Action) -> Self {
        Self { id, action }
    }
}

/// Cancellation scope of one element, derived from the embedding name and the id
pub(crate) fn element_scope<Id: fmt::Debug>(name: &str, id: &Id) -> CancelId {
    CancelId::new(format!("{name}[{id:?}]"))
}

/// A parent reducer with a child embedded on every element of an [`IdentifiedVec`]
///
/// Created by [`ReducerExt::for_each`](crate::composition::ReducerExt::for_each).
/// The element reducer runs before the parent. Elements that disappear from
/// the collection while handling an action get their effects cancelled.
pub struct ForEach<Parent, Element>
where
    Parent: Reducer,
    Element: Reducer,
    Element::State: Identifiable,
{
    parent: Parent,
    element: Element,
    state: fn(&mut Parent::State) -> &mut IdentifiedVec<Element::State>,
    action: CasePath<
        Parent::Action,
        ElementAction<<Element::State as Identifiable>::Id, Element::Action>,
    >,
}

type ElementId<E> = <<E as Reducer>::State as Identifiable>::Id;

impl<Parent, Element> ForEach<Parent, Element>
where
    Parent: Reducer,
    Element: Reducer<Environment = Parent::Environment>,
    Element::State: Identifiable,
{
    pub(crate) const fn new(
        parent: Parent,
        state: fn(&mut Parent::State) -> &mut IdentifiedVec<Element::State>,
        action: CasePath<Parent::Action, ElementAction<ElementId<Element>, Element::Action>>,
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

impl<Parent, Element> Reducer for ForEach<Parent, Element>
where
    Parent: Reducer,
    Parent::Action: Clone + Send + 'static,
    Element: Reducer<Environment = Parent::Environment>,
    Element::State: Identifiable,
    Element::Action: Send + 'static,
    ElementId<Element>: Send + Sync + 'static,
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
        let ids_before: Vec<ElementId<Element>> = (self.state)(state).ids().cloned().collect();
        let mut effects = SmallVec::new();

        if let Some(ElementAction { id, action: element_action }) =
            self.action.extract(action.clone())
        {
            if let Some(element_state) = (self.state)(state).get_mut(&id) {
                let scope = element_scope(self.action.name(), &id);
                let embed = self.action.embedder();
                effects.extend(
                    self.element
                        .reduce(element_state, element_action, env)
                        .into_iter()
                        .map(|effect| {
                            let id = id.clone();
                            effect
                                .map(move |a| embed(ElementAction::new(id.clone(), a)))
                                .scoped(&scope)
                                .tagged(scope.clone())
                        }),
                );
            } else {
                // Late actions from removed elements are expected; their effects were cancelled.
                tracing::warn!(
                    collection = self.action.name(),
                    id = ?id,
                    "Element action received for an element that does not exist"
                );
            }
        }

        effects.extend(self.parent.reduce(state, action, env));

        let collection = (self.state)(state);
        for id in ids_before {
            if !collection.contains(&id) {
                effects.push(Effect::cancel(element_scope(self.action.name(), &id)));
            }
        }

        effects
    }
}
