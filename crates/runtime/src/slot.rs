//! Relation slots - explicit tri-state holders for lazily loaded relations
//!
//! A slot is created during conversion with the related source value(s) the
//! entity exposed at that moment. Nothing is materialized until the slot's
//! load operation runs; from then on the projection is memoized.

use serde::ser::{Error as _, Serialize, Serializer};
use std::fmt;

use crate::error::{RelationError, RelationResult};
use crate::session::Session;

/// Loading state of one relation slot
#[derive(Debug, Clone, PartialEq)]
pub enum SlotState<P> {
    /// Initial state; reading the value is a fault
    Unloaded,
    /// The session is materializing the relation
    Loading,
    /// Terminal for the slot; the value is memoized
    Loaded(Box<P>),
}

impl<P> SlotState<P> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

/// Placeholder for one associated entity, optional entity or sequence of
/// entities on a projection.
///
/// `S` is the source captured from the entity at conversion time and `P` the
/// projection value it converts into.
#[derive(Clone)]
pub struct RelationSlot<S, P> {
    name: &'static str,
    source: S,
    state: SlotState<P>,
}

impl<S, P> RelationSlot<S, P> {
    pub fn new(name: &'static str, source: S) -> Self {
        Self {
            name,
            source,
            state: SlotState::Unloaded,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state(&self) -> &SlotState<P> {
        &self.state
    }

    /// The related value(s) captured at conversion time
    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn is_loaded(&self) -> bool {
        self.state.is_loaded()
    }

    /// The memoized projection, or an `Uninitialized` fault
    pub fn get(&self) -> RelationResult<&P> {
        match &self.state {
            SlotState::Loaded(value) => Ok(&**value),
            SlotState::Unloaded | SlotState::Loading => Err(RelationError::uninitialized(self.name)),
        }
    }

    pub fn get_mut(&mut self) -> RelationResult<&mut P> {
        match &mut self.state {
            SlotState::Loaded(value) => Ok(&mut **value),
            SlotState::Unloaded | SlotState::Loading => Err(RelationError::uninitialized(self.name)),
        }
    }

    /// Materialize the slot through `session`.
    ///
    /// The first call converts a clone of the captured source inside one
    /// session transaction. Later calls return the memoized value without
    /// touching the session. A failed fetch leaves the slot unloaded.
    pub async fn load<X, F>(&mut self, session: &X, convert: F) -> RelationResult<&mut P>
    where
        X: Session,
        S: Clone + Send,
        P: Send,
        F: FnOnce(S) -> P + Send,
    {
        if self.is_loaded() {
            return self.get_mut();
        }

        let source = self.source.clone();
        self.state = SlotState::Loading;
        tracing::trace!(relation = self.name, "loading relation");

        match session.transaction(move || convert(source)).await {
            Ok(value) => {
                self.state = SlotState::Loaded(Box::new(value));
                self.get_mut()
            }
            Err(err) => {
                self.state = SlotState::Unloaded;
                tracing::debug!(relation = self.name, error = %err, "relation fetch failed");
                Err(RelationError::fetch(self.name, err))
            }
        }
    }
}

impl<S, P> RelationSlot<S, Option<P>> {
    /// Unloaded, or loaded with nothing on the other side
    pub fn is_vacant(&self) -> bool {
        match &self.state {
            SlotState::Loaded(value) => value.is_none(),
            SlotState::Unloaded | SlotState::Loading => true,
        }
    }
}

impl<S, P: fmt::Debug> fmt::Debug for RelationSlot<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationSlot")
            .field("name", &self.name)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// A loaded slot serializes as its projection value.
///
/// Generated projections skip unloaded slots with [`is_unloaded`]; serializing
/// one anyway is the same fault as reading it.
impl<S, P: Serialize> Serialize for RelationSlot<S, P> {
    fn serialize<Z>(&self, serializer: Z) -> Result<Z::Ok, Z::Error>
    where
        Z: Serializer,
    {
        match &self.state {
            SlotState::Loaded(value) => value.serialize(serializer),
            SlotState::Unloaded | SlotState::Loading => {
                Err(Z::Error::custom(RelationError::uninitialized(self.name)))
            }
        }
    }
}

/// `skip_serializing_if` predicate for single and many slots
pub fn is_unloaded<S, P>(slot: &RelationSlot<S, P>) -> bool {
    !slot.is_loaded()
}

/// `skip_serializing_if` predicate for optional slots
pub fn is_vacant<S, P>(slot: &RelationSlot<S, Option<P>>) -> bool {
    slot.is_vacant()
}
