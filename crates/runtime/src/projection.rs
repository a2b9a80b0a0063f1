//! Projection trait and caller-directed relation descent
//!
//! Relations are only ever loaded because the caller asked for them: a
//! selection built from the projection's selector namespace names the slots to
//! load, and each selected slot carries the nested selection to run against
//! the freshly converted related projection(s). The selection is a finite
//! tree, so every traversal ends even when the entity graph has cycles.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{RelationError, RelationResult};
use crate::session::Session;

/// Current depth of a descent and its optional limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Descent {
    depth: usize,
    limit: Option<usize>,
}

impl Descent {
    /// No depth limit; the selection alone bounds the traversal
    pub const fn unbounded() -> Self {
        Self {
            depth: 0,
            limit: None,
        }
    }

    /// Refuse to load relations more than `max_depth` hops from the root
    pub const fn limited(max_depth: usize) -> Self {
        Self {
            depth: 0,
            limit: Some(max_depth),
        }
    }

    pub const fn depth(&self) -> usize {
        self.depth
    }

    pub const fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Step into `relation`, failing if that goes past the limit
    pub fn enter(self, relation: &'static str) -> RelationResult<Self> {
        let depth = self.depth + 1;
        match self.limit {
            Some(limit) if depth > limit => Err(RelationError::DepthExceeded { relation, limit }),
            _ => Ok(Self { depth, ..self }),
        }
    }
}

/// A generated, storage-independent snapshot of one entity
#[async_trait]
pub trait Projection: Sized + Send + Sync {
    /// Storage entity this projection mirrors
    type Entity;

    /// Selector namespace: which relation slots to load, and how far to descend
    type Select: Default + Send + Sync;

    /// Copy scalars from `entity`, leaving every relation slot unloaded
    fn from_entity(entity: &Self::Entity) -> Self;

    /// Load the selected relation slots, descending into each loaded value
    async fn apply<X>(&mut self, session: &X, select: &Self::Select, descent: Descent) -> RelationResult<()>
    where
        X: Session;

    /// Build a selection from `block` and load it, returning `self` for chaining
    async fn with<X, F>(&mut self, session: &X, block: F) -> RelationResult<&mut Self>
    where
        X: Session,
        F: FnOnce(Self::Select) -> Self::Select + Send,
    {
        let select = block(Self::Select::default());
        self.apply(session, &select, Descent::unbounded()).await?;
        Ok(self)
    }

    /// Like [`Projection::with`], but fails instead of loading any relation
    /// more than `max_depth` hops away
    async fn with_limit<X, F>(&mut self, session: &X, max_depth: usize, block: F) -> RelationResult<&mut Self>
    where
        X: Session,
        F: FnOnce(Self::Select) -> Self::Select + Send,
    {
        let select = block(Self::Select::default());
        self.apply(session, &select, Descent::limited(max_depth)).await?;
        Ok(self)
    }
}

/// Run `select` against every loaded projection in order, one at a time
pub async fn descend_each<'a, P, X, I>(
    items: I,
    session: &X,
    select: &P::Select,
    descent: Descent,
) -> RelationResult<()>
where
    P: Projection + 'a,
    X: Session,
    I: IntoIterator<Item = &'a mut P>,
    I::IntoIter: Send,
{
    for item in items {
        item.apply(session, select, descent).await?;
    }
    Ok(())
}

/// Render a projection with every loaded slot and any attributes
pub fn render<P: Serialize>(projection: &P) -> RelationResult<serde_json::Value> {
    Ok(serde_json::to_value(projection)?)
}
