use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identity box held by storage entities.
///
/// Projections never carry the box itself; the generated conversion reduces
/// it to the raw key with [`EntityId::value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId<K>(K);

impl<K> EntityId<K> {
    pub const fn new(key: K) -> Self {
        Self(key)
    }

    pub fn value(&self) -> &K {
        &self.0
    }
}

impl<K> From<K> for EntityId<K> {
    fn from(key: K) -> Self {
        Self(key)
    }
}

impl<K: fmt::Display> fmt::Display for EntityId<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
