//! Error types for relation loading

use thiserror::Error;

/// Boxed error raised by the storage side of a load
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for relation operations
pub type RelationResult<T> = Result<T, RelationError>;

#[derive(Debug, Error)]
pub enum RelationError {
    /// The relation was read before its load operation ever ran
    #[error("Relation '{relation}' is not initialized; load it with `with` first")]
    Uninitialized { relation: &'static str },

    /// The storage session failed while materializing related entities
    #[error("Failed to fetch relation '{relation}': {source}")]
    Fetch {
        relation: &'static str,
        #[source]
        source: BoxError,
    },

    /// A bounded descent tried to go deeper than its limit
    #[error("Loading relation '{relation}' would exceed the descent limit of {limit}")]
    DepthExceeded { relation: &'static str, limit: usize },

    #[error("Failed to render projection: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RelationError {
    pub fn uninitialized(relation: &'static str) -> Self {
        Self::Uninitialized { relation }
    }

    pub fn fetch(relation: &'static str, source: BoxError) -> Self {
        Self::Fetch { relation, source }
    }

    /// Name of the relation the error belongs to, empty for rendering errors
    pub fn relation(&self) -> &'static str {
        match self {
            Self::Uninitialized { relation }
            | Self::Fetch { relation, .. }
            | Self::DepthExceeded { relation, .. } => relation,
            Self::Serialization(_) => "",
        }
    }

    /// The storage error exactly as the session raised it
    pub fn into_fetch_source(self) -> Option<BoxError> {
        match self {
            Self::Fetch { source, .. } => Some(source),
            _ => None,
        }
    }
}
