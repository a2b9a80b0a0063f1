//! Storage session boundary
//!
//! Every relation load crosses into storage exactly once, through
//! [`Session::transaction`]. The work handed over is synchronous: it reads the
//! related values captured on the slot and converts them into projections.

use async_trait::async_trait;

use crate::error::BoxError;

/// The suspension point of a relation load.
///
/// Implementations open whatever context the storage layer needs (a
/// transaction, a connection checkout, a blocking thread) and run `work`
/// inside it. Failures propagate to the caller of `with` unchanged.
#[async_trait]
pub trait Session: Send + Sync {
    async fn transaction<T, F>(&self, work: F) -> Result<T, BoxError>
    where
        F: FnOnce() -> T + Send,
        T: Send;
}

/// Session for entities whose relations are already resolved in memory
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineSession;

#[async_trait]
impl Session for InlineSession {
    async fn transaction<T, F>(&self, work: F) -> Result<T, BoxError>
    where
        F: FnOnce() -> T + Send,
        T: Send,
    {
        Ok(work())
    }
}
