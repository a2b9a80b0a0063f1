//! # projex-runtime
//!
//! Runtime half of generated projections. Every generated projection type
//! implements [`Projection`]; its relation fields are [`RelationSlot`]s that
//! start unloaded and are materialized only through [`Projection::with`].
//!
//! ```ignore
//! let mut user = UserProjection::from_entity(&user);
//! user.with(&session, |r| r.posts_with(|p| p.comments())).await?;
//! let json = serde_json::to_string(&user)?;
//! ```

pub mod attributes;
pub mod error;
pub mod identity;
pub mod portable;
pub mod projection;
pub mod session;
pub mod slot;

pub use attributes::Attributes;
pub use error::{BoxError, RelationError, RelationResult};
pub use identity::EntityId;
pub use portable::Portable;
pub use projection::{descend_each, render, Descent, Projection};
pub use session::{InlineSession, Session};
pub use slot::{RelationSlot, SlotState};

// Generated code reaches these through the runtime path so that callers do
// not need their own direct dependencies.
pub use async_trait::async_trait;
pub use serde;
