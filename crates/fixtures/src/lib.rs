//! # projex-fixtures
//!
//! A small blog model with projections generated from `schema/blog.yaml` by
//! the build script. Used to exercise generated code against a real store.

pub mod entities;
pub mod store;

/// Projections generated at build time
pub mod projections {
    include!(concat!(env!("OUT_DIR"), "/projections.rs"));
}

pub use store::{BlogStore, StoreError, StoreSession};
