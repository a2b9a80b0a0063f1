//! Storage entities of the blog fixture.
//!
//! Single relations hold the related row directly; collections are
//! [`Referrers`] handles that query the store only when iterated, which is
//! what lets `User -> posts -> author -> posts` close its cycle lazily.

pub use crate::store::Referrers;
pub use chrono::NaiveDateTime;
pub use projex_runtime::EntityId;
pub use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct User {
    pub id: EntityId<i64>,
    pub name: String,
    pub password_hash: String,
    pub posts: Referrers<Post>,
    pub comments: Referrers<Comment>,
}

#[derive(Debug, Clone)]
pub struct Post {
    pub id: EntityId<i64>,
    pub author: Arc<User>,
    pub content: String,
    pub comments: Referrers<Comment>,
    pub likes: Referrers<Like>,
}

#[derive(Debug, Clone)]
pub struct Comment {
    pub id: EntityId<i64>,
    pub post: Arc<Post>,
    pub user: Arc<User>,
    pub content: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct Like {
    pub id: EntityId<i64>,
    pub post: Arc<Post>,
    pub user: Arc<User>,
}

/// A row whose related like may have been deleted
#[derive(Debug, Clone)]
pub struct NullableLike {
    pub id: EntityId<i64>,
    pub like: Option<Arc<Like>>,
}

#[derive(Debug, Clone)]
pub struct Tag {
    pub id: EntityId<i64>,
    pub label: String,
}
