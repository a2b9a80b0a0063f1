//! In-memory blog store backed by `DashMap` tables

use async_trait::async_trait;
use chrono::NaiveDateTime;
use dashmap::DashMap;
use projex_runtime::{BoxError, EntityId, Session};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use thiserror::Error;

use crate::entities::{Comment, Like, Post, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Blog store is offline")]
    Offline,

    #[error("Blog store is closed")]
    Closed,
}

/// A table that [`Referrers`] handles can query
pub trait Table: Send + Sync + Sized + 'static {
    const NAME: &'static str;

    fn rows(store: &BlogStore) -> &DashMap<i64, Arc<Self>>;
}

impl Table for Post {
    const NAME: &'static str = "posts";

    fn rows(store: &BlogStore) -> &DashMap<i64, Arc<Self>> {
        &store.posts
    }
}

impl Table for Comment {
    const NAME: &'static str = "comments";

    fn rows(store: &BlogStore) -> &DashMap<i64, Arc<Self>> {
        &store.comments
    }
}

impl Table for Like {
    const NAME: &'static str = "likes";

    fn rows(store: &BlogStore) -> &DashMap<i64, Arc<Self>> {
        &store.likes
    }
}

/// Lazy handle on the rows of `T` that point back at one owner.
///
/// Nothing is read until the handle is iterated; every iteration is one fetch
/// against the store and yields rows in id order.
pub struct Referrers<T> {
    store: Weak<BlogStore>,
    owner: i64,
    column: fn(&T) -> i64,
}

impl<T: Table> Referrers<T> {
    fn new(store: &Arc<BlogStore>, owner: i64, column: fn(&T) -> i64) -> Self {
        Self {
            store: Arc::downgrade(store),
            owner,
            column,
        }
    }

    /// Read the matching rows now.
    ///
    /// A handle that outlived its store reads no rows. Loads go through a
    /// [`StoreSession`], which refuses to run once the store is gone, so this
    /// only shows up when a handle is iterated directly.
    pub fn fetch(&self) -> Vec<Arc<T>> {
        let Some(store) = self.store.upgrade() else {
            return Vec::new();
        };
        store.fetches.fetch_add(1, Ordering::SeqCst);

        let mut rows: Vec<(i64, Arc<T>)> = T::rows(&store)
            .iter()
            .filter(|entry| (self.column)(&**entry.value()) == self.owner)
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();
        rows.sort_by_key(|(id, _)| *id);

        tracing::trace!(table = T::NAME, owner = self.owner, rows = rows.len(), "fetched referrers");
        rows.into_iter().map(|(_, row)| row).collect()
    }
}

impl<T: Table> IntoIterator for Referrers<T> {
    type Item = Arc<T>;
    type IntoIter = std::vec::IntoIter<Arc<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.fetch().into_iter()
    }
}

impl<T> Clone for Referrers<T> {
    fn clone(&self) -> Self {
        Self {
            store: Weak::clone(&self.store),
            owner: self.owner,
            column: self.column,
        }
    }
}

impl<T> fmt::Debug for Referrers<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Referrers").field("owner", &self.owner).finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct BlogStore {
    users: DashMap<i64, Arc<User>>,
    posts: DashMap<i64, Arc<Post>>,
    comments: DashMap<i64, Arc<Comment>>,
    likes: DashMap<i64, Arc<Like>>,
    fetches: AtomicUsize,
}

impl BlogStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_user(self: &Arc<Self>, id: i64, name: &str) -> Arc<User> {
        let user = Arc::new(User {
            id: EntityId::new(id),
            name: name.to_string(),
            password_hash: format!("argon2:{}", name.len()),
            posts: Referrers::new(self, id, |post: &Post| *post.author.id.value()),
            comments: Referrers::new(self, id, |comment: &Comment| *comment.user.id.value()),
        });
        self.users.insert(id, Arc::clone(&user));
        user
    }

    pub fn add_post(self: &Arc<Self>, id: i64, author: &Arc<User>, content: &str) -> Arc<Post> {
        let post = Arc::new(Post {
            id: EntityId::new(id),
            author: Arc::clone(author),
            content: content.to_string(),
            comments: Referrers::new(self, id, |comment: &Comment| *comment.post.id.value()),
            likes: Referrers::new(self, id, |like: &Like| *like.post.id.value()),
        });
        self.posts.insert(id, Arc::clone(&post));
        post
    }

    pub fn add_comment(
        &self,
        id: i64,
        post: &Arc<Post>,
        user: &Arc<User>,
        content: &str,
        created_at: NaiveDateTime,
    ) -> Arc<Comment> {
        let comment = Arc::new(Comment {
            id: EntityId::new(id),
            post: Arc::clone(post),
            user: Arc::clone(user),
            content: content.to_string(),
            created_at,
        });
        self.comments.insert(id, Arc::clone(&comment));
        comment
    }

    pub fn add_like(&self, id: i64, post: &Arc<Post>, user: &Arc<User>) -> Arc<Like> {
        let like = Arc::new(Like {
            id: EntityId::new(id),
            post: Arc::clone(post),
            user: Arc::clone(user),
        });
        self.likes.insert(id, Arc::clone(&like));
        like
    }

    pub fn user(&self, id: i64) -> Option<Arc<User>> {
        self.users.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of referrer queries run so far
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

/// Session over the blog store that counts transactions and can be taken
/// offline to simulate storage failures
#[derive(Debug)]
pub struct StoreSession {
    store: Weak<BlogStore>,
    transactions: AtomicUsize,
    offline: AtomicBool,
}

impl StoreSession {
    pub fn new(store: &Arc<BlogStore>) -> Self {
        Self {
            store: Arc::downgrade(store),
            transactions: AtomicUsize::new(0),
            offline: AtomicBool::new(false),
        }
    }

    pub fn transactions(&self) -> usize {
        self.transactions.load(Ordering::SeqCst)
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl Session for StoreSession {
    async fn transaction<T, F>(&self, work: F) -> Result<T, BoxError>
    where
        F: FnOnce() -> T + Send,
        T: Send,
    {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Offline.into());
        }
        // Held for the whole transaction so referrer handles see a live store
        let Some(_store) = self.store.upgrade() else {
            return Err(StoreError::Closed.into());
        };

        self.transactions.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(work())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_referrers_fetch_in_id_order() {
        let store = BlogStore::new();
        let user = store.add_user(1, "TestUser");
        store.add_post(12, &user, "second");
        store.add_post(3, &user, "first");

        let contents: Vec<_> = user.posts.clone().into_iter().map(|post| post.content.clone()).collect();
        assert_eq!(contents, vec!["first", "second"]);
        assert_eq!(store.fetches(), 1);
    }

    #[test]
    fn test_referrers_outlive_store() {
        let store = BlogStore::new();
        let user = store.add_user(1, "TestUser");
        store.add_post(1, &user, "hello");
        drop(store);

        assert!(user.posts.fetch().is_empty());
    }

    #[tokio::test]
    async fn test_session_refuses_closed_store() {
        let store = BlogStore::new();
        let session = StoreSession::new(&store);
        assert_eq!(session.transaction(|| 1).await.unwrap(), 1);

        drop(store);
        let err = session.transaction(|| 2).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<StoreError>(), Some(StoreError::Closed)));
        assert_eq!(session.transactions(), 1);
    }
}
