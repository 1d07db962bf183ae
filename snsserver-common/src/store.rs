//! Collaborators the post service is written against.
//!
//! The Postgres client implements all of these; tests use an in-memory store.

use crate::model::{
    Id,
    member::{Member, Username},
    post::{NewPost, Post, PostMarker},
};
use std::error::Error as StdError;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct StoreError(Box<dyn StdError + Send + Sync>);

impl StoreError {
    pub fn new(source: impl StdError + Send + Sync + 'static) -> Self {
        Self(Box::new(source))
    }
}

pub trait MemberDirectory: Send + Sync {
    fn fetch_member_by_username(
        &self,
        username: &Username,
    ) -> impl Future<Output = StoreResult<Option<Member>>> + Send;
}

pub trait LikeCounter: Send + Sync {
    fn count_likes(
        &self,
        post_id: Id<PostMarker>,
    ) -> impl Future<Output = StoreResult<u64>> + Send;
}

pub trait PostStore: Send + Sync {
    type Transaction: PostTransaction;

    fn fetch_post(
        &self,
        post_id: Id<PostMarker>,
    ) -> impl Future<Output = StoreResult<Option<Post>>> + Send;

    fn fetch_all_posts(&self) -> impl Future<Output = StoreResult<Vec<Post>>> + Send;

    fn begin(&self) -> impl Future<Output = StoreResult<Self::Transaction>> + Send;
}

/// A unit of work over posts. Nothing is visible to other readers until [`commit`] succeeds;
/// dropping the transaction discards every write made through it.
///
/// [`commit`]: PostTransaction::commit
pub trait PostTransaction: Send {
    /// Fetches a post for modification. The store may hold a lock on it until the transaction
    /// ends.
    fn fetch_post(
        &mut self,
        post_id: Id<PostMarker>,
    ) -> impl Future<Output = StoreResult<Option<Post>>> + Send;

    /// Persists a new post and returns it with its store-assigned id.
    fn insert_post(&mut self, post: &NewPost) -> impl Future<Output = StoreResult<Post>> + Send;

    fn update_post(&mut self, post: &Post) -> impl Future<Output = StoreResult<()>> + Send;

    fn delete_post(
        &mut self,
        post_id: Id<PostMarker>,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn commit(self) -> impl Future<Output = StoreResult<()>> + Send;
}
