use crate::uploads::{UploadDirectory, UploadError, UploadedFile, remove_stored_file};
use snsserver_common::{
    model::{
        Id,
        member::Username,
        post::{NewPost, Post, PostContent, PostMarker, PostResponse},
    },
    store::{LikeCounter, MemberDirectory, PostStore, PostTransaction, StoreError},
};
use std::sync::Arc;
use thiserror::Error;
use time::{Duration, UtcDateTime};
use tracing::{info, warn};

pub type Result<T, E = PostServiceError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum PostServiceError {
    #[error("Member {0} was not found.")]
    MemberNotFound(Username),
    #[error("Post with id {0} was not found.")]
    PostNotFound(Id<PostMarker>),
    #[error("Member {username} does not own post {post_id}.")]
    Forbidden {
        post_id: Id<PostMarker>,
        username: Username,
    },
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Create, read, update and delete posts on behalf of an authenticated member.
///
/// Each mutation runs in its own store transaction. Files are written before the transaction
/// commits, so a failed commit can leave an unreferenced file in the upload directory.
#[derive(Debug)]
pub struct PostService<S> {
    store: Arc<S>,
    uploads: UploadDirectory,
}

impl<S> PostService<S>
where
    S: PostStore + MemberDirectory + LikeCounter,
{
    #[must_use]
    pub fn new(store: Arc<S>, uploads: UploadDirectory) -> Self {
        Self { store, uploads }
    }

    pub async fn create_post(
        &self,
        username: &Username,
        content: PostContent,
        file: Option<UploadedFile>,
    ) -> Result<PostResponse> {
        let author = self
            .store
            .fetch_member_by_username(username)
            .await?
            .ok_or_else(|| PostServiceError::MemberNotFound(username.clone()))?;

        self.uploads.ensure().await?;
        let file_path = match non_empty(file) {
            Some(file) => Some(self.uploads.store(&file).await?),
            None => None,
        };

        let new_post = NewPost {
            author,
            title: content.title,
            content: content.content,
            file_path,
            created_at: creation_time(UtcDateTime::now()),
        };

        let mut transaction = self.store.begin().await?;
        let post = transaction.insert_post(&new_post).await?;
        transaction.commit().await?;

        info!(post_id = %post.id, %username, "Created post");
        self.respond(post).await
    }

    pub async fn get_all_posts(&self) -> Result<Vec<PostResponse>> {
        let posts = self.store.fetch_all_posts().await?;

        let mut responses = Vec::with_capacity(posts.len());
        for post in posts {
            responses.push(self.respond(post).await?);
        }

        Ok(responses)
    }

    pub async fn get_post(&self, post_id: Id<PostMarker>) -> Result<PostResponse> {
        let post = self
            .store
            .fetch_post(post_id)
            .await?
            .ok_or(PostServiceError::PostNotFound(post_id))?;

        self.respond(post).await
    }

    /// Replaces title and content. A non-empty `file` replaces the attachment; the superseded
    /// file is removed once the change is committed.
    pub async fn update_post(
        &self,
        username: &Username,
        post_id: Id<PostMarker>,
        content: PostContent,
        file: Option<UploadedFile>,
    ) -> Result<PostResponse> {
        let mut transaction = self.store.begin().await?;
        let mut post = fetch_owned(&mut transaction, username, post_id).await?;

        let superseded_file = match non_empty(file) {
            Some(file) => post.file_path.replace(self.uploads.store(&file).await?),
            None => None,
        };
        post.title = content.title;
        post.content = content.content;

        transaction.update_post(&post).await?;
        transaction.commit().await?;

        info!(%post_id, %username, "Updated post");
        if let Some(path) = superseded_file {
            remove_stored_file(&path).await;
        }

        self.respond(post).await
    }

    pub async fn delete_post(&self, username: &Username, post_id: Id<PostMarker>) -> Result<()> {
        let mut transaction = self.store.begin().await?;
        let post = fetch_owned(&mut transaction, username, post_id).await?;

        transaction.delete_post(post_id).await?;
        transaction.commit().await?;

        info!(%post_id, %username, "Deleted post");
        if let Some(path) = &post.file_path {
            remove_stored_file(path).await;
        }

        Ok(())
    }

    async fn respond(&self, post: Post) -> Result<PostResponse> {
        let like_count = self.store.count_likes(post.id).await?;
        Ok(post.into_response(like_count))
    }
}

async fn fetch_owned<T: PostTransaction>(
    transaction: &mut T,
    username: &Username,
    post_id: Id<PostMarker>,
) -> Result<Post> {
    let post = transaction
        .fetch_post(post_id)
        .await?
        .ok_or(PostServiceError::PostNotFound(post_id))?;

    if post.is_owned_by(username) {
        Ok(post)
    } else {
        Err(PostServiceError::Forbidden {
            post_id,
            username: username.clone(),
        })
    }
}

/// Postgres keeps timestamps to the microsecond; stamping at that precision means the
/// returned post matches every later read.
fn creation_time(now: UtcDateTime) -> UtcDateTime {
    now - Duration::nanoseconds(i64::from(now.nanosecond() % 1_000))
}

fn non_empty(file: Option<UploadedFile>) -> Option<UploadedFile> {
    match file {
        Some(file) if file.is_empty() => {
            warn!(filename = %file.original_filename, "Received empty file from request");
            None
        }
        file => file,
    }
}
