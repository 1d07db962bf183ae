use crate::model::{
    Id,
    member::{Member, Username},
};
use serde::Serialize;
use std::path::PathBuf;
use time::{OffsetDateTime, UtcDateTime};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

/// A post as the store holds it.
///
/// `author` is fixed when the post is created. `comment_count` is owned by the comment
/// subsystem and only read here.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub author: Member,
    pub title: String,
    pub content: String,
    pub file_path: Option<PathBuf>,
    pub created_at: UtcDateTime,
    pub comment_count: u64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct NewPost {
    pub author: Member,
    pub title: String,
    pub content: String,
    pub file_path: Option<PathBuf>,
    pub created_at: UtcDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct PostContent {
    pub title: String,
    pub content: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: Id<PostMarker>,
    pub title: String,
    pub content: String,
    pub file_path: Option<PathBuf>,
    pub username: Username,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub like_count: u64,
    pub comment_count: u64,
}

impl Post {
    #[must_use]
    pub fn is_owned_by(&self, username: &Username) -> bool {
        &self.author.username == username
    }

    #[must_use]
    pub fn into_response(self, like_count: u64) -> PostResponse {
        PostResponse {
            id: self.id,
            title: self.title,
            content: self.content,
            file_path: self.file_path,
            username: self.author.username,
            created_at: self.created_at.into(),
            like_count,
            comment_count: self.comment_count,
        }
    }
}
