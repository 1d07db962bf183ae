use snsserver_common::model::{
    ModelValidationError,
    auth::Authentication,
    member::{Member, Username},
    post::Post,
};
use sqlx::FromRow;
use std::path::PathBuf;
use time::{Duration, PrimitiveDateTime};

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct MemberRecord {
    pub member_id: i64,
    pub username: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PostRecord {
    pub post_id: i64,
    pub title: String,
    pub content: String,
    pub file_path: Option<String>,
    pub created_at: PrimitiveDateTime,
    pub member_id: i64,
    pub username: String,
    pub comment_count: i64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct AuthenticationRecord {
    pub member_id: i64,
    pub username: String,
    pub token_hash: Vec<u8>,
    pub created_at: PrimitiveDateTime,
    pub expires_after_seconds: Option<i64>,
}

pub(crate) fn count(value: i64) -> Result<u64, ModelValidationError> {
    u64::try_from(value).map_err(|_| ModelValidationError::NegativeCount(value))
}

impl TryFrom<MemberRecord> for Member {
    type Error = ModelValidationError;

    fn try_from(value: MemberRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.member_id.into(),
            username: Username::new(value.username)?,
        })
    }
}

impl TryFrom<PostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.post_id.into(),
            author: Member {
                id: value.member_id.into(),
                username: Username::new(value.username)?,
            },
            title: value.title,
            content: value.content,
            file_path: value.file_path.map(PathBuf::from),
            created_at: value.created_at.as_utc(),
            comment_count: count(value.comment_count)?,
        })
    }
}

impl TryFrom<AuthenticationRecord> for Authentication {
    type Error = ModelValidationError;

    fn try_from(value: AuthenticationRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            member: Member {
                id: value.member_id.into(),
                username: Username::new(value.username)?,
            },
            token_hash: value.token_hash.try_into()?,
            created_at: value.created_at.as_utc(),
            expires_after: value
                .expires_after_seconds
                .map(|seconds| Duration::seconds(seconds).try_into())
                .transpose()?,
        })
    }
}
