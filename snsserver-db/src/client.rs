use crate::record::{AuthenticationRecord, MemberRecord, PostRecord, count};
use snsserver_common::{
    model::{
        Id, ModelValidationError,
        auth::{AuthTokenHash, Authentication},
        member::{Member, Username},
        post::{NewPost, Post, PostMarker},
    },
    store::{LikeCounter, MemberDirectory, PostStore, PostTransaction, StoreError, StoreResult},
};
use sqlx::{
    PgConnection, PgPool, Postgres, migrate::MigrateError, query, query_as, query_scalar,
};
use std::path::{Path, PathBuf};
use thiserror::Error;
use time::{PrimitiveDateTime, UtcDateTime};
use tracing::debug;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("File path is not valid UTF-8: {0:?}")]
    NonUtf8Path(PathBuf),
    #[error(transparent)]
    Migrate(#[from] MigrateError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        StoreError::new(value)
    }
}

macro_rules! select_posts {
    ($tail:literal) => {
        concat!(
            "
            SELECT
                posts.post_id,
                posts.title,
                posts.content,
                posts.file_path,
                posts.created_at,
                members.member_id,
                members.username,
                (
                    SELECT COUNT(*)
                    FROM posts.comments
                    WHERE comments.post_id = posts.post_id
                ) AS comment_count
            FROM
                posts.posts
                JOIN members.members ON members.member_id = posts.member_id
            ",
            $tail
        )
    };
}

#[derive(Clone, Debug)]
pub struct DbClient {
    pool: PgPool,
}

/// Post writes made through [`PostStore::begin`]. Rolled back when dropped uncommitted.
pub struct DbTransaction(sqlx::Transaction<'static, Postgres>);

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!().run(&self.pool).await?;
        Ok(())
    }

    pub async fn fetch_auth(
        &self,
        token_hash: &AuthTokenHash,
    ) -> Result<Option<Authentication>> {
        let record = query_as::<_, AuthenticationRecord>(
            "
            SELECT
                members.member_id,
                members.username,
                tokens.token_hash,
                tokens.created_at,
                tokens.expires_after_seconds
            FROM
                auth.tokens
                JOIN members.members ON members.member_id = tokens.member_id
            WHERE
                tokens.token_hash = $1
            ",
        )
        .bind(&token_hash.0[..])
        .fetch_optional(&self.pool)
        .await?;

        let authentication = record.map(Authentication::try_from).transpose()?;
        Ok(authentication)
    }

    async fn fetch_member(&self, username: &Username) -> Result<Option<Member>> {
        let record = query_as::<_, MemberRecord>(
            "
            SELECT
                members.member_id,
                members.username
            FROM
                members.members
            WHERE
                members.username = $1
            ",
        )
        .bind(username.get())
        .fetch_optional(&self.pool)
        .await?;

        let member = record.map(Member::try_from).transpose()?;
        Ok(member)
    }

    async fn fetch_like_count(&self, post_id: Id<PostMarker>) -> Result<u64> {
        let likes = query_scalar::<_, i64>(
            "
            SELECT COUNT(*)
            FROM posts.likes
            WHERE likes.post_id = $1
            ",
        )
        .bind(post_id.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(count(likes)?)
    }

    async fn fetch_posts(&self) -> Result<Vec<Post>> {
        let records = query_as::<_, PostRecord>(select_posts!("ORDER BY posts.post_id"))
            .fetch_all(&self.pool)
            .await?;

        let posts = records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()?;
        Ok(posts)
    }
}

async fn fetch_post(
    connection: &mut PgConnection,
    post_id: Id<PostMarker>,
    lock: bool,
) -> Result<Option<Post>> {
    let sql = if lock {
        select_posts!("WHERE posts.post_id = $1 FOR UPDATE OF posts")
    } else {
        select_posts!("WHERE posts.post_id = $1")
    };

    let record = query_as::<_, PostRecord>(sql)
        .bind(post_id.get())
        .fetch_optional(connection)
        .await?;

    let post = record.map(Post::try_from).transpose()?;
    Ok(post)
}

fn path_str(path: Option<&Path>) -> Result<Option<&str>> {
    path.map(|path| {
        path.to_str()
            .ok_or_else(|| DbError::NonUtf8Path(path.to_path_buf()))
    })
    .transpose()
}

fn primitive(time: UtcDateTime) -> PrimitiveDateTime {
    PrimitiveDateTime::new(time.date(), time.time())
}

impl DbTransaction {
    async fn insert(&mut self, post: &NewPost) -> Result<Post> {
        let post_id = query_scalar::<_, i64>(
            "
            INSERT INTO posts.posts (member_id, title, content, file_path, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING posts.post_id
            ",
        )
        .bind(post.author.id.get())
        .bind(&post.title)
        .bind(&post.content)
        .bind(path_str(post.file_path.as_deref())?)
        .bind(primitive(post.created_at))
        .fetch_one(&mut *self.0)
        .await?;

        debug!(post_id, "Inserted post row");

        Ok(Post {
            id: post_id.into(),
            author: post.author.clone(),
            title: post.title.clone(),
            content: post.content.clone(),
            file_path: post.file_path.clone(),
            created_at: post.created_at,
            comment_count: 0,
        })
    }

    async fn update(&mut self, post: &Post) -> Result<()> {
        query(
            "
            UPDATE posts.posts
            SET title = $2, content = $3, file_path = $4
            WHERE posts.post_id = $1
            ",
        )
        .bind(post.id.get())
        .bind(&post.title)
        .bind(&post.content)
        .bind(path_str(post.file_path.as_deref())?)
        .execute(&mut *self.0)
        .await?;

        Ok(())
    }

    async fn delete(&mut self, post_id: Id<PostMarker>) -> Result<()> {
        query("DELETE FROM posts.posts WHERE posts.post_id = $1")
            .bind(post_id.get())
            .execute(&mut *self.0)
            .await?;

        Ok(())
    }
}

impl MemberDirectory for DbClient {
    async fn fetch_member_by_username(
        &self,
        username: &Username,
    ) -> StoreResult<Option<Member>> {
        Ok(self.fetch_member(username).await?)
    }
}

impl LikeCounter for DbClient {
    async fn count_likes(&self, post_id: Id<PostMarker>) -> StoreResult<u64> {
        Ok(self.fetch_like_count(post_id).await?)
    }
}

impl PostStore for DbClient {
    type Transaction = DbTransaction;

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> StoreResult<Option<Post>> {
        let mut connection = self.pool.acquire().await.map_err(DbError::from)?;
        Ok(fetch_post(&mut connection, post_id, false).await?)
    }

    async fn fetch_all_posts(&self) -> StoreResult<Vec<Post>> {
        Ok(self.fetch_posts().await?)
    }

    async fn begin(&self) -> StoreResult<DbTransaction> {
        let transaction = self.pool.begin().await.map_err(DbError::from)?;
        Ok(DbTransaction(transaction))
    }
}

impl PostTransaction for DbTransaction {
    async fn fetch_post(&mut self, post_id: Id<PostMarker>) -> StoreResult<Option<Post>> {
        Ok(fetch_post(&mut self.0, post_id, true).await?)
    }

    async fn insert_post(&mut self, post: &NewPost) -> StoreResult<Post> {
        Ok(self.insert(post).await?)
    }

    async fn update_post(&mut self, post: &Post) -> StoreResult<()> {
        Ok(self.update(post).await?)
    }

    async fn delete_post(&mut self, post_id: Id<PostMarker>) -> StoreResult<()> {
        Ok(self.delete(post_id).await?)
    }

    async fn commit(self) -> StoreResult<()> {
        self.0.commit().await.map_err(DbError::from)?;
        Ok(())
    }
}
