use crate::record::{CommentRecord, PostRecord, to_primitive};
use parking_lot::Mutex;
use qudpro_common::{
    model::{
        Id, IdIssuer, ModelValidationError, QudproSnowflakeGenerator,
        comment::Comment,
        post::{Post, PostDraft, PostMarker, PostPatch},
    },
    snowflake::WorkerId,
};
use qudpro_feed::source::{PersistedSource, SourceError};
use sqlx::{PgPool, migrate::MigrateError, postgres::PgPoolOptions, query, query_as};
use std::{collections::HashMap, num::NonZeroUsize};
use thiserror::Error;
use time::UtcDateTime;
use tracing::debug;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

pub const MAX_CONNECTIONS: u32 = 5;

const POST_COLUMNS: &str = "
    posts.post_snowflake,
    posts.author_name,
    posts.author_role,
    posts.author_avatar_url,
    posts.title,
    posts.description,
    posts.media_url,
    posts.category,
    posts.like_count,
    posts.created_at
";

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("Running migrations failed: {0}")]
    Migrate(#[from] MigrateError),
}

impl From<DbError> for SourceError {
    fn from(value: DbError) -> Self {
        SourceError::unavailable(value)
    }
}

#[derive(Debug)]
pub struct DbClient {
    pool: PgPool,
    snowflake_generator: Mutex<QudproSnowflakeGenerator>,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool, worker_id: WorkerId) -> Self {
        let snowflake_generator = Mutex::new(IdIssuer::PersistedStore.generator(worker_id));

        Self {
            pool,
            snowflake_generator,
        }
    }

    pub async fn connect(database_url: &str, worker_id: WorkerId) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await?;

        Ok(Self::new(pool, worker_id))
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// The `limit` most recent posts with their comments, newest first.
    pub async fn fetch_posts(&self, limit: NonZeroUsize) -> Result<Vec<Post>> {
        let records = query_as::<_, PostRecord>(&format!(
            "
            SELECT {POST_COLUMNS}
            FROM posts.posts
            ORDER BY posts.created_at DESC
            LIMIT $1
            "
        ))
        .bind(i64::try_from(limit.get()).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let post_snowflakes: Vec<i64> = records
            .iter()
            .map(|record| record.post_snowflake)
            .collect();
        let comment_records = query_as::<_, CommentRecord>(
            "
            SELECT
                comments.post_snowflake,
                comments.author,
                comments.text,
                comments.created_at
            FROM
                posts.comments
            WHERE
                comments.post_snowflake = ANY($1)
            ORDER BY
                comments.created_at DESC,
                comments.comment_id DESC
            ",
        )
        .bind(post_snowflakes.as_slice())
        .fetch_all(&self.pool)
        .await?;

        let mut comments: HashMap<i64, Vec<Comment>> = HashMap::new();
        for record in comment_records {
            comments
                .entry(record.post_snowflake)
                .or_default()
                .push(record.try_into()?);
        }

        let posts = records
            .into_iter()
            .map(|record| {
                let post_comments = comments.remove(&record.post_snowflake).unwrap_or_default();
                record.into_post(post_comments)
            })
            .collect::<Result<_, _>>()?;
        Ok(posts)
    }

    async fn fetch_comments(&self, post_id: Id<PostMarker>) -> Result<Vec<Comment>> {
        let records = query_as::<_, CommentRecord>(
            "
            SELECT
                comments.post_snowflake,
                comments.author,
                comments.text,
                comments.created_at
            FROM
                posts.comments
            WHERE
                comments.post_snowflake = $1
            ORDER BY
                comments.created_at DESC,
                comments.comment_id DESC
            ",
        )
        .bind(u64::from(post_id).cast_signed())
        .fetch_all(&self.pool)
        .await?;

        let comments = records
            .into_iter()
            .map(Comment::try_from)
            .collect::<Result<_, _>>()?;
        Ok(comments)
    }

    pub async fn create_post(&self, draft: &PostDraft) -> Result<Post> {
        let post_snowflake = self.snowflake_generator.lock().generate();

        let record = query_as::<_, PostRecord>(&format!(
            "
            INSERT INTO posts.posts (
                post_snowflake, author_name, author_role, author_avatar_url,
                title, description, media_url, category, like_count, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, $9)
            RETURNING {POST_COLUMNS}
            "
        ))
        .bind(post_snowflake.get().cast_signed())
        .bind(&draft.author.name)
        .bind(&draft.author.role)
        .bind(&draft.author.avatar_url)
        .bind(&draft.content.title)
        .bind(&draft.content.description)
        .bind(&draft.content.media_url)
        .bind(&draft.content.category)
        .bind(to_primitive(UtcDateTime::now()))
        .fetch_one(&self.pool)
        .await?;

        debug!(post = %post_snowflake, "Created post");
        Ok(record.into_post(Vec::new())?)
    }

    /// Returns `None` if there is no post with `post_id`.
    pub async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        patch: PostPatch,
    ) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(&format!(
            "
            UPDATE posts.posts
            SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                media_url = COALESCE($4, media_url),
                category = COALESCE($5, category)
            WHERE
                posts.post_snowflake = $1
            RETURNING {POST_COLUMNS}
            "
        ))
        .bind(u64::from(post_id).cast_signed())
        .bind(patch.title)
        .bind(patch.description)
        .bind(patch.media_url)
        .bind(patch.category)
        .fetch_optional(&self.pool)
        .await?;

        let Some(record) = record else {
            return Ok(None);
        };
        let comments = self.fetch_comments(post_id).await?;
        Ok(Some(record.into_post(comments)?))
    }

    /// Returns whether the post existed.
    pub async fn insert_comment(&self, post_id: Id<PostMarker>, comment: &Comment) -> Result<bool> {
        let result = query(
            "
            INSERT INTO posts.comments (post_snowflake, author, text, created_at)
            SELECT posts.post_snowflake, $2, $3, $4
            FROM posts.posts
            WHERE posts.post_snowflake = $1
            ",
        )
        .bind(u64::from(post_id).cast_signed())
        .bind(&comment.author)
        .bind(comment.text.get())
        .bind(to_primitive(comment.created_at))
        .execute(&self.pool)
        .await?;

        debug!(post = %post_id, inserted = result.rows_affected(), "Inserted comment");
        Ok(result.rows_affected() > 0)
    }

    /// Returns whether a post was deleted.
    pub async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let result = query("DELETE FROM posts.posts WHERE posts.post_snowflake = $1")
            .bind(u64::from(post_id).cast_signed())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl PersistedSource for DbClient {
    async fn list(&self, limit: NonZeroUsize) -> Result<Vec<Post>, SourceError> {
        Ok(self.fetch_posts(limit).await?)
    }

    async fn create(&self, draft: PostDraft) -> Result<Post, SourceError> {
        Ok(self.create_post(&draft).await?)
    }

    async fn update(&self, id: Id<PostMarker>, patch: PostPatch) -> Result<Post, SourceError> {
        self.update_post(id, patch)
            .await?
            .ok_or(SourceError::NotFound(id))
    }

    async fn delete(&self, id: Id<PostMarker>) -> Result<(), SourceError> {
        if self.delete_post(id).await? {
            Ok(())
        } else {
            Err(SourceError::NotFound(id))
        }
    }

    async fn add_comment(&self, id: Id<PostMarker>, comment: Comment) -> Result<(), SourceError> {
        if self.insert_comment(id, &comment).await? {
            Ok(())
        } else {
            Err(SourceError::NotFound(id))
        }
    }
}
