use crate::record::PostRecord;
use parking_lot::Mutex;
use piepmatz_common::model::{
    Id, ModelValidationError, PiepmatzSnowflakeGenerator,
    post::{Post, PostContent, PostMarker},
    user::UserId,
};
use piepmatz_common::snowflake::{ProcessId, SnowflakeTimestampError, WorkerId};
use sqlx::{PgPool, query_as};
use thiserror::Error;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

/// Queries that return post lists never yield more rows than this.
pub const POST_FETCH_LIMIT: i64 = 100;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("Could not generate a post id: {0}")]
    Snowflake(#[from] SnowflakeTimestampError),
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub struct DbClient {
    pool: PgPool,
    snowflake_generator: Mutex<PiepmatzSnowflakeGenerator>,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool, worker_id: WorkerId, process_id: ProcessId) -> Self {
        let snowflake_generator = Mutex::new(PiepmatzSnowflakeGenerator::new(worker_id, process_id));

        Self {
            pool,
            snowflake_generator,
        }
    }

    /// Connects to the database and runs the embedded migrations.
    pub async fn connect(
        database_url: &str,
        worker_id: WorkerId,
        process_id: ProcessId,
    ) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        sqlx::migrate!().run(&pool).await?;

        Ok(Self::new(pool, worker_id, process_id))
    }

    /// The most recent posts across all authors, newest first.
    pub async fn fetch_recent_posts(&self) -> Result<Vec<Post>> {
        let records: Vec<PostRecord> = query_as(
            "
            SELECT
                post_snowflake,
                author_id,
                content,
                created_at
            FROM
                posts
            ORDER BY
                created_at DESC, post_snowflake DESC
            LIMIT $1
            ",
        )
        .bind(POST_FETCH_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        let posts = records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()?;
        Ok(posts)
    }

    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record: Option<PostRecord> = query_as(
            "
            SELECT
                post_snowflake,
                author_id,
                content,
                created_at
            FROM
                posts
            WHERE
                post_snowflake = $1
            ",
        )
        .bind(post_id.snowflake().get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    /// The most recent posts of one author, newest first.
    pub async fn fetch_posts_by_author(&self, author_id: &UserId) -> Result<Vec<Post>> {
        let records: Vec<PostRecord> = query_as(
            "
            SELECT
                post_snowflake,
                author_id,
                content,
                created_at
            FROM
                posts
            WHERE
                author_id = $1
            ORDER BY
                created_at DESC, post_snowflake DESC
            LIMIT $2
            ",
        )
        .bind(author_id.get())
        .bind(POST_FETCH_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        let posts = records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()?;
        Ok(posts)
    }

    pub async fn create_post(&self, author_id: &UserId, content: &PostContent) -> Result<Post> {
        let post_snowflake = self.snowflake_generator.lock().generate()?;

        let record: PostRecord = query_as(
            "
            INSERT INTO posts (post_snowflake, author_id, content)
            VALUES ($1, $2, $3)
            RETURNING post_snowflake, author_id, content, created_at
            ",
        )
        .bind(post_snowflake.get().cast_signed())
        .bind(author_id.get())
        .bind(content.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(record.try_into()?)
    }
}
