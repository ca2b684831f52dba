//! PostgreSQL-backed post store.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use super::{PostPage, PostQuery, PostStore, StoreError};
use crate::models::Post;

/// Default maximum connections for the pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

const POST_COLUMNS: &str = "id, title, description, tag, image_url, created_at, updated_at";

#[derive(Clone)]
pub struct PgPostStore {
    pool: PgPool,
}

impl PgPostStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Create the `posts` table and its indexes if they do not exist yet.
    pub async fn sync_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id UUID PRIMARY KEY,
                title VARCHAR(255) NOT NULL,
                description TEXT NOT NULL,
                tag VARCHAR(255) NOT NULL,
                image_url TEXT NOT NULL CHECK (image_url <> ''),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS posts_created_at_idx ON posts (created_at)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS posts_tag_idx ON posts (tag)")
            .execute(&self.pool)
            .await?;

        info!("Schema synchronized");
        Ok(())
    }
}

/// Wrap `value` for ILIKE, matching `%`, `_` and `\` literally.
fn like_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, query: &PostQuery) {
    let keyword = like_pattern(&query.keyword);
    builder.push(" WHERE (title ILIKE ");
    builder.push_bind(keyword.clone());
    builder.push(" OR description ILIKE ");
    builder.push_bind(keyword);
    builder.push(") AND tag ILIKE ");
    builder.push_bind(like_pattern(&query.tag));
}

#[async_trait]
impl PostStore for PgPostStore {
    async fn insert(&self, post: Post) -> Result<Post, StoreError> {
        let sql = format!(
            "INSERT INTO posts ({POST_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {POST_COLUMNS}"
        );
        let stored = sqlx::query_as::<_, Post>(&sql)
            .bind(post.id)
            .bind(&post.title)
            .bind(&post.description)
            .bind(&post.tag)
            .bind(&post.image_url)
            .bind(post.created_at)
            .bind(post.updated_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(stored)
    }

    async fn list(&self, query: &PostQuery) -> Result<PostPage, StoreError> {
        let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM posts");
        push_filter(&mut count_query, query);
        let count: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut rows_query = QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts"));
        push_filter(&mut rows_query, query);
        // Column and direction come from closed enums, never from client text.
        rows_query.push(format!(
            " ORDER BY {} {}, id ASC",
            query.sort_by.column(),
            query.sort_order.as_sql()
        ));
        rows_query.push(" LIMIT ");
        rows_query.push_bind(query.limit);
        rows_query.push(" OFFSET ");
        rows_query.push_bind(query.offset);

        let rows = rows_query
            .build_query_as::<Post>()
            .fetch_all(&self.pool)
            .await?;

        Ok(PostPage { count, rows })
    }

    async fn get(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        let post = sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
