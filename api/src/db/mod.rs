//! Post persistence.
//!
//! `PostStore` is the seam handlers talk to. `PgPostStore` is the production
//! implementation; `MemoryPostStore` has the same filtering and ordering
//! semantics and backs the router tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Post, SortKey, SortOrder};

pub use memory::MemoryPostStore;
pub use postgres::PgPostStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Filter, order and window for a listing.
///
/// `keyword` matches title or description, `tag` matches the tag; both are
/// case-insensitive substring matches and an empty string matches everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostQuery {
    pub keyword: String,
    pub tag: String,
    pub sort_by: SortKey,
    pub sort_order: SortOrder,
    pub limit: i64,
    pub offset: i64,
}

impl Default for PostQuery {
    fn default() -> Self {
        Self {
            keyword: String::new(),
            tag: String::new(),
            sort_by: SortKey::default(),
            sort_order: SortOrder::default(),
            limit: 10,
            offset: 0,
        }
    }
}

/// One page of posts plus the number of rows matching the filter.
#[derive(Debug, Clone, Default)]
pub struct PostPage {
    pub count: i64,
    pub rows: Vec<Post>,
}

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Persist a new post and return the stored row.
    async fn insert(&self, post: Post) -> Result<Post, StoreError>;

    async fn list(&self, query: &PostQuery) -> Result<PostPage, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Post>, StoreError>;

    /// Cheap round trip used by the health check.
    async fn ping(&self) -> Result<(), StoreError>;
}
