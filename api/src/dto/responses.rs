use serde::Serialize;

use crate::db::PostPage;
use crate::models::Post;

/// `{ "count": <rows matching the filter>, "rows": [...] }`
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub count: i64,
    pub rows: Vec<T>,
}

impl From<PostPage> for PaginatedResponse<Post> {
    fn from(page: PostPage) -> Self {
        Self {
            count: page.count,
            rows: page.rows,
        }
    }
}
