use serde::Deserialize;
use validator::Validate;

use crate::db::PostQuery;
use crate::errors::ApiError;
use crate::models::{SortKey, SortOrder};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;

/// Raw query string of `GET /posts`. Every value arrives as text so bad
/// input can be reported as a validation error instead of a bare rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPostsQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub keyword: Option<String>,
    pub tag: Option<String>,
}

/// Listing parameters after parsing and defaulting.
#[derive(Debug, Validate)]
pub struct ListPostsParams {
    #[validate(range(min = 1, message = "page must be at least 1"))]
    pub page: u32,
    #[validate(range(min = 1, message = "limit must be at least 1"))]
    pub limit: u32,
    pub sort_by: SortKey,
    pub sort_order: SortOrder,
    pub keyword: String,
    pub tag: String,
}

/// Absent and empty values are treated the same.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_number(name: &str, value: Option<String>, default: u32) -> Result<u32, ApiError> {
    match present(value) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            ApiError::ValidationError(format!("{name} must be a positive integer, got `{raw}`"))
        }),
    }
}

impl TryFrom<ListPostsQuery> for ListPostsParams {
    type Error = ApiError;

    fn try_from(query: ListPostsQuery) -> Result<Self, Self::Error> {
        let sort_by = match present(query.sort_by) {
            None => SortKey::default(),
            Some(raw) => SortKey::parse(&raw).ok_or_else(|| {
                ApiError::ValidationError(format!(
                    "sortBy must be one of createdAt, updatedAt, title, tag, id; got `{raw}`"
                ))
            })?,
        };
        let sort_order = match present(query.sort_order) {
            None => SortOrder::default(),
            Some(raw) => SortOrder::parse(&raw).ok_or_else(|| {
                ApiError::ValidationError(format!("sortOrder must be ASC or DESC, got `{raw}`"))
            })?,
        };

        let params = Self {
            page: parse_number("page", query.page, DEFAULT_PAGE)?,
            limit: parse_number("limit", query.limit, DEFAULT_LIMIT)?,
            sort_by,
            sort_order,
            keyword: query.keyword.unwrap_or_default(),
            tag: query.tag.unwrap_or_default(),
        };
        params
            .validate()
            .map_err(|e| ApiError::ValidationError(e.to_string()))?;

        Ok(params)
    }
}

impl ListPostsParams {
    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }

    pub fn into_query(self) -> PostQuery {
        PostQuery {
            offset: self.offset(),
            limit: i64::from(self.limit),
            keyword: self.keyword,
            tag: self.tag,
            sort_by: self.sort_by,
            sort_order: self.sort_order,
        }
    }
}

/// Text fields of the `POST /posts` form.
#[derive(Debug, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 255, message = "title is required (max 255 characters)"))]
    pub title: String,
    #[validate(length(min = 1, message = "desc is required"))]
    pub desc: String,
    #[validate(length(min = 1, max = 255, message = "tag is required (max 255 characters)"))]
    pub tag: String,
}
