use crate::{
    AppState,
    dto::{ListPostsParams, ListPostsQuery, PaginatedResponse},
    errors::ApiError,
    models::Post,
    upload::UploadedPost,
};
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use tracing::{info, warn};
use uuid::Uuid;

/// POST /posts
/// Body: multipart/form-data with `image` (file), `title`, `desc`, `tag`
///
/// The image is already uploaded when this runs. If the insert fails the
/// object stays in the bucket.
pub async fn create_post(
    State(state): State<AppState>,
    upload: UploadedPost,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    let UploadedPost {
        post: payload,
        image_url,
        object_key,
    } = upload;

    let post = Post::new(payload.title, payload.desc, payload.tag, image_url);

    let post = state.posts.insert(post).await.inspect_err(|e| {
        warn!(key = %object_key, "Post insert failed, uploaded image orphaned: {}", e);
    })?;

    info!("Post created: {} with image {}", post.id, object_key);

    Ok((StatusCode::CREATED, Json(post)))
}

/// GET /posts?page=1&limit=10&sortBy=createdAt&sortOrder=DESC&keyword=&tag=
pub async fn get_posts(
    State(state): State<AppState>,
    query: Result<Query<ListPostsQuery>, QueryRejection>,
) -> Result<Json<PaginatedResponse<Post>>, ApiError> {
    let Query(query) = query?;
    let params = ListPostsParams::try_from(query)?;
    let page = state.posts.list(&params.into_query()).await?;

    Ok(Json(page.into()))
}

/// GET /posts/{id}
pub async fn get_post(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Post>, ApiError> {
    let Path(id) = id?;
    let post = state.posts.get(id).await?.ok_or(ApiError::NotFound)?;

    Ok(Json(post))
}
