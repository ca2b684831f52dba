//! Multipart handling for `POST /posts`.
//!
//! `UploadedPost` reads the whole form, validates the text fields, pushes the
//! `image` file to object storage and only then hands control to the handler.
//! If the upload fails the handler never runs.

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::StatusCode,
};
use chrono::Utc;
use tracing::info;
use validator::Validate;

use crate::{
    AppState,
    dto::CreatePostRequest,
    errors::ApiError,
    storage::{UploadObject, base_name, object_key},
};

/// Form field that carries the image.
pub const IMAGE_FIELD: &str = "image";

/// A validated creation form whose image is already in storage.
#[derive(Debug)]
pub struct UploadedPost {
    pub post: CreatePostRequest,
    pub image_url: String,
    pub object_key: String,
}

struct ImagePart {
    file_name: String,
    content_type: String,
    data: Bytes,
}

#[derive(Default)]
struct PostForm {
    title: Option<String>,
    desc: Option<String>,
    tag: Option<String>,
    image: Option<ImagePart>,
}

fn form_error(status: StatusCode, text: String) -> ApiError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(text)
    } else {
        ApiError::ValidationError(text)
    }
}

async fn read_form(multipart: &mut Multipart) -> Result<PostForm, ApiError> {
    let mut form = PostForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| form_error(e.status(), e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_owned();

        if let Some(file_name) = field.file_name().map(str::to_owned) {
            if name != IMAGE_FIELD {
                return Err(ApiError::ValidationError(format!(
                    "unexpected file field `{name}`, expected `{IMAGE_FIELD}`"
                )));
            }
            if form.image.is_some() {
                return Err(ApiError::ValidationError(format!(
                    "only one `{IMAGE_FIELD}` file is allowed"
                )));
            }
            if base_name(&file_name).is_empty() {
                return Err(ApiError::ValidationError(format!(
                    "`{IMAGE_FIELD}` must have a file name"
                )));
            }

            let content_type = field
                .content_type()
                .map(str::to_owned)
                .unwrap_or_else(|| {
                    mime_guess::from_path(&file_name)
                        .first_or_octet_stream()
                        .to_string()
                });
            let data = field
                .bytes()
                .await
                .map_err(|e| form_error(e.status(), e.body_text()))?;

            form.image = Some(ImagePart {
                file_name,
                content_type,
                data,
            });
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| form_error(e.status(), e.body_text()))?;
        match name.as_str() {
            "title" => form.title = Some(value),
            "desc" => form.desc = Some(value),
            "tag" => form.tag = Some(value),
            _ => {}
        }
    }

    Ok(form)
}

impl FromRequest<AppState> for UploadedPost {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| form_error(e.status(), e.body_text()))?;
        let form = read_form(&mut multipart).await?;

        let post = CreatePostRequest {
            title: form.title.unwrap_or_default(),
            desc: form.desc.unwrap_or_default(),
            tag: form.tag.unwrap_or_default(),
        };
        post.validate()
            .map_err(|e| ApiError::ValidationError(e.to_string()))?;

        let image = form.image.ok_or_else(|| {
            ApiError::ValidationError(format!("`{IMAGE_FIELD}` file is required"))
        })?;

        let key = object_key(Utc::now().timestamp_millis(), &image.file_name);
        let size = image.data.len();
        let image_url = state
            .storage
            .put(UploadObject {
                key: key.clone(),
                body: image.data,
                content_type: image.content_type,
                field_name: IMAGE_FIELD.to_owned(),
            })
            .await?;

        info!(key = %key, size, "Image uploaded");

        Ok(Self {
            post,
            image_url,
            object_key: key,
        })
    }
}
