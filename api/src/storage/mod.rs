//! Object storage for uploaded images.

pub mod memory;
pub mod s3;

use async_trait::async_trait;
use axum::body::Bytes;

pub use memory::MemoryStorage;
pub use s3::{S3Config, S3Storage};

/// A file ready to be written under `key`.
#[derive(Debug, Clone)]
pub struct UploadObject {
    pub key: String,
    pub body: Bytes,
    pub content_type: String,
    /// Form field the file arrived in; stored as object metadata.
    pub field_name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to upload object `{key}`: {message}")]
    Upload { key: String, message: String },
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store the object and return its public URL.
    async fn put(&self, object: UploadObject) -> Result<String, StorageError>;
}

/// Last path component of a client-supplied file name. Empty when the name
/// ends in a separator.
pub fn base_name(file_name: &str) -> &str {
    file_name.rsplit(['/', '\\']).next().unwrap_or(file_name)
}

/// Build the object key for an upload: `<unix millis>-<file name>`.
///
/// Only the last path component of the client-supplied name is kept.
pub fn object_key(timestamp_millis: i64, file_name: &str) -> String {
    format!("{timestamp_millis}-{}", base_name(file_name))
}
