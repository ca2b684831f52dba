use async_trait::async_trait;
use axum::body::Bytes;
use dashmap::DashMap;
use std::sync::Arc;

use super::{ObjectStorage, StorageError, UploadObject};

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
    pub field_name: String,
}

/// Keeps uploads in a `DashMap`; URLs are `<base_url>/<encoded key>`.
#[derive(Clone)]
pub struct MemoryStorage {
    base_url: String,
    objects: Arc<DashMap<String, StoredObject>>,
}

impl MemoryStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            objects: Arc::new(DashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.get(key).map(|entry| entry.value().clone())
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new("http://localhost:9000/posts")
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn put(&self, object: UploadObject) -> Result<String, StorageError> {
        let url = format!("{}/{}", self.base_url, urlencoding::encode(&object.key));
        self.objects.insert(
            object.key,
            StoredObject {
                body: object.body,
                content_type: object.content_type,
                field_name: object.field_name,
            },
        );
        Ok(url)
    }
}
