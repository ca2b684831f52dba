use crate::{db::PostStore, storage::ObjectStorage};
use std::sync::Arc;

// ============================================================================
// APPLICATION STATE - Shared data across all requests
// ============================================================================
/// Built once at startup and cloned into every handler.
///
/// Both backends sit behind `Arc<dyn ...>` so the router runs the same
/// against Postgres/S3 in production and the in-memory stores in tests.
#[derive(Clone)]
pub struct AppState {
    pub posts: Arc<dyn PostStore>,
    pub storage: Arc<dyn ObjectStorage>,
}

impl AppState {
    pub fn new(
        posts: impl PostStore + 'static,
        storage: impl ObjectStorage + 'static,
    ) -> Self {
        Self {
            posts: Arc::new(posts),
            storage: Arc::new(storage),
        }
    }
}
