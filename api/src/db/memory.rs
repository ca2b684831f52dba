use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::{PostPage, PostQuery, PostStore, StoreError};
use crate::models::Post;

/// `DashMap`-backed store; clones share the same map.
///
/// Text columns sort by Rust byte order, while Postgres sorts by the database
/// collation, so the two can order mixed-case titles differently.
#[derive(Clone, Default)]
pub struct MemoryPostStore {
    posts: Arc<DashMap<Uuid, Post>>,
}

impl MemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

fn matches(post: &Post, keyword: &str, tag: &str) -> bool {
    let keyword_hit = post.title.to_lowercase().contains(keyword)
        || post.description.to_lowercase().contains(keyword);
    keyword_hit && post.tag.to_lowercase().contains(tag)
}

#[async_trait]
impl PostStore for MemoryPostStore {
    async fn insert(&self, post: Post) -> Result<Post, StoreError> {
        self.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn list(&self, query: &PostQuery) -> Result<PostPage, StoreError> {
        let keyword = query.keyword.to_lowercase();
        let tag = query.tag.to_lowercase();

        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|entry| matches(entry.value(), &keyword, &tag))
            .map(|entry| entry.value().clone())
            .collect();

        posts.sort_by(|a, b| {
            query
                .sort_order
                .apply(query.sort_by.compare(a, b))
                .then_with(|| a.id.cmp(&b.id))
        });

        let count = posts.len() as i64;
        let rows = posts
            .into_iter()
            .skip(usize::try_from(query.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(query.limit).unwrap_or(0))
            .collect();

        Ok(PostPage { count, rows })
    }

    async fn get(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        Ok(self.posts.get(&id).map(|entry| entry.value().clone()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
