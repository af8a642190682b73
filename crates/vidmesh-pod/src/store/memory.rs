//! In-memory catalog.

use super::{CatalogStore, Insert, VideoFilter};
use crate::error::{Error, Result};
use crate::models::{NewVideo, VideoRecord};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Catalog held in memory, with sequential ids.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    videos: RwLock<BTreeMap<String, VideoRecord>>,
    next_id: AtomicU64,
}

impl MemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records.
    pub async fn len(&self) -> usize {
        self.videos.read().await.len()
    }

    /// Whether the catalog is empty.
    pub async fn is_empty(&self) -> bool {
        self.videos.read().await.is_empty()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn create(&self, video: NewVideo) -> Result<VideoRecord> {
        let id = (self.next_id.fetch_add(1, Ordering::Relaxed) + 1).to_string();
        let record = video.into_record(id.clone());
        self.videos.write().await.insert(id, record.clone());
        Ok(record)
    }

    async fn insert_unique(&self, video: NewVideo) -> Result<Insert> {
        let mut videos = self.videos.write().await;
        if let Some(existing) = videos
            .values()
            .find(|v| v.content_locator == video.content_locator)
        {
            return Ok(Insert::Existing(existing.clone()));
        }

        let id = (self.next_id.fetch_add(1, Ordering::Relaxed) + 1).to_string();
        let record = video.into_record(id.clone());
        videos.insert(id, record.clone());
        Ok(Insert::Created(record))
    }

    async fn find_by_id(&self, id: &str) -> Result<VideoRecord> {
        self.videos
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("video {}", id)))
    }

    async fn find_one(&self, filter: &VideoFilter) -> Result<VideoRecord> {
        self.videos
            .read()
            .await
            .values()
            .find(|v| filter.matches(v))
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("no video matching {:?}", filter)))
    }

    async fn find_all(&self, filter: &VideoFilter) -> Result<Vec<VideoRecord>> {
        Ok(self
            .videos
            .read()
            .await
            .values()
            .filter(|v| filter.matches(v))
            .cloned()
            .collect())
    }

    async fn delete_by_id(&self, id: &str) -> Result<()> {
        match self.videos.write().await.remove(id) {
            Some(_) => Ok(()),
            None => Err(Error::NotFound(format!("video {}", id))),
        }
    }
}
