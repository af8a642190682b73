//! Catalog storage.
//!
//! The video service only sees the [`CatalogStore`] contract. Two backends
//! implement it:
//!
//! - [`PodStorage`] - RocksDB-backed persistent storage
//! - [`MemoryCatalog`] - in-memory storage for tests and ephemeral pods

mod memory;
mod rocks;

pub use memory::MemoryCatalog;
pub use rocks::PodStorage;

use crate::error::Result;
use crate::models::{NewVideo, VideoRecord};
use async_trait::async_trait;
use regex::Regex;

/// Predicate over catalog records.
#[derive(Debug, Clone)]
pub enum VideoFilter {
    /// Every record
    All,
    /// Records this pod originated (local path present)
    Local,
    /// The record with this swarm locator
    ContentLocator(String),
    /// Records whose name matches the expression
    NameMatches(Regex),
}

impl VideoFilter {
    /// Whether `video` satisfies the predicate.
    pub fn matches(&self, video: &VideoRecord) -> bool {
        match self {
            VideoFilter::All => true,
            VideoFilter::Local => video.is_local(),
            VideoFilter::ContentLocator(locator) => video.content_locator == *locator,
            VideoFilter::NameMatches(re) => re.is_match(&video.name),
        }
    }
}

/// Outcome of [`CatalogStore::insert_unique`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insert {
    /// The record was created
    Created(VideoRecord),
    /// A record with the same content locator was already present
    Existing(VideoRecord),
}

/// Persistent collection of video records.
///
/// Implementations provide their own concurrency safety.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Persist a new record, assigning its id.
    async fn create(&self, video: NewVideo) -> Result<VideoRecord>;

    /// Create a record unless one with the same content locator exists.
    ///
    /// The check and the insert are atomic with respect to other writers.
    async fn insert_unique(&self, video: NewVideo) -> Result<Insert>;

    /// Fetch a record by id. Missing ids are [`Error::NotFound`](crate::Error::NotFound).
    async fn find_by_id(&self, id: &str) -> Result<VideoRecord>;

    /// Fetch the first record matching `filter`, or [`Error::NotFound`](crate::Error::NotFound).
    async fn find_one(&self, filter: &VideoFilter) -> Result<VideoRecord>;

    /// Fetch every record matching `filter`.
    async fn find_all(&self, filter: &VideoFilter) -> Result<Vec<VideoRecord>>;

    /// Delete a record by id.
    async fn delete_by_id(&self, id: &str) -> Result<()>;
}
