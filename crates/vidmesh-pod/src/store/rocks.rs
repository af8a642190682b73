//! Persistent storage using RocksDB.
//!
//! Key layout:
//! - `video:{id}` - JSON video record
//! - `locator:{content_locator}` - id of the record holding that locator
//! - `peer_key:{pod_address}` - pinned ed25519 public key of a peer
//! - `node:signing_key` - this pod's ed25519 signing key
//!
//! Read-modify-write sequences (unique inserts, deletes, key pins) run
//! under a single write lock so the locator index and pins stay consistent.

use super::{CatalogStore, Insert, VideoFilter};
use crate::error::{Error, Result};
use crate::models::{NewVideo, VideoRecord};
use crate::replication::PeerKeyStore;
use async_trait::async_trait;
use ed25519_dalek::SigningKey;
use rocksdb::{Options, WriteBatch, DB};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Storage backend for a pod.
pub struct PodStorage {
    db: DB,
    write_lock: Mutex<()>,
}

impl PodStorage {
    /// Open or create storage at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        Ok(Self {
            db,
            write_lock: Mutex::new(()),
        })
    }

    fn lock_writes(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| Error::Persistence("storage write lock poisoned".into()))
    }

    fn write_record(&self, video: NewVideo) -> Result<VideoRecord> {
        let id = hex::encode(rand::random::<[u8; 16]>());
        let record = video.into_record(id);

        let mut batch = WriteBatch::default();
        batch.put(
            Self::video_key(&record.id).as_bytes(),
            serde_json::to_vec(&record)?,
        );
        batch.put(
            Self::locator_key(&record.content_locator).as_bytes(),
            record.id.as_bytes(),
        );
        self.db.write(batch)?;

        Ok(record)
    }

    fn video_key(id: &str) -> String {
        format!("video:{}", id)
    }

    fn locator_key(locator: &str) -> String {
        format!("locator:{}", locator)
    }

    fn get_video(&self, id: &str) -> Result<Option<VideoRecord>> {
        match self.db.get(Self::video_key(id).as_bytes())? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    fn scan_videos(&self, filter: &VideoFilter) -> Result<Vec<VideoRecord>> {
        let prefix = b"video:";
        let mut videos = Vec::new();

        for item in self.db.prefix_iterator(prefix) {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            let video: VideoRecord = serde_json::from_slice(&value)?;
            if filter.matches(&video) {
                videos.push(video);
            }
        }

        Ok(videos)
    }

    fn find_by_locator(&self, locator: &str) -> Result<Option<VideoRecord>> {
        match self.db.get(Self::locator_key(locator).as_bytes())? {
            Some(id) => self.get_video(&String::from_utf8_lossy(&id)),
            None => Ok(None),
        }
    }

    // --- Node Identity ---

    /// Get or create the pod's signing key (persistent identity).
    pub fn get_or_create_node_key(&self) -> Result<SigningKey> {
        let key = b"node:signing_key";

        if let Some(data) = self.db.get(key)? {
            let bytes: [u8; 32] = data
                .as_slice()
                .try_into()
                .map_err(|_| Error::Persistence("Invalid stored key".into()))?;
            Ok(SigningKey::from_bytes(&bytes))
        } else {
            let mut rng = rand::thread_rng();
            let signing_key = SigningKey::generate(&mut rng);
            self.db.put(key, signing_key.as_bytes())?;
            Ok(signing_key)
        }
    }
}

#[async_trait]
impl CatalogStore for PodStorage {
    async fn create(&self, video: NewVideo) -> Result<VideoRecord> {
        let _guard = self.lock_writes()?;
        self.write_record(video)
    }

    async fn insert_unique(&self, video: NewVideo) -> Result<Insert> {
        let _guard = self.lock_writes()?;
        match self.find_by_locator(&video.content_locator)? {
            Some(existing) => Ok(Insert::Existing(existing)),
            None => Ok(Insert::Created(self.write_record(video)?)),
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<VideoRecord> {
        self.get_video(id)?
            .ok_or_else(|| Error::NotFound(format!("video {}", id)))
    }

    async fn find_one(&self, filter: &VideoFilter) -> Result<VideoRecord> {
        let found = match filter {
            VideoFilter::ContentLocator(locator) => self.find_by_locator(locator)?,
            _ => self.scan_videos(filter)?.into_iter().next(),
        };
        found.ok_or_else(|| Error::NotFound(format!("no video matching {:?}", filter)))
    }

    async fn find_all(&self, filter: &VideoFilter) -> Result<Vec<VideoRecord>> {
        self.scan_videos(filter)
    }

    async fn delete_by_id(&self, id: &str) -> Result<()> {
        let _guard = self.lock_writes()?;
        let video = self
            .get_video(id)?
            .ok_or_else(|| Error::NotFound(format!("video {}", id)))?;

        let mut batch = WriteBatch::default();
        batch.delete(Self::video_key(id).as_bytes());
        // The index may already point at a newer record for the same locator
        let locator_key = Self::locator_key(&video.content_locator);
        if self.db.get(locator_key.as_bytes())?.as_deref() == Some(id.as_bytes()) {
            batch.delete(locator_key.as_bytes());
        }
        self.db.write(batch)?;
        Ok(())
    }
}

impl PeerKeyStore for PodStorage {
    fn pin_or_match(&self, pod_address: &str, public_key: &[u8; 32]) -> Result<bool> {
        let key = format!("peer_key:{}", pod_address);
        let _guard = self.lock_writes()?;
        match self.db.get(key.as_bytes())? {
            Some(pinned) => Ok(pinned.as_slice() == public_key),
            None => {
                self.db.put(key.as_bytes(), public_key)?;
                tracing::info!("Pinned key for pod {}", pod_address);
                Ok(true)
            }
        }
    }
}
