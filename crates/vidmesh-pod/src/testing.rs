//! Recording fakes for the video service's collaborators.

use crate::error::{Error, Result};
use crate::models::{NewVideo, VideoRecord};
use crate::replication::{AddAnnouncement, RemoveAnnouncement, ReplicationClient};
use crate::service::{ServiceConfig, VideoService};
use crate::store::{CatalogStore, Insert, MemoryCatalog, VideoFilter};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vidmesh_seeder::{ContentSeeder, SeedError, WithdrawError};

pub const POD_A: &str = "http://pod-a:9000";
pub const POD_B: &str = "http://pod-b";

/// Seeder returning a fixed locator, recording every call.
pub struct FakeSeeder {
    pub locator: String,
    pub fail_publish_for: Mutex<Vec<PathBuf>>,
    pub fail_all: bool,
    pub withdraw_error: Mutex<Option<WithdrawError>>,
    pub published: Mutex<Vec<PathBuf>>,
    pub withdrawn: Mutex<Vec<String>>,
    pub publish_delay: Option<Duration>,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeSeeder {
    pub fn returning(locator: &str) -> Self {
        Self {
            locator: locator.to_string(),
            fail_publish_for: Mutex::new(Vec::new()),
            fail_all: false,
            withdraw_error: Mutex::new(None),
            published: Mutex::new(Vec::new()),
            withdrawn: Mutex::new(Vec::new()),
            publish_delay: None,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::returning("locator://unused")
        }
    }

    pub fn published(&self) -> Vec<PathBuf> {
        self.published.lock().unwrap().clone()
    }

    /// Highest number of publishes observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn withdrawn(&self) -> Vec<String> {
        self.withdrawn.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentSeeder for FakeSeeder {
    async fn publish(&self, path: &Path) -> std::result::Result<String, SeedError> {
        self.published.lock().unwrap().push(path.to_path_buf());
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.publish_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let fails = self.fail_all || self.fail_publish_for.lock().unwrap().iter().any(|p| p == path);
        if fails {
            return Err(SeedError::Swarm(format!("refused {}", path.display())));
        }
        Ok(self.locator.clone())
    }

    async fn withdraw(&self, locator: &str) -> std::result::Result<(), WithdrawError> {
        self.withdrawn.lock().unwrap().push(locator.to_string());
        match self.withdraw_error.lock().unwrap().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// In-memory store counting writes, optionally failing them.
///
/// `yield_first` suspends every call once before touching the catalog, and
/// `lose_delete_race` makes deletes behave as if another caller got there first.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryCatalog,
    pub creates: AtomicUsize,
    pub writes: AtomicUsize,
    pub fail_create: bool,
    pub yield_first: bool,
    pub lose_delete_race: bool,
}

impl CountingStore {
    /// Records actually created.
    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// Calls to `create` or `insert_unique`, successful or not.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        if self.yield_first {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl CatalogStore for CountingStore {
    async fn create(&self, video: NewVideo) -> Result<VideoRecord> {
        self.pause().await;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.creates.fetch_add(1, Ordering::SeqCst);
        if self.fail_create {
            return Err(Error::Persistence("disk full".into()));
        }
        self.inner.create(video).await
    }

    async fn insert_unique(&self, video: NewVideo) -> Result<Insert> {
        self.pause().await;
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_create {
            return Err(Error::Persistence("disk full".into()));
        }
        let inserted = self.inner.insert_unique(video).await?;
        if let Insert::Created(_) = inserted {
            self.creates.fetch_add(1, Ordering::SeqCst);
        }
        Ok(inserted)
    }

    async fn find_by_id(&self, id: &str) -> Result<VideoRecord> {
        self.pause().await;
        self.inner.find_by_id(id).await
    }

    async fn find_one(&self, filter: &VideoFilter) -> Result<VideoRecord> {
        self.pause().await;
        self.inner.find_one(filter).await
    }

    async fn find_all(&self, filter: &VideoFilter) -> Result<Vec<VideoRecord>> {
        self.pause().await;
        self.inner.find_all(filter).await
    }

    async fn delete_by_id(&self, id: &str) -> Result<()> {
        self.pause().await;
        if self.lose_delete_race {
            let _ = self.inner.delete_by_id(id).await;
        }
        self.inner.delete_by_id(id).await
    }
}

/// Replication client recording notifications.
#[derive(Default)]
pub struct RecordingReplication {
    pub adds: Mutex<Vec<AddAnnouncement>>,
    pub removes: Mutex<Vec<RemoveAnnouncement>>,
}

impl RecordingReplication {
    pub fn adds(&self) -> Vec<AddAnnouncement> {
        self.adds.lock().unwrap().clone()
    }

    pub fn removes(&self) -> Vec<RemoveAnnouncement> {
        self.removes.lock().unwrap().clone()
    }
}

impl ReplicationClient for RecordingReplication {
    fn notify_add(&self, announcement: AddAnnouncement) {
        self.adds.lock().unwrap().push(announcement);
    }

    fn notify_remove(&self, announcement: RemoveAnnouncement) {
        self.removes.lock().unwrap().push(announcement);
    }
}

/// A service for pod A wired to the given fakes.
pub struct Harness {
    pub service: Arc<VideoService>,
    pub store: Arc<CountingStore>,
    pub seeder: Arc<FakeSeeder>,
    pub replication: Arc<RecordingReplication>,
}

impl Harness {
    pub fn new(upload_dir: &Path, store: CountingStore, seeder: FakeSeeder) -> Self {
        let store = Arc::new(store);
        let seeder = Arc::new(seeder);
        let replication = Arc::new(RecordingReplication::default());
        let service = Arc::new(VideoService::new(
            ServiceConfig {
                pod_address: POD_A.to_string(),
                upload_dir: upload_dir.to_path_buf(),
                seed_concurrency: 2,
            },
            store.clone(),
            seeder.clone(),
            replication.clone(),
        ));
        Self {
            service,
            store,
            seeder,
            replication,
        }
    }

    pub fn announcement(name: &str, locator: &str, origin: &str) -> AddAnnouncement {
        AddAnnouncement {
            name: name.to_string(),
            description: format!("{} from {}", name, origin),
            content_locator: locator.to_string(),
            origin_pod: origin.to_string(),
        }
    }
}
