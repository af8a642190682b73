//! Video lifecycle and catalog replication.
//!
//! [`VideoService`] is the only component that touches all three
//! collaborators: the swarm ([`ContentSeeder`]), the catalog
//! ([`CatalogStore`]) and the peers ([`ReplicationClient`]).
//!
//! Seeding and persisting are two separate steps with no transaction
//! spanning them. A publish that succeeds followed by a failed store write
//! leaves the content seeded; a removal whose catalog delete succeeds but
//! whose file delete fails leaves an orphaned file and reports it.

use crate::error::{Error, Result};
use crate::models::{NewVideo, VideoMetadata, VideoRecord};
use crate::replication::{AddAnnouncement, RemoveAnnouncement, ReplicationClient};
use crate::store::{CatalogStore, Insert, VideoFilter};
use futures::stream::{self, StreamExt};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use vidmesh_seeder::{ContentSeeder, WithdrawError};


/// Identity and limits of the pod the service runs in.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// This pod's public address, stamped as origin on local videos
    pub pod_address: String,

    /// Directory holding uploaded video files
    pub upload_dir: PathBuf,

    /// Maximum concurrent publishes during bulk reseeding
    pub seed_concurrency: usize,
}

/// Orchestrates seeding, cataloguing and replication of videos.
pub struct VideoService {
    config: ServiceConfig,
    store: Arc<dyn CatalogStore>,
    seeder: Arc<dyn ContentSeeder>,
    replication: Arc<dyn ReplicationClient>,
}

impl VideoService {
    pub fn new(
        config: ServiceConfig,
        store: Arc<dyn CatalogStore>,
        seeder: Arc<dyn ContentSeeder>,
        replication: Arc<dyn ReplicationClient>,
    ) -> Self {
        Self {
            config,
            store,
            seeder,
            replication,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn upload_path(&self, file_name: &str) -> PathBuf {
        self.config.upload_dir.join(file_name)
    }

    /// Add a video from a file already stored in the upload directory.
    ///
    /// The file is published before anything is persisted. Peers are told
    /// about the new video without waiting for them.
    pub async fn add(&self, file_name: &str, metadata: VideoMetadata) -> Result<VideoRecord> {
        validate_file_name(file_name)?;
        let path = self.upload_path(file_name);
        info!("Adding {} video.", path.display());

        let locator = self.seeder.publish(&path).await.map_err(|e| {
            error!("Cannot seed {}: {}", path.display(), e);
            Error::Seed(e)
        })?;

        let inserted = self
            .store
            .insert_unique(NewVideo {
                name: metadata.name,
                local_path: Some(file_name.to_string()),
                description: metadata.description,
                content_locator: locator,
                origin_pod: self.config.pod_address.clone(),
            })
            .await
            .map_err(|e| {
                // The content stays seeded; reseeding or removal cleans it up
                error!("Cannot insert video {}: {}", path.display(), e);
                persistence(e)
            })?;

        let video = match inserted {
            Insert::Created(video) => video,
            Insert::Existing(existing) => {
                warn!(
                    "{} is already catalogued as {}",
                    existing.content_locator, existing.id
                );
                return Err(Error::AlreadyExists(existing.content_locator));
            }
        };

        info!("Sending {} video to peers.", video.content_locator);
        self.replication.notify_add(video.announcement());

        Ok(video)
    }

    /// Remove a locally originated video: unseed, uncatalogue, delete the file.
    pub async fn remove(&self, id: &str) -> Result<()> {
        let video = self.store.find_by_id(id).await?;

        let Some(local_path) = video.local_path.as_deref() else {
            error!("Cannot remove video {} of pod {}.", id, video.origin_pod);
            return Err(Error::Unauthorized(format!(
                "video {} belongs to {}",
                id, video.origin_pod
            )));
        };

        info!("Removing {} video", video.name);

        match self.seeder.withdraw(&video.content_locator).await {
            Ok(()) => {}
            Err(WithdrawError::NotSeeded(locator)) => {
                warn!("{} was not seeded, continuing removal", locator);
            }
            Err(e @ WithdrawError::Swarm(_)) => {
                warn!("Cannot withdraw {} from the swarm: {}", video.content_locator, e);
            }
        }

        self.store.delete_by_id(id).await.map_err(|e| {
            error!("Cannot remove video {} from the catalog: {}", id, e);
            persistence(e)
        })?;

        let path = self.upload_path(local_path);
        tokio::fs::remove_file(&path).await.map_err(|source| {
            error!("Cannot remove video file {}: {}", path.display(), source);
            Error::FileRemoval {
                path: path.clone(),
                source,
            }
        })?;

        self.replication.notify_remove(RemoveAnnouncement {
            content_locator: video.content_locator,
        });

        Ok(())
    }

    /// Mirror a video announced by its origin pod.
    ///
    /// Repeated announcements of the same locator by the same origin return
    /// the record already held.
    pub async fn add_remote(&self, announcement: AddAnnouncement) -> Result<VideoRecord> {
        debug!("Add remote video from pod: {}", announcement.origin_pod);

        if announcement.origin_pod == self.config.pod_address {
            return Err(Error::Unauthorized(format!(
                "remote announcement claims this pod's address {}",
                announcement.origin_pod
            )));
        }

        let origin = announcement.origin_pod.clone();
        let inserted = self
            .store
            .insert_unique(NewVideo::from(announcement))
            .await
            .map_err(|e| {
                error!("Cannot insert this remote video: {}", e);
                persistence(e)
            })?;

        match inserted {
            Insert::Created(video) => Ok(video),
            Insert::Existing(existing) if existing.origin_pod == origin => {
                debug!("{} already mirrored", existing.content_locator);
                Ok(existing)
            }
            Insert::Existing(existing) => {
                warn!(
                    "{} claims {}, already owned by {}",
                    origin, existing.content_locator, existing.origin_pod
                );
                Err(Error::AlreadyExists(existing.content_locator))
            }
        }
    }

    /// Drop a mirrored video at the request of its origin pod.
    ///
    /// Never touches the swarm or the filesystem.
    pub async fn remove_remote(&self, requesting_pod: &str, content_locator: &str) -> Result<()> {
        let video = self
            .store
            .find_one(&VideoFilter::ContentLocator(content_locator.to_string()))
            .await
            .inspect_err(|_| error!("Cannot find remote video {}.", content_locator))?;

        if video.origin_pod != requesting_pod || video.is_local() {
            error!(
                "Pod {} has no rights on video {} (origin {}).",
                requesting_pod, content_locator, video.origin_pod
            );
            return Err(Error::Unauthorized(format!(
                "{} does not own {}",
                requesting_pod, content_locator
            )));
        }

        self.store.delete_by_id(&video.id).await.map_err(|e| {
            error!("Cannot remove the remote video {}: {}", content_locator, e);
            persistence(e)
        })
    }

    /// Re-publish every local video, e.g. after a restart.
    ///
    /// All publishes run (at most `seed_concurrency` at once) even when
    /// some fail. Returns the number seeded, or the first failure observed.
    pub async fn seed_all_local(&self) -> Result<usize> {
        let videos = self.store.find_all(&VideoFilter::Local).await.map_err(|e| {
            error!("Cannot get list of the videos to seed: {}", e);
            e
        })?;

        let concurrency = self.config.seed_concurrency.max(1);
        let results: Vec<Result<()>> = stream::iter(videos)
            .map(|video| self.reseed(video))
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let total = results.len();
        let mut first_failure = None;
        let mut failed = 0;
        for result in results {
            if let Err(e) = result {
                failed += 1;
                first_failure.get_or_insert(e);
            }
        }

        match first_failure {
            None => {
                info!("Seeded {} local videos", total);
                Ok(total)
            }
            Some(e) => {
                error!("{} of {} local videos could not be seeded", failed, total);
                Err(e)
            }
        }
    }

    async fn reseed(&self, video: VideoRecord) -> Result<()> {
        let Some(local_path) = video.local_path.as_deref() else {
            return Ok(());
        };
        let path = self.upload_path(local_path);

        let locator = self.seeder.publish(&path).await.map_err(|e| {
            error!("Cannot seed {}: {}", path.display(), e);
            Error::Seed(e)
        })?;

        if locator != video.content_locator {
            warn!(
                "{} now seeds as {} (catalogued as {})",
                path.display(),
                locator,
                video.content_locator
            );
        }
        Ok(())
    }

    /// Every catalogued video.
    pub async fn list(&self) -> Result<Vec<VideoRecord>> {
        self.store.find_all(&VideoFilter::All).await.inspect_err(|e| {
            error!("Cannot get list of the videos: {}", e);
        })
    }

    /// One video by id.
    pub async fn get(&self, id: &str) -> Result<VideoRecord> {
        self.store.find_by_id(id).await
    }

    /// Videos whose name matches the regular expression `pattern`.
    pub async fn search(&self, pattern: &str) -> Result<Vec<VideoRecord>> {
        let re = Regex::new(pattern)
            .map_err(|e| Error::InvalidInput(format!("bad search pattern: {}", e)))?;
        self.store
            .find_all(&VideoFilter::NameMatches(re))
            .await
            .inspect_err(|e| error!("Cannot search the videos: {}", e))
    }
}

/// Store failures on write paths surface as persistence errors.
///
/// A record deleted by a concurrent operation stays a lookup miss.
fn persistence(e: Error) -> Error {
    match e {
        Error::Persistence(_) | Error::NotFound(_) => e,
        other => Error::Persistence(other.to_string()),
    }
}

/// Uploaded files are referenced by bare name inside the upload directory.
fn validate_file_name(file_name: &str) -> Result<()> {
    let mut components = Path::new(file_name).components();
    match (components.next(), components.next()) {
        (Some(std::path::Component::Normal(name)), None) if name == file_name => Ok(()),
        _ => Err(Error::InvalidInput(format!(
            "not a file name in the upload directory: {:?}",
            file_name
        ))),
    }
}
