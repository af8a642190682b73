//! Pod node - the main application entry point.
//!
//! Architecture:
//! - Single daemon process with shared RocksDB storage
//! - HTTP API for clients (list, get, search, add, remove)
//! - Replication listener for peer notifications
//! - Peer forwarder delivering this pod's catalog changes

use crate::api;
use crate::config::PodConfig;
use crate::error::Result;
use crate::replication::{FloodNotifier, PeerForwarder, ReplicationListener};
use crate::service::VideoService;
use crate::store::PodStorage;
use ed25519_dalek::SigningKey;
use std::sync::Arc;
use vidmesh_seeder::LocalSeeder;

/// Capacity of the outbound notification channel.
const FLOOD_CAPACITY: usize = 1024;

/// A pod instance.
pub struct PodNode {
    config: PodConfig,
    storage: Arc<PodStorage>,
    signing_key: SigningKey,
    notifier: FloodNotifier,
    service: Arc<VideoService>,
}

impl PodNode {
    /// Create a new pod.
    pub async fn new(config: PodConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        std::fs::create_dir_all(&config.upload_dir)?;

        let storage = Arc::new(PodStorage::open(config.db_dir())?);
        let signing_key = storage.get_or_create_node_key()?;
        let notifier = FloodNotifier::new(FLOOD_CAPACITY);

        let service = Arc::new(VideoService::new(
            config.service_config(),
            storage.clone(),
            Arc::new(LocalSeeder::new()),
            Arc::new(notifier.clone()),
        ));

        Ok(Self {
            config,
            storage,
            signing_key,
            notifier,
            service,
        })
    }

    /// The pod's video service.
    pub fn service(&self) -> Arc<VideoService> {
        Arc::clone(&self.service)
    }

    /// Run the pod (reseeds, starts replication and the HTTP server).
    pub async fn run(self) -> Result<()> {
        tracing::info!("Pod {} starting", self.config.public_address);
        tracing::info!("  API: http://{}", self.config.api_addr);
        tracing::info!("  Replication: {}", self.config.replication_addr);
        tracing::info!("  Uploads: {:?}", self.config.upload_dir);
        tracing::info!("  Peers: {:?}", self.config.peers);

        let forwarder = PeerForwarder::new(
            self.config.public_address.clone(),
            self.signing_key.clone(),
            self.config.peers.clone(),
        );
        tokio::spawn(forwarder.run(self.notifier.subscribe()));

        // Content survives restarts, swarm membership does not
        match self.service.seed_all_local().await {
            Ok(n) => tracing::info!("Reseeded {} local videos", n),
            Err(e) => tracing::error!("Reseeding incomplete: {}", e),
        }

        let listener = ReplicationListener::bind(
            self.config.replication_addr,
            self.service(),
            self.storage.clone(),
        )
        .await?;
        tokio::spawn(async move {
            if let Err(e) = listener.run().await {
                tracing::error!("Replication listener error: {}", e);
            }
        });

        let app = api::build_router(self.service());

        let listener = tokio::net::TcpListener::bind(self.config.api_addr).await?;
        tracing::info!("HTTP server listening on {}", self.config.api_addr);

        axum::serve(listener, app).await?;

        Ok(())
    }
}
