//! In-process pods wired over loopback TCP.

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use vidmesh_pod::replication::MemoryPeerKeys;
use vidmesh_pod::{
    FloodNotifier, MemoryCatalog, PeerForwarder, ReplicationListener, ServiceConfig, VideoService,
};
use vidmesh_seeder::LocalSeeder;

/// A pod whose replication listener is bound but whose forwarder is not yet running.
pub struct TestPod {
    pub address: String,
    pub service: Arc<VideoService>,
    pub seeder: Arc<LocalSeeder>,
    pub replication_addr: SocketAddr,
    notifier: FloodNotifier,
    signing_key: SigningKey,
}

impl TestPod {
    /// Bind a pod on an ephemeral loopback port.
    pub async fn start(address: &str, upload_dir: &Path) -> vidmesh_pod::Result<Self> {
        let notifier = FloodNotifier::new(64);
        let seeder = Arc::new(LocalSeeder::new());
        let service = Arc::new(VideoService::new(
            ServiceConfig {
                pod_address: address.to_string(),
                upload_dir: upload_dir.to_path_buf(),
                seed_concurrency: 2,
            },
            Arc::new(MemoryCatalog::new()),
            seeder.clone(),
            Arc::new(notifier.clone()),
        ));

        let listener = ReplicationListener::bind(
            "127.0.0.1:0".parse().expect("loopback address"),
            service.clone(),
            Arc::new(MemoryPeerKeys::new()),
        )
        .await?;
        let replication_addr = listener.local_addr()?;
        tokio::spawn(listener.run());

        Ok(Self {
            address: address.to_string(),
            service,
            seeder,
            replication_addr,
            notifier,
            signing_key: SigningKey::generate(&mut OsRng),
        })
    }

    /// Start forwarding this pod's notifications to `peers`.
    pub fn connect(&self, peers: Vec<String>) {
        let forwarder = PeerForwarder::new(self.address.clone(), self.signing_key.clone(), peers);
        tokio::spawn(forwarder.run(self.notifier.subscribe()));
    }
}

/// Poll `check` until it holds or `limit` elapses.
pub async fn eventually<F, Fut>(limit: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
