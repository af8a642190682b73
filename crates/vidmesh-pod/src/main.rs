//! Pod node binary
//!
//! A vidmesh pod serving and mirroring a federated video catalog.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vidmesh_pod::{PodConfig, PodNode};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pod_node=info,vidmesh_pod=info,vidmesh_seeder=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting pod node");

    let config = PodConfig::from_env()?;

    let node = PodNode::new(config).await?;
    node.run().await?;

    Ok(())
}
