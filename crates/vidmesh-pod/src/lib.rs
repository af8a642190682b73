//! Vidmesh Pod - Federated Video Catalog
//!
//! A pod originates videos backed by locally seeded content and mirrors the
//! catalogs of its peers. There is no central authority: the content locator
//! correlates records across pods and the origin address decides who may
//! remove them.
//!
//! # Architecture
//!
//! - **Models**: [`VideoRecord`] and its inputs
//! - **Store**: [`CatalogStore`] contract, RocksDB and in-memory backends
//! - **Replication**: fire-and-forget peer notifications, signed envelopes
//! - **Service**: [`VideoService`], the video lifecycle
//! - **API**: HTTP endpoints for clients
//!
//! # Example
//!
//! ```no_run
//! use vidmesh_pod::{PodConfig, PodNode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PodConfig::from_env()?;
//!     let node = PodNode::new(config).await?;
//!     node.run().await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod node;
pub mod replication;
pub mod service;
pub mod store;

#[cfg(test)]
mod testing;

pub use config::PodConfig;
pub use error::{Error, Result};
pub use models::{NewVideo, VideoMetadata, VideoRecord};
pub use node::PodNode;
pub use replication::{
    AddAnnouncement, FloodNotifier, Notification, PeerForwarder, RemoveAnnouncement,
    ReplicationClient, ReplicationListener,
};
pub use service::{ServiceConfig, VideoService};
pub use store::{CatalogStore, Insert, MemoryCatalog, PodStorage, VideoFilter};
