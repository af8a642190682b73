//! Error types for the pod.

use std::path::PathBuf;
use thiserror::Error;
use vidmesh_seeder::SeedError;

/// Result type for pod operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in pod operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Lookup miss
    #[error("Not found: {0}")]
    NotFound(String),

    /// Ownership mismatch on a remove path
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Publishing into the swarm failed
    #[error("Seed error: {0}")]
    Seed(#[from] SeedError),

    /// Catalog store failure
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The underlying video file could not be deleted
    #[error("Cannot remove {}: {source}", .path.display())]
    FileRemoval {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record with the same content locator already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for Error {
    fn from(e: rocksdb::Error) -> Self {
        Error::Persistence(e.to_string())
    }
}
