//! Error types for seeding.

use std::path::PathBuf;
use thiserror::Error;

/// Publishing a file into the swarm failed.
#[derive(Debug, Error)]
pub enum SeedError {
    /// The file could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The swarm refused or failed to take the content.
    #[error("swarm error: {0}")]
    Swarm(String),
}

/// Withdrawing content from the swarm failed.
#[derive(Debug, Error)]
pub enum WithdrawError {
    /// The locator was not being seeded (never published, or already withdrawn).
    #[error("locator is not seeded: {0}")]
    NotSeeded(String),

    /// Communication with the swarm failed.
    #[error("swarm error: {0}")]
    Swarm(String),
}
