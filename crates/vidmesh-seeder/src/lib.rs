//! Vidmesh Seeder - content publication into the swarm
//!
//! A pod makes a video's bytes fetchable by publishing the file into a
//! content-distribution swarm. Publishing yields a locator, a
//! content-addressed URI that is the only identifier shared by every pod in
//! the federation.
//!
//! This crate provides:
//! - The [`ContentSeeder`] contract consumed by the pod's video service
//! - Typed publish/withdraw errors ([`SeedError`], [`WithdrawError`])
//! - Locator construction and parsing ([`locator`])
//! - [`LocalSeeder`], an in-process seeder keyed by blake3 content hash
//!
//! # Example
//!
//! ```rust,ignore
//! use vidmesh_seeder::{ContentSeeder, LocalSeeder};
//!
//! let seeder = LocalSeeder::new();
//! let locator = seeder.publish("/srv/uploads/v1.mp4".as_ref()).await?;
//! seeder.withdraw(&locator).await?;
//! ```

pub mod error;
pub mod local;
pub mod locator;

use async_trait::async_trait;
use std::path::Path;

pub use error::{SeedError, WithdrawError};
pub use local::LocalSeeder;

/// Publishes local files into the swarm and withdraws them again.
///
/// Implementations must be safe to share across tasks; the video service
/// calls them concurrently during bulk reseeding.
#[async_trait]
pub trait ContentSeeder: Send + Sync {
    /// Publish the file at `path`, returning its swarm locator.
    async fn publish(&self, path: &Path) -> Result<String, SeedError>;

    /// Stop seeding the content identified by `locator`.
    ///
    /// An unknown locator is reported as [`WithdrawError::NotSeeded`] so
    /// callers can tell it apart from a swarm failure.
    async fn withdraw(&self, locator: &str) -> Result<(), WithdrawError>;
}
