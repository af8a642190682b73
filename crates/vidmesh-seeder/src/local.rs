//! In-process seeder.
//!
//! Keeps a registry of published content keyed by locator. The locator hash
//! is computed by streaming the file through blake3, so the same bytes always
//! produce the same locator and re-publishing after a restart is idempotent.

use crate::error::{SeedError, WithdrawError};
use crate::locator;
use crate::ContentSeeder;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tokio::sync::RwLock;

const READ_CHUNK: usize = 64 * 1024;

/// A file currently being seeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededContent {
    /// Path the content is served from
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
}

/// Seeder that tracks published content in memory.
#[derive(Debug, Default)]
pub struct LocalSeeder {
    seeded: RwLock<HashMap<String, SeededContent>>,
}

impl LocalSeeder {
    /// Create an empty seeder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `locator` is currently seeded.
    pub async fn is_seeded(&self, locator: &str) -> bool {
        self.seeded.read().await.contains_key(locator)
    }

    /// Number of locators currently seeded.
    pub async fn seeded_count(&self) -> usize {
        self.seeded.read().await.len()
    }

    async fn hash_file(path: &Path) -> std::io::Result<(blake3::Hash, u64)> {
        let mut file = tokio::fs::File::open(path).await?;
        let mut hasher = blake3::Hasher::new();
        let mut buf = vec![0u8; READ_CHUNK];
        let mut size = 0u64;

        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            size += n as u64;
        }

        Ok((hasher.finalize(), size))
    }
}

#[async_trait]
impl ContentSeeder for LocalSeeder {
    async fn publish(&self, path: &Path) -> Result<String, SeedError> {
        tracing::info!("Seeding {}...", path.display());

        let (hash, size) = Self::hash_file(path).await.map_err(|source| SeedError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let uri = locator::magnet_uri(&hash, &display_name);

        let previous = self.seeded.write().await.insert(
            uri.clone(),
            SeededContent {
                path: path.to_path_buf(),
                size,
            },
        );
        if previous.is_some() {
            tracing::debug!("{} was already seeded, refreshed", uri);
        }

        tracing::info!("{} seeded ({}, {} bytes)", path.display(), uri, size);
        Ok(uri)
    }

    async fn withdraw(&self, locator: &str) -> Result<(), WithdrawError> {
        match self.seeded.write().await.remove(locator) {
            Some(content) => {
                tracing::info!("Stopped seeding {} ({})", locator, content.path.display());
                Ok(())
            }
            None => Err(WithdrawError::NotSeeded(locator.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn publish_then_withdraw() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("v1.mp4");
        std::fs::write(&path, b"some video bytes").unwrap();

        let seeder = LocalSeeder::new();
        let uri = seeder.publish(&path).await.unwrap();

        assert!(seeder.is_seeded(&uri).await);
        assert_eq!(
            locator::info_hash(&uri),
            Some(*blake3::hash(b"some video bytes").as_bytes())
        );

        seeder.withdraw(&uri).await.unwrap();
        assert!(!seeder.is_seeded(&uri).await);
    }

    #[tokio::test]
    async fn republish_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("v1.mp4");
        std::fs::write(&path, vec![7u8; 3 * READ_CHUNK + 11]).unwrap();

        let seeder = LocalSeeder::new();
        let first = seeder.publish(&path).await.unwrap();
        let second = seeder.publish(&path).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(seeder.seeded_count().await, 1);
    }

    #[tokio::test]
    async fn missing_file_is_a_read_error() {
        let dir = tempdir().unwrap();
        let seeder = LocalSeeder::new();

        let err = seeder
            .publish(&dir.path().join("absent.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, SeedError::Read { .. }));
        assert_eq!(seeder.seeded_count().await, 0);
    }

    #[tokio::test]
    async fn withdraw_unknown_locator_is_not_seeded() {
        let seeder = LocalSeeder::new();
        let err = seeder.withdraw("magnet:?xt=urn:blake3:00").await.unwrap_err();
        assert!(matches!(err, WithdrawError::NotSeeded(_)));
    }
}
