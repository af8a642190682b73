//! Pod configuration.

use crate::error::{Error, Result};
use crate::service::ServiceConfig;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Configuration for a pod.
#[derive(Debug, Clone)]
pub struct PodConfig {
    /// Data directory for storage
    pub data_dir: PathBuf,

    /// Directory holding uploaded video files
    pub upload_dir: PathBuf,

    /// HTTP API listen address
    pub api_addr: SocketAddr,

    /// Replication listen address (peer notifications)
    pub replication_addr: SocketAddr,

    /// Address peers know this pod by, stamped on local videos
    pub public_address: String,

    /// Replication endpoints of peer pods
    pub peers: Vec<String>,

    /// Maximum concurrent publishes when reseeding
    pub seed_concurrency: usize,
}

impl PodConfig {
    /// Create config from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable lookup.
    pub fn from_lookup<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = PathBuf::from(var("POD_DATA_DIR").unwrap_or_else(|| "./pod-data".to_string()));

        let upload_dir = var("POD_UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("uploads"));

        let api_addr: SocketAddr = parse(&var, "POD_API_ADDR", "0.0.0.0:9000")?;
        let replication_addr: SocketAddr = parse(&var, "POD_REPLICATION_ADDR", "0.0.0.0:9001")?;

        let public_address = var("POD_PUBLIC_ADDRESS")
            .unwrap_or_else(|| format!("http://localhost:{}", api_addr.port()));

        let peers = var("POD_PEERS")
            .map(|s| {
                s.split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let seed_concurrency: usize = parse(&var, "POD_SEED_CONCURRENCY", "4")?;
        if seed_concurrency == 0 {
            return Err(Error::Config("POD_SEED_CONCURRENCY must be at least 1".into()));
        }

        Ok(Self {
            data_dir,
            upload_dir,
            api_addr,
            replication_addr,
            public_address,
            peers,
            seed_concurrency,
        })
    }

    /// Storage directory inside the data directory.
    pub fn db_dir(&self) -> PathBuf {
        self.data_dir.join("db")
    }

    /// The slice of configuration the video service needs.
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            pod_address: self.public_address.clone(),
            upload_dir: self.upload_dir.clone(),
            seed_concurrency: self.seed_concurrency,
        }
    }
}

fn parse<F, T>(var: &F, key: &str, default: &str) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = var(key).unwrap_or_else(|| default.to_string());
    raw.parse()
        .map_err(|e| Error::Config(format!("Invalid {} {:?}: {}", key, raw, e)))
}
