//! Trust-on-first-use pinning of peer keys.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Mutex;

/// Remembers which public key speaks for which pod address.
pub trait PeerKeyStore: Send + Sync {
    /// Pin `public_key` for `pod_address` if none is pinned yet.
    ///
    /// Returns whether `public_key` is the key pinned for that address.
    fn pin_or_match(&self, pod_address: &str, public_key: &[u8; 32]) -> Result<bool>;
}

/// Key pins held in memory.
#[derive(Debug, Default)]
pub struct MemoryPeerKeys {
    pins: Mutex<HashMap<String, [u8; 32]>>,
}

impl MemoryPeerKeys {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PeerKeyStore for MemoryPeerKeys {
    fn pin_or_match(&self, pod_address: &str, public_key: &[u8; 32]) -> Result<bool> {
        let mut pins = self
            .pins
            .lock()
            .map_err(|_| Error::Persistence("peer key pins poisoned".into()))?;
        let pinned = pins
            .entry(pod_address.to_string())
            .or_insert(*public_key);
        Ok(pinned == public_key)
    }
}
