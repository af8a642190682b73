//! Freshness checks for inbound envelopes.
//!
//! An envelope is accepted once, and only while its `sent_at` stamp lies
//! within the window of the receiver's clock. Signatures seen inside the
//! window are remembered; older ones are dropped since the stamp check
//! already refuses them. The cache lives in memory, so a restarted pod
//! relies on the window alone.

use super::envelope::unix_millis;
use super::SignedEnvelope;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Default acceptance window around the receiver's clock.
pub const REPLAY_WINDOW: Duration = Duration::from_secs(300);

/// Refuses stale envelopes and envelopes already applied.
#[derive(Debug)]
pub struct ReplayGuard {
    window_ms: u64,
    seen: Mutex<HashMap<String, u64>>,
}

impl Default for ReplayGuard {
    fn default() -> Self {
        Self::new(REPLAY_WINDOW)
    }
}

impl ReplayGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            window_ms: window.as_millis() as u64,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Admit `envelope` unless it is stale or a replay.
    ///
    /// Call after the signature has been verified.
    pub fn admit(&self, envelope: &SignedEnvelope) -> Result<()> {
        self.admit_at(envelope, unix_millis())
    }

    fn admit_at(&self, envelope: &SignedEnvelope, now: u64) -> Result<()> {
        if now.abs_diff(envelope.sent_at) > self.window_ms {
            return Err(Error::Unauthorized(format!(
                "stale envelope from {} (sent at {}, now {})",
                envelope.sender, envelope.sent_at, now
            )));
        }

        let mut seen = self
            .seen
            .lock()
            .map_err(|_| Error::Persistence("replay cache poisoned".into()))?;
        let window_ms = self.window_ms;
        seen.retain(|_, sent_at| now.abs_diff(*sent_at) <= window_ms);

        if seen
            .insert(envelope.signature.clone(), envelope.sent_at)
            .is_some()
        {
            return Err(Error::Unauthorized(format!(
                "replayed envelope from {}",
                envelope.sender
            )));
        }
        Ok(())
    }
}
