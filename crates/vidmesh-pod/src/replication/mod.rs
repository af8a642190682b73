//! Catalog replication between pods.
//!
//! Outbound, the video service hands every catalog change to a
//! [`ReplicationClient`]. The production client, [`FloodNotifier`], floods
//! notifications onto a broadcast channel; a [`PeerForwarder`] drains it,
//! signs each notification and delivers it to every known peer. Delivery is
//! best-effort: no retries, no acknowledgement surfaced to the caller.
//!
//! Each peer has its own queue and delivery task, so one peer receives
//! notifications in the order they were issued.
//!
//! Inbound, a [`ReplicationListener`] accepts signed envelopes from peers,
//! checks the signature against the sender's pinned key, refuses stale or
//! replayed envelopes and applies the change through the video service.
//!
//! ```text
//! VideoService ──notify──→ FloodNotifier ──broadcast──→ PeerForwarder ──TCP──→ peers
//! peers ──TCP──→ ReplicationListener ──add_remote/remove_remote──→ VideoService
//! ```

mod envelope;
mod listener;
mod notifier;
mod replay;
mod trust;

pub use envelope::SignedEnvelope;
pub use listener::{ReplicationAck, ReplicationListener, MAX_ENVELOPE_LEN};
pub use notifier::{FloodNotifier, PeerForwarder};
pub use replay::{ReplayGuard, REPLAY_WINDOW};
pub use trust::{MemoryPeerKeys, PeerKeyStore};

use serde::{Deserialize, Serialize};

/// A peer's announcement of a video it originated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddAnnouncement {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub content_locator: String,
    pub origin_pod: String,
}

/// A peer's withdrawal of a video it originated.
///
/// The sender's address travels in the envelope and is the authorization
/// token checked against the record's origin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoveAnnouncement {
    pub content_locator: String,
}

/// A catalog change sent between pods.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    Add(AddAnnouncement),
    Remove(RemoveAnnouncement),
}

/// Outbound notification sink.
///
/// Both calls return immediately; the caller never observes delivery.
pub trait ReplicationClient: Send + Sync {
    /// Announce a locally originated video.
    fn notify_add(&self, announcement: AddAnnouncement);

    /// Announce the removal of a locally originated video.
    fn notify_remove(&self, announcement: RemoveAnnouncement);
}
