//! Outbound replication: flood channel and peer forwarder.

use super::{
    AddAnnouncement, Notification, RemoveAnnouncement, ReplicationAck, ReplicationClient,
    SignedEnvelope,
};
use crate::error::{Error, Result};
use ed25519_dalek::SigningKey;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// How long one delivery (connect, write, ack) may take.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Sealed envelopes waiting for one peer before new ones are dropped.
pub const PEER_QUEUE_CAPACITY: usize = 256;

/// Replication client that floods notifications onto a broadcast channel.
///
/// With no subscriber attached the notification is dropped.
#[derive(Debug, Clone)]
pub struct FloodNotifier {
    flood_tx: broadcast::Sender<Notification>,
}

impl FloodNotifier {
    /// Create a notifier buffering up to `capacity` undelivered notifications.
    pub fn new(capacity: usize) -> Self {
        let (flood_tx, _) = broadcast::channel(capacity);
        Self { flood_tx }
    }

    /// Get a receiver for flooded notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.flood_tx.subscribe()
    }

    fn flood(&self, msg: Notification) {
        if self.flood_tx.send(msg).is_err() {
            debug!("No forwarder subscribed, notification dropped");
        }
    }
}

impl ReplicationClient for FloodNotifier {
    fn notify_add(&self, announcement: AddAnnouncement) {
        self.flood(Notification::Add(announcement));
    }

    fn notify_remove(&self, announcement: RemoveAnnouncement) {
        self.flood(Notification::Remove(announcement));
    }
}

/// Delivers flooded notifications to every known peer.
///
/// Every peer gets its own queue drained by one task, so a peer sees
/// notifications in the order they were flooded.
pub struct PeerForwarder {
    sender: String,
    signing_key: Arc<SigningKey>,
    peers: Vec<String>,
}

impl PeerForwarder {
    /// Create a forwarder speaking for `sender` (this pod's address).
    pub fn new(sender: String, signing_key: SigningKey, peers: Vec<String>) -> Self {
        Self {
            sender,
            signing_key: Arc::new(signing_key),
            peers,
        }
    }

    /// Drain `rx` until the notifier is dropped.
    pub async fn run(self, mut rx: broadcast::Receiver<Notification>) {
        info!("Peer forwarder started ({} peers)", self.peers.len());

        let queues: Vec<(String, mpsc::Sender<String>)> = self
            .peers
            .iter()
            .map(|peer| {
                let (tx, rx) = mpsc::channel(PEER_QUEUE_CAPACITY);
                tokio::spawn(drain_peer(peer.clone(), rx));
                (peer.clone(), tx)
            })
            .collect();

        loop {
            match rx.recv().await {
                Ok(msg) => self.forward(&msg, &queues),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Forwarder lagged, {} notifications lost", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }

        info!("Peer forwarder stopped");
    }

    /// Sign once and queue the envelope for each peer.
    fn forward(&self, msg: &Notification, queues: &[(String, mpsc::Sender<String>)]) {
        let line = match SignedEnvelope::seal(&self.signing_key, &self.sender, msg)
            .and_then(|envelope| Ok(serde_json::to_string(&envelope)? + "\n"))
        {
            Ok(line) => line,
            Err(e) => {
                warn!("Cannot seal notification: {}", e);
                return;
            }
        };

        for (peer, queue) in queues {
            match queue.try_send(line.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!("Queue for {} is full, notification dropped", peer);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    warn!("Delivery task for {} is gone", peer);
                }
            }
        }
    }
}

/// Deliver queued envelopes to `peer` one at a time.
async fn drain_peer(peer: String, mut rx: mpsc::Receiver<String>) {
    while let Some(line) = rx.recv().await {
        match timeout(DELIVERY_TIMEOUT, deliver(&peer, &line)).await {
            Ok(Ok(())) => debug!("Notified {}", peer),
            Ok(Err(e)) => warn!("Cannot notify {}: {}", peer, e),
            Err(_) => warn!("Notifying {} timed out", peer),
        }
    }
    debug!("Delivery to {} stopped", peer);
}

async fn deliver(peer: &str, line: &str) -> Result<()> {
    let stream = TcpStream::connect(peer).await?;
    let (reader, mut writer) = stream.into_split();
    writer.write_all(line.as_bytes()).await?;

    let mut ack = String::new();
    BufReader::new(reader).read_line(&mut ack).await?;
    match serde_json::from_str::<ReplicationAck>(&ack)? {
        ReplicationAck::Ok => Ok(()),
        ReplicationAck::Error { error } => Err(Error::Network(format!("peer refused: {}", error))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn notify_without_subscriber_is_silent() {
        let notifier = FloodNotifier::new(8);
        notifier.notify_remove(RemoveAnnouncement {
            content_locator: "locator://abc".into(),
        });
    }

    #[tokio::test]
    async fn notifications_reach_subscribers() {
        let notifier = FloodNotifier::new(8);
        let mut rx = notifier.subscribe();

        notifier.notify_add(AddAnnouncement {
            name: "clip1".into(),
            description: String::new(),
            content_locator: "locator://abc".into(),
            origin_pod: "http://pod-a:9000".into(),
        });

        match rx.recv().await.unwrap() {
            Notification::Add(a) => assert_eq!(a.content_locator, "locator://abc"),
            other => panic!("unexpected notification: {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn peer_sees_notifications_in_order() {
        use crate::replication::{MemoryPeerKeys, ReplicationListener};
        use crate::testing::{CountingStore, FakeSeeder, Harness};
        use rand::rngs::OsRng;

        let dir = tempfile::tempdir().unwrap();
        let peer = Harness::new(dir.path(), CountingStore::default(), FakeSeeder::returning("l"));
        let listener = ReplicationListener::bind(
            "127.0.0.1:0".parse().unwrap(),
            peer.service.clone(),
            Arc::new(MemoryPeerKeys::new()),
        )
        .await
        .unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(listener.run());

        let notifier = FloodNotifier::new(128);
        let forwarder = PeerForwarder::new(
            "http://pod-b".into(),
            SigningKey::generate(&mut OsRng),
            vec![addr],
        );
        tokio::spawn(forwarder.run(notifier.subscribe()));

        let announce = |locator: String| AddAnnouncement {
            name: "clip".into(),
            description: String::new(),
            content_locator: locator,
            origin_pod: "http://pod-b".into(),
        };
        for i in 0..20 {
            notifier.notify_add(announce(format!("locator://{}", i)));
            notifier.notify_remove(RemoveAnnouncement {
                content_locator: format!("locator://{}", i),
            });
        }
        notifier.notify_add(announce("locator://last".into()));

        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        loop {
            let videos = peer.service.list().await.unwrap();
            if videos.iter().any(|v| v.content_locator == "locator://last") {
                assert_eq!(videos.len(), 1, "left behind: {:?}", videos);
                break;
            }
            assert!(tokio::time::Instant::now() < deadline, "last add never arrived");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}
