//! Inbound replication: TCP server for peer notifications.
//!
//! Peers send one JSON [`SignedEnvelope`] per line and get one
//! [`ReplicationAck`] line back. A line longer than [`MAX_ENVELOPE_LEN`]
//! is refused and the connection closed.

use super::{Notification, PeerKeyStore, ReplayGuard, SignedEnvelope};
use crate::error::{Error, Result};
use crate::service::VideoService;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Longest envelope line accepted, newline excluded.
pub const MAX_ENVELOPE_LEN: usize = 64 * 1024;

/// Reply to one envelope.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReplicationAck {
    Ok,
    Error { error: String },
}

/// Replication server.
pub struct ReplicationListener {
    listener: TcpListener,
    service: Arc<VideoService>,
    peer_keys: Arc<dyn PeerKeyStore>,
    replay: Arc<ReplayGuard>,
}

impl ReplicationListener {
    /// Bind the replication server.
    pub async fn bind(
        addr: SocketAddr,
        service: Arc<VideoService>,
        peer_keys: Arc<dyn PeerKeyStore>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Replication listener on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            service,
            peer_keys,
            replay: Arc::new(ReplayGuard::default()),
        })
    }

    /// Address actually bound (useful with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept peer connections forever.
    pub async fn run(self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let service = Arc::clone(&self.service);
                    let peer_keys = Arc::clone(&self.peer_keys);
                    let replay = Arc::clone(&self.replay);
                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_connection(stream, service, peer_keys, replay).await
                        {
                            tracing::warn!("Replication connection {} error: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept replication connection: {}", e);
                }
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    service: Arc<VideoService>,
    peer_keys: Arc<dyn PeerKeyStore>,
    replay: Arc<ReplayGuard>,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();

    loop {
        line.clear();
        let read = (&mut reader)
            .take(MAX_ENVELOPE_LEN as u64 + 1)
            .read_until(b'\n', &mut line)
            .await?;
        if read == 0 {
            break;
        }

        if line.last() != Some(&b'\n') && read > MAX_ENVELOPE_LEN {
            let error = format!("envelope exceeds {} bytes", MAX_ENVELOPE_LEN);
            let ack = ReplicationAck::Error {
                error: error.clone(),
            };
            writer
                .write_all((serde_json::to_string(&ack)? + "\n").as_bytes())
                .await?;
            return Err(Error::InvalidInput(error));
        }

        let outcome = match serde_json::from_slice::<SignedEnvelope>(&line) {
            Ok(envelope) => apply(&envelope, &service, peer_keys.as_ref(), &replay).await,
            Err(e) => Err(Error::InvalidInput(format!("Invalid envelope: {}", e))),
        };

        let ack = match outcome {
            Ok(()) => ReplicationAck::Ok,
            Err(e) => {
                tracing::warn!("Rejected replication message: {}", e);
                ReplicationAck::Error {
                    error: e.to_string(),
                }
            }
        };

        let ack_json = serde_json::to_string(&ack)? + "\n";
        writer.write_all(ack_json.as_bytes()).await?;
    }

    Ok(())
}

/// Authenticate an envelope and apply its change to the catalog.
pub(crate) async fn apply(
    envelope: &SignedEnvelope,
    service: &VideoService,
    peer_keys: &dyn PeerKeyStore,
    replay: &ReplayGuard,
) -> Result<()> {
    let notification = envelope.open()?;

    if !peer_keys.pin_or_match(&envelope.sender, &envelope.public_key_bytes()?)? {
        return Err(Error::Unauthorized(format!(
            "key mismatch for pod {}",
            envelope.sender
        )));
    }
    replay.admit(envelope)?;

    match notification {
        Notification::Add(announcement) => {
            if announcement.origin_pod != envelope.sender {
                return Err(Error::Unauthorized(format!(
                    "{} cannot announce videos of {}",
                    envelope.sender, announcement.origin_pod
                )));
            }
            service.add_remote(announcement).await?;
        }
        Notification::Remove(announcement) => {
            service
                .remove_remote(&envelope.sender, &announcement.content_locator)
                .await?;
        }
    }

    Ok(())
}
