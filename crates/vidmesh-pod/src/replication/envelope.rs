//! Signed envelopes for inter-pod notifications.
//!
//! The signature covers `sender \n sent_at \n body`, binding the
//! notification to the address it claims to come from and to the moment it
//! was sealed. Receivers use `sent_at` to refuse stale or replayed envelopes
//! (see [`ReplayGuard`](super::ReplayGuard)).

use super::Notification;
use crate::error::{Error, Result};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// A notification as it travels between pods.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignedEnvelope {
    /// Address of the sending pod
    pub sender: String,
    /// Hex-encoded ed25519 public key of the sender
    pub public_key: String,
    /// Unix time in milliseconds when the envelope was sealed
    pub sent_at: u64,
    /// Hex-encoded signature over `sender \n sent_at \n body`
    pub signature: String,
    /// JSON-encoded [`Notification`]
    pub body: String,
}

fn signed_bytes(sender: &str, sent_at: u64, body: &str) -> Vec<u8> {
    let sent_at = sent_at.to_string();
    let mut bytes = Vec::with_capacity(sender.len() + sent_at.len() + 2 + body.len());
    bytes.extend_from_slice(sender.as_bytes());
    bytes.push(b'\n');
    bytes.extend_from_slice(sent_at.as_bytes());
    bytes.push(b'\n');
    bytes.extend_from_slice(body.as_bytes());
    bytes
}

/// Current unix time in milliseconds.
pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl SignedEnvelope {
    /// Sign a notification on behalf of `sender`, stamped with the current time.
    pub fn seal(key: &SigningKey, sender: &str, notification: &Notification) -> Result<Self> {
        Self::seal_at(key, sender, unix_millis(), notification)
    }

    /// Sign a notification with an explicit `sent_at` stamp.
    pub fn seal_at(
        key: &SigningKey,
        sender: &str,
        sent_at: u64,
        notification: &Notification,
    ) -> Result<Self> {
        let body = serde_json::to_string(notification)?;
        let signature = key.sign(&signed_bytes(sender, sent_at, &body));
        Ok(Self {
            sender: sender.to_string(),
            public_key: hex::encode(key.verifying_key().as_bytes()),
            sent_at,
            signature: hex::encode(signature.to_bytes()),
            body,
        })
    }

    /// Raw public key bytes.
    pub fn public_key_bytes(&self) -> Result<[u8; 32]> {
        hex::decode(&self.public_key)
            .ok()
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| Error::InvalidInput("malformed public key".into()))
    }

    /// Check the signature and decode the notification.
    pub fn open(&self) -> Result<Notification> {
        let key = VerifyingKey::from_bytes(&self.public_key_bytes()?)
            .map_err(|e| Error::InvalidInput(format!("invalid public key: {}", e)))?;

        let sig_bytes: [u8; 64] = hex::decode(&self.signature)
            .ok()
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| Error::InvalidInput("malformed signature".into()))?;
        let signature = Signature::from_bytes(&sig_bytes);

        key.verify(&signed_bytes(&self.sender, self.sent_at, &self.body), &signature)
            .map_err(|_| Error::Unauthorized(format!("bad signature from {}", self.sender)))?;

        Ok(serde_json::from_str(&self.body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replication::RemoveAnnouncement;
    use rand::rngs::OsRng;

    fn remove_notification() -> Notification {
        Notification::Remove(RemoveAnnouncement {
            content_locator: "locator://abc".into(),
        })
    }

    #[test]
    fn sealed_envelope_opens() {
        let key = SigningKey::generate(&mut OsRng);
        let envelope = SignedEnvelope::seal(&key, "http://pod-a", &remove_notification()).unwrap();

        assert_eq!(envelope.open().unwrap(), remove_notification());
        assert_eq!(
            envelope.public_key_bytes().unwrap(),
            key.verifying_key().to_bytes()
        );
    }

    #[test]
    fn changing_sender_breaks_signature() {
        let key = SigningKey::generate(&mut OsRng);
        let mut envelope =
            SignedEnvelope::seal(&key, "http://pod-a", &remove_notification()).unwrap();
        envelope.sender = "http://pod-b".into();

        assert!(matches!(envelope.open(), Err(Error::Unauthorized(_))));
    }

    #[test]
    fn changing_timestamp_breaks_signature() {
        let key = SigningKey::generate(&mut OsRng);
        let mut envelope =
            SignedEnvelope::seal_at(&key, "http://pod-a", 1_000, &remove_notification()).unwrap();
        envelope.sent_at = 2_000;

        assert!(matches!(envelope.open(), Err(Error::Unauthorized(_))));
    }

    #[test]
    fn changing_body_breaks_signature() {
        let key = SigningKey::generate(&mut OsRng);
        let mut envelope =
            SignedEnvelope::seal(&key, "http://pod-a", &remove_notification()).unwrap();
        envelope.body = envelope.body.replace("abc", "xyz");

        assert!(matches!(envelope.open(), Err(Error::Unauthorized(_))));
    }
}
