//! Video record model.

use crate::replication::AddAnnouncement;
use serde::{Deserialize, Serialize};

/// A video in the pod's catalog.
///
/// `local_path` is present iff this pod originated the video and seeds its
/// file; mirrored records carry only metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VideoRecord {
    /// Pod-local identifier assigned by the catalog store
    pub id: String,

    /// Display name
    pub name: String,

    /// File name inside the upload directory (local videos only)
    pub local_path: Option<String>,

    /// Free text
    #[serde(default)]
    pub description: String,

    /// Swarm locator, the identifier shared by every pod
    pub content_locator: String,

    /// Address of the pod that created the video
    pub origin_pod: String,
}

impl VideoRecord {
    /// Whether this pod holds and seeds the file.
    pub fn is_local(&self) -> bool {
        self.local_path.is_some()
    }

    /// Metadata to announce to peers. Never carries the local path.
    pub fn announcement(&self) -> AddAnnouncement {
        AddAnnouncement {
            name: self.name.clone(),
            description: self.description.clone(),
            content_locator: self.content_locator.clone(),
            origin_pod: self.origin_pod.clone(),
        }
    }
}

/// Fields of a record about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVideo {
    pub name: String,
    pub local_path: Option<String>,
    pub description: String,
    pub content_locator: String,
    pub origin_pod: String,
}

impl NewVideo {
    /// Attach the store-assigned id.
    pub fn into_record(self, id: String) -> VideoRecord {
        VideoRecord {
            id,
            name: self.name,
            local_path: self.local_path,
            description: self.description,
            content_locator: self.content_locator,
            origin_pod: self.origin_pod,
        }
    }
}

impl From<AddAnnouncement> for NewVideo {
    fn from(a: AddAnnouncement) -> Self {
        Self {
            name: a.name,
            local_path: None,
            description: a.description,
            content_locator: a.content_locator,
            origin_pod: a.origin_pod,
        }
    }
}

/// Metadata supplied with an upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VideoMetadata {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_record() -> VideoRecord {
        NewVideo {
            name: "clip1".into(),
            local_path: Some("v1.mp4".into()),
            description: "first clip".into(),
            content_locator: "locator://abc".into(),
            origin_pod: "http://pod-a:9000".into(),
        }
        .into_record("1".into())
    }

    #[test]
    fn announcement_strips_local_path() {
        let record = local_record();
        assert!(record.is_local());

        let announced = serde_json::to_value(record.announcement()).unwrap();
        assert!(announced.get("local_path").is_none());
        assert_eq!(announced["content_locator"], "locator://abc");
        assert_eq!(announced["origin_pod"], "http://pod-a:9000");
    }

    #[test]
    fn mirrored_record_from_announcement() {
        let mirror = NewVideo::from(local_record().announcement()).into_record("7".into());
        assert!(!mirror.is_local());
        assert_eq!(mirror.name, "clip1");
        assert_eq!(mirror.origin_pod, "http://pod-a:9000");
    }
}
