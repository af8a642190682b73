//! Catalog models.
//!
//! - [`VideoRecord`] - a catalog entry, locally originated or mirrored
//! - [`NewVideo`] - record fields before the store assigns an id
//! - [`VideoMetadata`] - user-supplied metadata for a local upload

mod video;

pub use video::{NewVideo, VideoMetadata, VideoRecord};
