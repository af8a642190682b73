//! Content-addressed locators.
//!
//! Locators are magnet-style URIs carrying the blake3 hash of the content
//! and a display name: `magnet:?xt=urn:blake3:<hex>&dn=<name>`.

/// URN prefix of the exact-topic parameter.
pub const URN_PREFIX: &str = "urn:blake3:";

/// Build a locator from a content hash and a display name.
pub fn magnet_uri(hash: &blake3::Hash, display_name: &str) -> String {
    format!(
        "magnet:?xt={}{}&dn={}",
        URN_PREFIX,
        hex::encode(hash.as_bytes()),
        sanitize(display_name)
    )
}

/// Extract the content hash from a locator.
///
/// Returns `None` for anything that is not a well-formed blake3 magnet URI.
pub fn info_hash(locator: &str) -> Option<[u8; 32]> {
    let query = locator.strip_prefix("magnet:?")?;
    let topic = query
        .split('&')
        .find_map(|param| param.strip_prefix("xt="))?;
    let hex_hash = topic.strip_prefix(URN_PREFIX)?;
    let bytes = hex::decode(hex_hash).ok()?;
    bytes.try_into().ok()
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magnet_uri_carries_hash() {
        let hash = blake3::hash(b"video bytes");
        let uri = magnet_uri(&hash, "v1.mp4");

        assert!(uri.starts_with("magnet:?xt=urn:blake3:"));
        assert!(uri.ends_with("&dn=v1.mp4"));
        assert_eq!(info_hash(&uri), Some(*hash.as_bytes()));
    }

    #[test]
    fn display_name_is_sanitized() {
        let hash = blake3::hash(b"x");
        let uri = magnet_uri(&hash, "my clip&dn=evil.mp4");
        assert!(uri.ends_with("&dn=my_clip_dn_evil.mp4"));
    }

    #[test]
    fn info_hash_rejects_foreign_locators() {
        assert_eq!(info_hash("locator://abc"), None);
        assert_eq!(info_hash("magnet:?xt=urn:btih:00ff"), None);
        assert_eq!(info_hash("magnet:?xt=urn:blake3:zz"), None);
    }
}
