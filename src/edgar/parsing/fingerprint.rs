use sha2::{Digest, Sha256};

/// Number of hex characters kept from the SHA-256 digest.
pub const FINGERPRINT_LEN: usize = 16;

/// Short deterministic hash of raw section or chart content, used as a dedup key.
///
/// Collisions are possible and not mitigated. Blank content has no fingerprint.
pub fn content_fingerprint(content: &str) -> Option<String> {
    if content.trim().is_empty() {
        return None;
    }

    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    Some(digest[..FINGERPRINT_LEN].to_string())
}
