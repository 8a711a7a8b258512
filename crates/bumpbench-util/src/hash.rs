use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of `data`, used for image/artifact digest
/// bookkeeping.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
