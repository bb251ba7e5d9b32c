use sha2::{Digest, Sha256};

const KEY_PREFIX_LEN: usize = 12;

/// Generate a fresh key, returning `(raw, prefix, hash)`; only the last two are stored.
pub fn generate_api_key() -> (String, String, String) {
    let raw = format!("pgc_{}", uuid::Uuid::new_v4().simple());
    let prefix = api_key_prefix(&raw);
    let hash = api_key_hash(&raw);
    (raw, prefix, hash)
}

pub fn api_key_prefix(raw: &str) -> String {
    raw.chars().take(KEY_PREFIX_LEN).collect()
}

pub fn api_key_hash(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare two secrets through their digests so timing does not depend on the common prefix.
pub fn secrets_match(provided: &str, expected: &str) -> bool {
    !expected.is_empty() && api_key_hash(provided) == api_key_hash(expected)
}
