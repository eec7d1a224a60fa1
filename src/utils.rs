use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// One-way hash of a raw credential, used only as a cache key.
pub fn hash_credential(raw: &str) -> String {
    let digest = Sha256::digest(raw.as_bytes());
    hex::encode(digest)
}

pub fn utc_now() -> DateTime<Utc> {
    Utc::now()
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
