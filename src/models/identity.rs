use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Verified caller identity as returned by the identity service. Cached
/// keyed by a one-way hash of the raw credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub user_id: i64,
    pub role_id: i64,
    pub tenant_id: Option<i64>,
    /// Credential expiry, unix epoch milliseconds.
    pub expires_at: i64,
}

impl Identity {
    pub fn remaining_millis(&self) -> i64 {
        self.expires_at - Utc::now().timestamp_millis()
    }

    pub fn is_expired(&self) -> bool {
        self.remaining_millis() <= 0
    }
}
