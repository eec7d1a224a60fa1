use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::{GatewayError, GatewayResult};
use crate::models::permission::PermissionRule;

pub const AUTH_CODE_STATUS_ACTIVE: i32 = 1;

/// One-time auth code record, fetched per use from the permission service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthCode {
    pub code: String,
    pub status: Option<i32>,
    /// Unix epoch milliseconds.
    pub expires_at: Option<i64>,
    pub max_uses: Option<i32>,
    pub used_count: Option<i32>,
    #[serde(default)]
    pub permissions: Vec<PermissionRule>,
}

impl AuthCode {
    /// Status, expiry and use-count checks. Path authorization against the
    /// permission list is the caller's concern (it needs the request).
    pub fn check_usable(&self) -> GatewayResult<()> {
        if self.status != Some(AUTH_CODE_STATUS_ACTIVE) {
            return Err(GatewayError::invalid("auth code is not active"));
        }
        if let Some(expires_at) = self.expires_at {
            if expires_at < Utc::now().timestamp_millis() {
                return Err(GatewayError::invalid("auth code expired"));
            }
        }
        if let (Some(max_uses), Some(used_count)) = (self.max_uses, self.used_count) {
            if used_count >= max_uses {
                return Err(GatewayError::invalid("auth code exceeded max uses"));
            }
        }
        Ok(())
    }
}
