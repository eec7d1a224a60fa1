use std::sync::Arc;
use std::time::Duration;

use crate::cache::{keys, TtlCache};
use crate::clients::IdentityClient;
use crate::errors::{GatewayError, GatewayResult};
use crate::models::identity::Identity;
use crate::utils::hash_credential;

/// Resolves raw credentials to verified identities.
///
/// Cache layout mirrors the shared store: `gateway:token:<hash>` holds the
/// identity with a TTL bound to the credential's remaining lifetime, and
/// `gateway:user:<username>` points at the currently active hash so a new
/// login evicts the previous session's entry.
pub struct IdentityResolver {
    client: Arc<dyn IdentityClient>,
    tokens: TtlCache<Identity>,
    users: TtlCache<String>,
}

impl IdentityResolver {
    pub fn new(client: Arc<dyn IdentityClient>) -> Self {
        Self {
            client,
            tokens: TtlCache::new(),
            users: TtlCache::new(),
        }
    }

    pub async fn resolve(&self, raw_credential: &str) -> GatewayResult<Identity> {
        let hash = hash_credential(raw_credential);
        if let Some(identity) = self.tokens.get(&keys::token(&hash)) {
            return Ok(identity);
        }

        let identity = self.client.token_info(raw_credential).await?;

        let remaining = identity.remaining_millis();
        if remaining <= 0 {
            return Err(GatewayError::expired("credential already past expiry"));
        }

        // Single-active-session: drop the previous credential's entry before
        // repointing the user index. Not atomic; two concurrent logins for
        // the same user may race (tolerated).
        let user_key = keys::user(&identity.username);
        if let Some(previous_hash) = self.users.get(&user_key) {
            if previous_hash != hash {
                self.tokens.remove(&keys::token(&previous_hash));
                tracing::debug!(username = %identity.username, "rotated previous credential out of the cache");
            }
        }
        self.users.insert(user_key, hash.clone(), None);

        self.tokens.insert(
            keys::token(&hash),
            identity.clone(),
            Some(Duration::from_millis(remaining as u64)),
        );
        Ok(identity)
    }

    /// Cached identity for a credential, without any remote call.
    pub fn cached(&self, raw_credential: &str) -> Option<Identity> {
        self.tokens.get(&keys::token(&hash_credential(raw_credential)))
    }

    /// Extends both the cached entry's TTL and its recorded expiry. Used by
    /// the cookie refresh flow after the identity service confirms renewal.
    pub fn extend(&self, raw_credential: &str, extra: Duration) -> bool {
        let key = keys::token(&hash_credential(raw_credential));
        match self.tokens.get(&key) {
            Some(mut identity) => {
                identity.expires_at = crate::utils::now_millis() + extra.as_millis() as i64;
                self.tokens.insert(key, identity, Some(extra));
                true
            }
            None => false,
        }
    }

    /// Drops the cached identity for one credential (cache-clear surface).
    pub fn evict(&self, raw_credential: &str) -> bool {
        self.tokens
            .remove(&keys::token(&hash_credential(raw_credential)))
            .is_some()
    }

    pub fn cached_sessions(&self) -> usize {
        self.tokens.len()
    }

    /// Active credential hash for a username, if any.
    pub fn active_hash(&self, username: &str) -> Option<String> {
        self.users.get(&keys::user(username))
    }
}
