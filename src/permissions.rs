use std::sync::Arc;
use std::time::Duration;

use crate::cache::{keys, TtlCache};
use crate::clients::PermissionClient;
use crate::errors::GatewayResult;
use crate::models::permission::{Classification, PermissionRule};

/// Fixed TTL for every permission partition.
pub const PERMISSION_TTL: Duration = Duration::from_secs(30 * 60);

/// Lazily-populated rule cache, one partition per classification and one per
/// role id. Concurrent misses for the same partition may each hit the remote
/// service; the first write wins and later results are discarded.
pub struct PermissionCache {
    client: Arc<dyn PermissionClient>,
    cache: TtlCache<Vec<PermissionRule>>,
}

impl PermissionCache {
    pub fn new(client: Arc<dyn PermissionClient>) -> Self {
        Self {
            client,
            cache: TtlCache::new(),
        }
    }

    fn partition(classification: Classification, role_id: Option<i64>) -> String {
        match role_id {
            Some(role_id) => role_id.to_string(),
            None => classification.code().to_string(),
        }
    }

    /// Rules for a classification (role-gated lookups pass the role id).
    /// Population failures fail this call only; nothing is cached.
    pub async fn get(
        &self,
        classification: Classification,
        role_id: Option<i64>,
    ) -> GatewayResult<Vec<PermissionRule>> {
        let key = keys::permissions(&Self::partition(classification, role_id));
        if let Some(rules) = self.cache.get(&key) {
            return Ok(rules);
        }

        // A role-gated lookup without a role has no partition to fill.
        if classification == Classification::Role && role_id.is_none() {
            return Ok(Vec::new());
        }

        let rules = match role_id {
            Some(role_id) => self.client.role_permissions(role_id).await?,
            None => self.client.permissions(classification).await?,
        };
        self.cache
            .insert_if_absent(key, rules.clone(), Some(PERMISSION_TTL));
        Ok(rules)
    }

    pub fn evict_role(&self, role_id: i64) {
        self.cache.remove(&keys::permissions(&role_id.to_string()));
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn partition_count(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::errors::GatewayError;
    use crate::models::auth_code::AuthCode;

    struct CountingClient {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl PermissionClient for CountingClient {
        async fn permissions(
            &self,
            classification: Classification,
        ) -> GatewayResult<Vec<PermissionRule>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(GatewayError::connect("permission service down"));
            }
            Ok(vec![PermissionRule::new("/open/**", None, classification)])
        }

        async fn role_permissions(&self, _role_id: i64) -> GatewayResult<Vec<PermissionRule>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![PermissionRule::new(
                "/upms/**",
                Some("GET"),
                Classification::Role,
            )])
        }

        async fn auth_code(&self, _code: &str) -> GatewayResult<Option<AuthCode>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let client = Arc::new(CountingClient {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let cache = PermissionCache::new(client.clone());

        cache.get(Classification::Whitelist, None).await.unwrap();
        cache.get(Classification::Whitelist, None).await.unwrap();
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn role_lookup_without_role_returns_empty() {
        let client = Arc::new(CountingClient {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let cache = PermissionCache::new(client.clone());

        let rules = cache.get(Classification::Role, None).await.unwrap();
        assert!(rules.is_empty());
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fetch_failure_does_not_poison_the_partition() {
        let failing = Arc::new(CountingClient {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let cache = PermissionCache::new(failing.clone());

        assert!(cache.get(Classification::Whitelist, None).await.is_err());
        assert_eq!(cache.partition_count(), 0);
        // The next request retries instead of seeing a cached failure.
        assert!(cache.get(Classification::Whitelist, None).await.is_err());
        assert_eq!(failing.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn eviction_forces_refetch() {
        let client = Arc::new(CountingClient {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let cache = PermissionCache::new(client.clone());

        cache.get(Classification::Role, Some(7)).await.unwrap();
        cache.evict_role(7);
        cache.get(Classification::Role, Some(7)).await.unwrap();
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }
}
