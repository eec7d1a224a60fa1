use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};

use crate::auth::resolver::IdentityResolver;
use crate::clients::IdentityClient;
use crate::config::CookieConfig;
use crate::headers;

/// Renews the token cookie when the cached credential is close to expiry.
pub struct CookieRefreshService {
    config: CookieConfig,
    resolver: Arc<IdentityResolver>,
    client: Arc<dyn IdentityClient>,
}

impl CookieRefreshService {
    pub fn new(
        config: CookieConfig,
        resolver: Arc<IdentityResolver>,
        client: Arc<dyn IdentityClient>,
    ) -> Self {
        Self {
            config,
            resolver,
            client,
        }
    }

    pub fn config(&self) -> &CookieConfig {
        &self.config
    }

    /// True only when auto-refresh is on, the credential has a cached
    /// identity inside the refresh window, and the identity service confirms
    /// it is renewable. Confirming also extends the cached identity to
    /// `now + max_age`.
    pub async fn needs_refresh(&self, token: &str) -> bool {
        if !self.config.auto_refresh {
            return false;
        }

        let Some(identity) = self.resolver.cached(token) else {
            return false;
        };

        let remaining_ms = identity.remaining_millis();
        if remaining_ms > self.config.refresh_threshold_secs * 1000 {
            return false;
        }
        tracing::debug!(remaining_secs = remaining_ms / 1000, "token cookie inside refresh window");

        match self.client.renew(token).await {
            Ok(true) => self
                .resolver
                .extend(token, Duration::from_secs(self.config.max_age_secs as u64)),
            Ok(false) => false,
            Err(err) => {
                tracing::warn!(error = %err, "cookie renewal check failed");
                false
            }
        }
    }

    /// Re-issues the token cookie with the configured attributes.
    pub fn refresh_cookie(&self, response_headers: &mut HeaderMap, token: &str) {
        append_cookie(
            response_headers,
            &self.build_cookie(&self.config.token_name, token, self.config.max_age_secs),
        );
    }

    /// Logout path: expire the token cookie and the refresh-hint cookie.
    pub fn clear_cookies(&self, response_headers: &mut HeaderMap) {
        append_cookie(
            response_headers,
            &self.build_cookie(&self.config.token_name, "", 0),
        );
        append_cookie(
            response_headers,
            &self.build_cookie(headers::X_REFRESH_TOKEN, "", 0),
        );
    }

    fn build_cookie(&self, name: &str, value: &str, max_age_secs: i64) -> String {
        let mut cookie = format!(
            "{name}={value}; Max-Age={max_age_secs}; Path={}",
            self.config.path
        );
        if self.config.http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.config.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

fn append_cookie(response_headers: &mut HeaderMap, cookie: &str) {
    if let Ok(value) = HeaderValue::from_str(cookie) {
        response_headers.append(SET_COOKIE, value);
    }
}

/// First value of the named cookie across all `Cookie` request headers.
pub fn cookie_value(request_headers: &HeaderMap, name: &str) -> Option<String> {
    for header in request_headers.get_all(COOKIE) {
        let Ok(raw) = header.to_str() else { continue };
        for pair in raw.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            if parts.next() == Some(name) {
                return Some(parts.next().unwrap_or_default().to_string());
            }
        }
    }
    None
}
