use crate::errors::GatewayError;

/// Cookie attributes for the token cookie. Loaded once at startup, read-only
/// afterwards.
#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub token_name: String,
    pub max_age_secs: i64,
    /// Remaining-lifetime threshold below which the cookie is renewed.
    pub refresh_threshold_secs: i64,
    pub path: String,
    pub http_only: bool,
    pub secure: bool,
    pub auto_refresh: bool,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            token_name: "TOKEN".to_string(),
            max_age_secs: 1800,
            refresh_threshold_secs: 300,
            path: "/".to_string(),
            http_only: true,
            secure: false,
            auto_refresh: true,
        }
    }
}

impl CookieConfig {
    pub fn from_env() -> Result<Self, GatewayError> {
        let defaults = Self::default();
        Ok(Self {
            token_name: env_or("GATEWAY_COOKIE_NAME", defaults.token_name),
            max_age_secs: env_parse("GATEWAY_COOKIE_MAX_AGE", defaults.max_age_secs)?,
            refresh_threshold_secs: env_parse(
                "GATEWAY_COOKIE_REFRESH_THRESHOLD",
                defaults.refresh_threshold_secs,
            )?,
            path: env_or("GATEWAY_COOKIE_PATH", defaults.path),
            http_only: env_parse("GATEWAY_COOKIE_HTTP_ONLY", defaults.http_only)?,
            secure: env_parse("GATEWAY_COOKIE_SECURE", defaults.secure)?,
            auto_refresh: env_parse("GATEWAY_COOKIE_AUTO_REFRESH", defaults.auto_refresh)?,
        })
    }
}

/// Process-wide gateway settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub port: u16,
    /// Base URL of the identity (SSO) service.
    pub sso_base_url: String,
    /// Base URL of the permission (UPMS) service.
    pub upms_base_url: String,
    /// Remote config endpoint serving the route document, if any.
    pub route_config_url: Option<String>,
    pub cookie: CookieConfig,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, GatewayError> {
        let sso_base_url = std::env::var("GATEWAY_SSO_URL")
            .map_err(|_| GatewayError::configuration("GATEWAY_SSO_URL not set"))?;
        let upms_base_url = std::env::var("GATEWAY_UPMS_URL")
            .map_err(|_| GatewayError::configuration("GATEWAY_UPMS_URL not set"))?;

        Ok(Self {
            port: env_parse("GATEWAY_PORT", 8000)?,
            sso_base_url,
            upms_base_url,
            route_config_url: std::env::var("GATEWAY_ROUTE_CONFIG_URL").ok(),
            cookie: CookieConfig::from_env()?,
        })
    }
}

fn env_or(name: &str, default: String) -> String {
    std::env::var(name).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> Result<T, GatewayError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| GatewayError::configuration(format!("{name} has an invalid value"))),
        Err(_) => Ok(default),
    }
}
