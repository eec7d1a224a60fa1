//! Canonical header names shared between the filter stages, the forwarded
//! request, and the refresh-hint response.

/// Bearer credential header, also the target when a cookie token is adopted.
pub const X_TOKEN: &str = "x-token";
/// Forwarded downstream: resolved user id.
pub const X_CURRENT_USER: &str = "x-current-user";
/// Forwarded downstream: resolved username.
pub const X_TOKEN_USER: &str = "x-token-user";
/// Forwarded downstream: resolved tenant id (empty when absent).
pub const X_TOKEN_TENANT: &str = "x-token-tenant";
/// Response hint telling the client to run the renewal flow.
pub const X_REFRESH_TOKEN: &str = "x-refresh-token";
