use serde::{Deserialize, Serialize};

/// Access-rule category for a path. Each classification has its own cache
/// partition; role-gated rules are partitioned by role id instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// No authentication required.
    Whitelist,
    /// Any authenticated identity may pass.
    Login,
    /// The path accepts the token cookie in place of the bearer header.
    Cookie,
    /// The path accepts a one-time auth code in place of an identity.
    Temp,
    /// Requires a rule from the caller's role.
    #[serde(rename = "auth")]
    Role,
}

impl Classification {
    pub fn code(&self) -> &'static str {
        match self {
            Classification::Whitelist => "whitelist",
            Classification::Login => "login",
            Classification::Cookie => "cookie",
            Classification::Temp => "temp",
            Classification::Role => "auth",
        }
    }
}

/// A single (pattern, method) access rule. `method` of `None` matches any
/// method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRule {
    pub url: String,
    pub method: Option<String>,
    pub classification: Classification,
}

impl PermissionRule {
    pub fn new(
        url: impl Into<String>,
        method: Option<&str>,
        classification: Classification,
    ) -> Self {
        Self {
            url: url.into(),
            method: method.map(|m| m.to_uppercase()),
            classification,
        }
    }
}
