use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One entry of the pushed route document, also the unit stored in the
/// shared route table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDefinition {
    pub id: String,
    pub uri: String,
    #[serde(default)]
    pub predicates: Vec<PredicateDefinition>,
    #[serde(default)]
    pub filters: Vec<FilterDefinition>,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateDefinition {
    pub name: String,
    #[serde(default)]
    pub args: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDefinition {
    pub name: String,
    #[serde(default)]
    pub args: BTreeMap<String, String>,
}

/// Where a route forwards to: a literal URL, or a logical service name
/// resolved through load-balanced lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTarget {
    Url(String),
    Service(String),
}

impl RouteDefinition {
    pub fn target(&self) -> RouteTarget {
        match self.uri.strip_prefix("lb://") {
            Some(service) => RouteTarget::Service(service.to_string()),
            None => RouteTarget::Url(self.uri.clone()),
        }
    }

    /// Path pattern of the first `Path` predicate, normalized to a leading
    /// slash. Routes without a path predicate have no position in the merged
    /// table.
    pub fn path_pattern(&self) -> Option<String> {
        self.predicates
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case("Path"))
            .and_then(|p| {
                p.args
                    .get("pattern")
                    .or_else(|| p.args.values().next())
            })
            .map(|pattern| normalize_path(pattern))
    }

    /// Number of leading path segments a `StripPrefix` filter removes.
    pub fn strip_prefix(&self) -> Option<usize> {
        self.filters
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case("StripPrefix"))
            .and_then(|f| {
                f.args
                    .get("parts")
                    .or_else(|| f.args.values().next())
            })
            .and_then(|parts| parts.parse().ok())
    }
}

pub fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}
