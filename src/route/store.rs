use dashmap::DashMap;

use crate::matcher;
use crate::models::route::{normalize_path, RouteDefinition};

/// Shared route table: framework-native static routes fixed at startup plus
/// dynamic definitions written by the synchronizer. Dynamic entries win over
/// static ones sharing a normalized path predicate.
pub struct RouteStore {
    static_routes: Vec<RouteDefinition>,
    dynamic: DashMap<String, RouteDefinition>,
}

impl RouteStore {
    pub fn new(static_routes: Vec<RouteDefinition>) -> Self {
        Self {
            static_routes,
            dynamic: DashMap::new(),
        }
    }

    pub fn save(&self, route: RouteDefinition) {
        self.dynamic.insert(route.id.clone(), route);
    }

    pub fn delete(&self, id: &str) -> bool {
        self.dynamic.remove(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<RouteDefinition> {
        self.dynamic.get(id).map(|route| route.clone())
    }

    pub fn dynamic_is_empty(&self) -> bool {
        self.dynamic.is_empty()
    }

    pub fn dynamic_len(&self) -> usize {
        self.dynamic.len()
    }

    /// Merged view served to the proxying engine: unique by normalized path
    /// predicate, dynamic over static, ordered by route order then id.
    pub fn merged(&self) -> Vec<RouteDefinition> {
        let mut by_path: Vec<(Option<String>, RouteDefinition)> = Vec::new();

        let mut push = |route: RouteDefinition| {
            let path = route.path_pattern().map(|pattern| normalize_path(&pattern));
            if let Some(existing) = by_path
                .iter_mut()
                .find(|(existing_path, _)| path.is_some() && *existing_path == path)
            {
                existing.1 = route;
            } else {
                by_path.push((path, route));
            }
        };

        for route in &self.static_routes {
            push(route.clone());
        }
        let mut dynamic: Vec<RouteDefinition> =
            self.dynamic.iter().map(|entry| entry.value().clone()).collect();
        dynamic.sort_by(|a, b| a.id.cmp(&b.id));
        for route in dynamic {
            push(route);
        }

        let mut merged: Vec<RouteDefinition> = by_path.into_iter().map(|(_, route)| route).collect();
        merged.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        merged
    }

    /// The proxying engine's lookup: first merged route whose path predicate
    /// matches.
    pub fn route_for(&self, path: &str) -> Option<RouteDefinition> {
        self.merged().into_iter().find(|route| {
            route
                .path_pattern()
                .is_some_and(|pattern| matcher::matches(&pattern, path))
        })
    }
}
