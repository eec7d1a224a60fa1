pub mod app;
pub mod auth;
pub mod cache;
pub mod clients;
pub mod config;
pub mod errors;
pub mod filter;
pub mod headers;
pub mod matcher;
pub mod models;
pub mod permissions;
pub mod route;
pub mod routes;
pub mod utils;

// Re-export commonly used items for tests
pub use app::{build_state, create_app, AppState};
