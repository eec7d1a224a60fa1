pub mod admin;
pub mod clean;
pub mod fallback;
pub mod health;
