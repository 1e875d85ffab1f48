pub mod auth;
pub mod config;
pub mod delivery;
pub mod error;
pub mod models;
pub mod openapi;
pub mod otp;
pub mod otp_store;
pub mod password;
pub mod rate_limit; // in-memory rate limiting
pub mod repo;
pub mod routes;
pub mod security;
pub mod signup;
pub mod validation;

// Re-export commonly used items for tests / external users
pub use routes::{config, AppState};
pub use security::SecurityHeaders;
