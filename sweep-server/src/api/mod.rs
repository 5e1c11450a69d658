//! HTTP API for the Wallet Sweep cache service

pub mod cache_admin;
pub mod error;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use routes::AppState;
pub use server::{ApiServer, ApiServerConfig};
