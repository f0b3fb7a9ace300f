// Library exports for the CLI and integration tests

pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use services::RouteDraftService;
