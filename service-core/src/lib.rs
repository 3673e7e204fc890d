//! service-core: shared HTTP infrastructure for the storefront services.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
pub mod utils;

pub use axum;
pub use tracing;
