//! service-core: Shared infrastructure for the media platform services.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
