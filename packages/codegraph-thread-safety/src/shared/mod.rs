//! Shared module - Common types
//!
//! Types shared across features. No analysis logic lives here.

pub mod models;

// Re-exports for convenience
pub use models::*;
