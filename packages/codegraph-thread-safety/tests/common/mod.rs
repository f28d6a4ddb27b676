//! Common test utilities for codegraph-thread-safety
//!
//! This module provides IR builders and assertions for integration tests.

#![allow(dead_code)]

mod assertions;
mod builders;

// Re-export all utilities
pub use assertions::*;
pub use builders::*;
