//! Checker configuration
//!
//! - `ThreadSafetyConfig`: typed settings with serde defaults and `validate()`
//! - YAML v1 files (`version: 1` plus a `thread_safety:` section)
//!
//! # Examples
//!
//! ```rust,ignore
//! use codegraph_thread_safety::config::ThreadSafetyConfig;
//!
//! let config = ThreadSafetyConfig::default()
//!     .report_read_write_races(false)
//!     .custom_initializer("com.app.Widget", "setup");
//! config.validate()?;
//!
//! let config = ThreadSafetyConfig::from_yaml("thread-safety.yaml")?;
//! ```

pub mod error;
pub mod io;
pub mod thread_safety_config;

// Re-exports
pub use error::{ConfigError, ConfigResult};
pub use io::ConfigFileV1;
pub use thread_safety_config::{MethodRef, ThreadSafetyConfig};
