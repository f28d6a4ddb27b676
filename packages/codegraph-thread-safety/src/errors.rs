//! Error types for codegraph-thread-safety
//!
//! Provides unified error handling across the crate.

use thiserror::Error;

use crate::config::ConfigError;
use crate::features::thread_safety::ThreadSafetyError;

/// Main error type for thread-safety checks
#[derive(Debug, Error)]
pub enum ThreadSafetyCheckError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Program input could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Analysis error
    #[error("Analysis error: {0}")]
    Analysis(#[from] ThreadSafetyError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ThreadSafetyCheckError {
    /// Exit status of the CLI for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            ThreadSafetyCheckError::Config(_) => 3,
            _ => 2,
        }
    }
}

/// Result type alias for checker operations
pub type Result<T> = std::result::Result<T, ThreadSafetyCheckError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::ProcName;

    #[test]
    fn test_conversions() {
        let err: ThreadSafetyCheckError = ThreadSafetyError::MalformedCfg {
            proc_name: ProcName::new("C", "m"),
            reason: "no exit".to_string(),
        }
        .into();
        assert!(matches!(err, ThreadSafetyCheckError::Analysis(_)));
        assert_eq!(err.exit_code(), 2);

        let err: ThreadSafetyCheckError = serde_json::from_str::<u32>("x").unwrap_err().into();
        assert!(err.to_string().starts_with("Parse error"));
    }
}
