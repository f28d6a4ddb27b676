/// Thread-safety analysis errors
use thiserror::Error;

use crate::shared::models::ProcName;

#[derive(Debug, Error)]
pub enum ThreadSafetyError {
    /// Broken calling convention in the analyzed IR; aborts the analysis
    #[error("Internal invariant violated at {location}: {message}")]
    InvariantViolation { location: String, message: String },

    #[error("Fixpoint did not converge for {proc_name} after {iterations} iterations")]
    FixpointDiverged { proc_name: ProcName, iterations: usize },

    #[error("Malformed CFG in {proc_name}: {reason}")]
    MalformedCfg { proc_name: ProcName, reason: String },
}

impl ThreadSafetyError {
    pub fn invariant(location: impl ToString, message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            location: location.to_string(),
            message: message.into(),
        }
    }

    /// Errors after which the procedure gets an empty summary and the
    /// analysis moves on
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ThreadSafetyError::InvariantViolation { .. })
    }
}

pub type Result<T> = std::result::Result<T, ThreadSafetyError>;
