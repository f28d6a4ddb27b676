//! Violation reports handed to the diagnostic sink

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::shared::models::{Location, ProcName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    UnprotectedWrite,
    ReadWriteRace,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::UnprotectedWrite => "UNPROTECTED_WRITE",
            IssueKind::ReadWriteRace => "READ_WRITE_RACE",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of the explanation from the reporting procedure to the access
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TraceHop {
    pub location: Location,
    pub description: String,
}

impl TraceHop {
    pub fn new(location: Location, description: impl Into<String>) -> Self {
        Self {
            location,
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: IssueKind,
    pub proc_name: ProcName,
    pub location: Location,
    pub message: String,
    /// Access path as printed in the message, e.g. `this.x`
    pub access: String,
    /// Conflicting writers (read/write races only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<ProcName>,
    pub trace: Vec<TraceHop>,
}

impl Diagnostic {
    /// Deterministic report order: location, kind, procedure
    pub fn sort_key(&self) -> (&Location, IssueKind, &ProcName) {
        (&self.location, self.kind, &self.proc_name)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.location, self.kind, self.message)
    }
}
