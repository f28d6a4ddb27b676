//! Source location types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Single location in source code
///
/// Ordered by file, then line, then column so that diagnostics sort in
/// reading order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// Location at the start of a line
    pub fn line(file: impl Into<String>, line: u32) -> Self {
        Self::new(file, line, 0)
    }

    /// Unknown location (line 0)
    pub fn none(file: impl Into<String>) -> Self {
        Self::new(file, 0, 0)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_ordering() {
        let a = Location::line("A.java", 10);
        let b = Location::line("A.java", 12);
        let c = Location::line("B.java", 1);

        assert!(a < b);
        assert!(b < c);
        assert_eq!(a.to_string(), "A.java:10");
    }
}
