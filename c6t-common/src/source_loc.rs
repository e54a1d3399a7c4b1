//! Source location tracking for diagnostics
//!
//! IR is strictly line oriented, so a location is a file name and a
//! 1-based line number.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A line in an IR input file (1-based; line 0 means "before the first line")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub filename: String,
    pub line: u32,
}

impl SourceLocation {
    pub fn new(filename: &str, line: u32) -> Self {
        Self {
            filename: filename.to_string(),
            line,
        }
    }

    /// Location used when the IR does not come from a named file
    pub fn stdin() -> Self {
        Self::new("<stdin>", 0)
    }

    /// Move to the next input line
    pub fn advance(&mut self) {
        self.line += 1;
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.filename, self.line)
    }
}
