//! Source position tracking for IR errors
//! 
//! The IR core never reads source text itself, but whoever drives
//! construction (typically a parser) can hand positions to the builder
//! so that construction errors point back at the offending line.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in a source file (line and column are 1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourcePos {
    pub line: u32,
    pub column: u32,
}

impl SourcePos {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
