//! Function span types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a function by the commit under analysis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FunctionState {
    #[default]
    Unset,
    Added,
    Deleted,
    Modified,
}

/// A named line range (1-indexed, inclusive) in one file snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionSpan {
    pub name: String,
    pub file_name: String,
    pub start_line: u32,
    pub end_line: u32,
    pub state: FunctionState,
}

impl FunctionSpan {
    pub fn new(name: impl Into<String>, start_line: u32, end_line: u32) -> Self {
        Self {
            name: name.into(),
            file_name: String::new(),
            start_line,
            end_line,
            state: FunctionState::Unset,
        }
    }

    /// Spans whose end is on or right after the signature line carry no body.
    pub fn is_declaration(&self) -> bool {
        self.start_line + 1 >= self.end_line
    }

    pub fn contains_line(&self, line: u32) -> bool {
        self.start_line <= line && line <= self.end_line
    }
}

impl fmt::Display for FunctionSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:?}): {}:{}:{}",
            self.name, self.state, self.file_name, self.start_line, self.end_line
        )
    }
}
