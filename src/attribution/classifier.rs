//! Maps diff lines to the old-file lines that should be blamed.
//!
//! Deleted lines are blamed directly. A pure insertion has no history of its
//! own, so the first line of an addition run blames the line right above the
//! insertion point instead. Subsequent additions in the same run add nothing.

use crate::models::{DiffLineEvent, LineOrigin};

/// Decision for a single diff line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineDecision {
    /// Old-file line whose last author should receive a vote
    pub attribute: Option<u32>,
    /// Line number touched by the change, for function tracking
    pub touched: Option<u32>,
}

/// Per-hunk state machine. Construct one per file under attribution.
#[derive(Debug, Default)]
pub struct LineClassifier {
    in_addition_block: bool,
}

impl LineClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset at a hunk boundary.
    pub fn start_hunk(&mut self) {
        self.in_addition_block = false;
    }

    pub fn classify(&mut self, event: &DiffLineEvent) -> LineDecision {
        match event.origin {
            LineOrigin::Deletion => {
                self.in_addition_block = false;
                LineDecision {
                    attribute: event.old_lineno.filter(|&n| n > 0),
                    touched: event.old_lineno,
                }
            }
            LineOrigin::Addition => {
                let attribute = if self.in_addition_block {
                    None
                } else {
                    self.in_addition_block = true;
                    event
                        .new_lineno
                        .and_then(|n| n.checked_sub(1))
                        .filter(|&n| n > 0)
                };
                LineDecision {
                    attribute,
                    touched: event.new_lineno,
                }
            }
            LineOrigin::Context => {
                self.in_addition_block = false;
                LineDecision::default()
            }
        }
    }
}
