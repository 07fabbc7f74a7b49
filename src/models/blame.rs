//! Blame data types.
//!
//! Per-line authorship for a file as of a point in history, parsed from the
//! annotation command's porcelain output.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Authorship of a single line.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BlameRecord {
    /// OID of the commit that last modified this line (40 hex chars)
    pub commit_id: String,
    pub author: String,
    pub author_email: String,
    /// Unix timestamp of when this line was authored
    pub author_timestamp: i64,
    pub committer: String,
    pub committer_email: String,
    /// Parent commit the line was blamed through, absent for boundary commits
    pub previous_commit_id: Option<String>,
    pub previous_path: Option<String>,
    /// Line number in the commit that introduced it (1-indexed)
    pub original_line_number: u32,
    /// Line number in the annotated file (1-indexed)
    pub final_line_number: u32,
}

impl BlameRecord {
    pub fn authored_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.author_timestamp, 0)
    }
}
