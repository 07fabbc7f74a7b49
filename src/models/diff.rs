//! Diff-related data types.
//!
//! - `CommitDiff`: a commit's changes against its first parent
//! - `FileDelta`: a single file's change record with its hunks and blob text
//! - `DiffHunk`: contiguous block of changed lines
//! - `DiffLineEvent`: one line of a hunk with its origin and line numbers
//!
//! Consumed by the attribution pipeline; never persisted as-is.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitDiff {
    pub commit: String,
    /// First parent, `None` for an initial commit (diffed against the empty tree)
    pub parent: Option<String>,
    pub files: Vec<FileDelta>,
    pub stats: DiffStats,
    /// Full unified patch text, lossily decoded
    pub patch: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDelta {
    pub old_path: Option<String>,
    pub new_path: Option<String>,
    pub status: DiffStatus,
    pub hunks: Vec<DiffHunk>,
    pub old_content: Option<String>,
    pub new_content: Option<String>,
    pub is_binary: bool,
}

impl FileDelta {
    /// Path the file is known by after the change, falling back to the old path for deletions.
    pub fn path(&self) -> Option<&str> {
        self.new_path.as_deref().or(self.old_path.as_deref())
    }

    /// Path the file had at the parent commit.
    pub fn blame_path(&self) -> Option<&str> {
        self.old_path.as_deref().or(self.new_path.as_deref())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiffStatus {
    Added,
    Deleted,
    Modified,
    Renamed,
    Copied,
    TypeChanged,
    Unmodified,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffHunk {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    pub header: String,
    pub lines: Vec<DiffLineEvent>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiffLineEvent {
    pub origin: LineOrigin,
    pub old_lineno: Option<u32>,
    pub new_lineno: Option<u32>,
}

impl DiffLineEvent {
    pub fn context(old_lineno: u32, new_lineno: u32) -> Self {
        Self {
            origin: LineOrigin::Context,
            old_lineno: Some(old_lineno),
            new_lineno: Some(new_lineno),
        }
    }

    pub fn addition(new_lineno: u32) -> Self {
        Self {
            origin: LineOrigin::Addition,
            old_lineno: None,
            new_lineno: Some(new_lineno),
        }
    }

    pub fn deletion(old_lineno: u32) -> Self {
        Self {
            origin: LineOrigin::Deletion,
            old_lineno: Some(old_lineno),
            new_lineno: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LineOrigin {
    Context,
    Addition,
    Deletion,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub files_changed: usize,
    pub insertions: usize,
    pub deletions: usize,
    pub hunks: usize,
}

impl DiffStats {
    pub fn changes(&self) -> usize {
        self.insertions + self.deletions
    }
}
