//! Bug-introducing commit attribution.
//!
//! - `classifier`: which old-file lines a diff line blames
//! - `voter`: majority vote over blamed commit ids
//! - `functions`: added/deleted/modified function classification
//! - `pipeline`: runs all of the above for one commit
//!
//! The pipeline talks to the outside world through three seams so it can be
//! driven by git in production and by fakes in tests.

pub mod classifier;
pub mod functions;
pub mod pipeline;
pub mod voter;

pub use pipeline::{AttributionPipeline, PipelineOptions, PipelineRun};

use crate::error::{BlameError, ParseError, Result};
use crate::git::FileBlame;
use crate::models::{CommitDiff, FunctionSpan};

/// Tree-to-tree diff of a commit against its first parent.
pub trait DiffSource {
    fn commit_diff(&self, commit: &str) -> Result<CommitDiff>;
}

/// Per-line authorship of a file as of a historical revision.
pub trait BlameSource {
    fn lines_for(&self, commit_ref: &str, path: &str) -> std::result::Result<FileBlame, BlameError>;
}

/// Named function spans of a file's full text.
pub trait SpanParser {
    fn spans(&self, path: &str, content: &str) -> std::result::Result<Vec<FunctionSpan>, ParseError>;
}
