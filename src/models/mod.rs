//! Plain data types shared across the miner.
//!
//! - `diff`: CommitDiff, FileDelta, DiffHunk, DiffLineEvent
//! - `blame`: BlameRecord for per-line authorship
//! - `function`: FunctionSpan and its added/deleted/modified state
//! - `commit`: CommitDetail metadata and ChangeStatistic
//! - `attribution`: vote results and the per-commit report

pub mod attribution;
pub mod blame;
pub mod commit;
pub mod diff;
pub mod function;

pub use attribution::*;
pub use blame::*;
pub use commit::*;
pub use diff::*;
pub use function::*;
