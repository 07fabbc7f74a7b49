//! Error types for every layer of the miner.
//!
//! - `AppError`: repository access, commit lookup, I/O (crate-level `Result`)
//! - `BlameError`: annotation command invocation and output parsing
//! - `ParseError`: function-span extraction from source text
//! - `AttributionError`: the only failure that aborts a whole commit
//!
//! Recovery happens at the finest grain: a `BlameError` costs one line, a
//! `ParseError` costs one file's spans, an `AttributionError` costs one commit.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Repository not found: {0}")]
    RepoNotFound(String),

    #[error("Commit not found: {0}")]
    CommitNotFound(String),

    #[error("Command failed: {0}")]
    Command(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum BlameError {
    #[error("could not start annotation command: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("annotation command failed: {0}")]
    CommandFailed(String),

    #[error("line {0} not found in blame")]
    NotFound(u32),

    #[error("malformed blame record at output line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("no grammar could be loaded for {0}")]
    Grammar(String),

    #[error("malformed source for function parsing: {0}")]
    MalformedSourceForFunctionParsing(String),
}

#[derive(Error, Debug)]
pub enum AttributionError {
    #[error("diff computation failed for {commit}: {source}")]
    DiffComputationFailed {
        commit: String,
        #[source]
        source: AppError,
    },
}
