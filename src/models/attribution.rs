//! Attribution results and per-commit reports.
//!
//! - `AttributionResult`: winning blamed commit plus vote counts
//! - `CommitAttribution`: what the pipeline computes for one commit
//! - `CommitReport`: what the batch hands to the persistence sink

use serde::Serialize;
use std::collections::BTreeMap;

use super::{ChangeStatistic, CommitDetail, DiffStats, FunctionSpan};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VoteCount {
    pub commit_id: String,
    pub votes: usize,
}

/// Outcome of a majority vote. Vote counts are kept in first-seen order.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AttributionResult {
    pub blamed_commit_id: String,
    pub vote_counts: Vec<VoteCount>,
}

impl AttributionResult {
    pub fn votes_for(&self, commit_id: &str) -> usize {
        self.vote_counts
            .iter()
            .find(|v| v.commit_id == commit_id)
            .map(|v| v.votes)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributionOutcome {
    Blamed(AttributionResult),
    /// Every attributed line was freshly introduced or could not be blamed
    NoAttributionFound,
    /// The commit changes more lines than the configured limit
    Skipped { changes: usize },
}

impl AttributionOutcome {
    pub fn blamed_commit_id(&self) -> Option<&str> {
        match self {
            AttributionOutcome::Blamed(result) => Some(&result.blamed_commit_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CommitAttribution {
    pub commit: String,
    pub parent: Option<String>,
    pub outcome: AttributionOutcome,
    pub functions: Vec<FunctionSpan>,
    pub stats: DiffStats,
    /// Attribution targets dropped because blame could not resolve them
    pub skipped_lines: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportStatus {
    Attributed(CommitAttribution),
    Failed { reason: String },
}

/// One record per analyzed commit, written once to the sink.
#[derive(Debug, Clone, Serialize)]
pub struct CommitReport {
    pub commit: String,
    pub cve: Option<String>,
    pub detail: Option<CommitDetail>,
    pub result: ReportStatus,
    pub change_statistic: Option<ChangeStatistic>,
    pub patch_keywords: Option<BTreeMap<String, usize>>,
}

impl CommitReport {
    pub fn failed(commit: impl Into<String>, cve: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            commit: commit.into(),
            cve,
            detail: None,
            result: ReportStatus::Failed {
                reason: reason.into(),
            },
            change_statistic: None,
            patch_keywords: None,
        }
    }

    pub fn blamed_commit_id(&self) -> Option<&str> {
        match &self.result {
            ReportStatus::Attributed(attribution) => attribution.outcome.blamed_commit_id(),
            ReportStatus::Failed { .. } => None,
        }
    }
}
