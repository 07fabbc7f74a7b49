//! Streaming majority vote over blamed commit ids.
//!
//! A later candidate replaces the leader only by strictly exceeding its count,
//! so ties go to whichever commit reached the count first.

use std::collections::HashMap;

use crate::models::{AttributionResult, VoteCount};

#[derive(Debug, Default)]
pub struct AttributionVoter {
    counts: Vec<VoteCount>,
    index: HashMap<String, usize>,
    leader: Option<usize>,
}

impl AttributionVoter {
    pub fn add(&mut self, commit_id: &str) {
        let idx = match self.index.get(commit_id) {
            Some(&idx) => idx,
            None => {
                self.counts.push(VoteCount {
                    commit_id: commit_id.to_string(),
                    votes: 0,
                });
                let idx = self.counts.len() - 1;
                self.index.insert(commit_id.to_string(), idx);
                idx
            }
        };
        self.counts[idx].votes += 1;

        let leading_votes = self.leader.map(|l| self.counts[l].votes).unwrap_or(0);
        if self.counts[idx].votes > leading_votes {
            self.leader = Some(idx);
        }
    }

    /// Provisional winner and its vote count.
    pub fn leader(&self) -> Option<(&str, usize)> {
        self.leader
            .map(|idx| (self.counts[idx].commit_id.as_str(), self.counts[idx].votes))
    }

    /// Final winner with every count, `None` when no vote was cast.
    pub fn finish(self) -> Option<AttributionResult> {
        let blamed_commit_id = self.leader()?.0.to_string();
        Some(AttributionResult {
            blamed_commit_id,
            vote_counts: self.counts,
        })
    }
}
