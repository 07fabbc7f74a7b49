use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitDetail {
    pub oid: String,
    pub message: String,
    pub author: AuthorInfo,
    pub committer: AuthorInfo,
    pub author_time: i64,
    pub commit_time: i64,
    pub parents: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorInfo {
    pub name: String,
    pub email: String,
}

/// Change history of the files a commit touches, split at the commit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ChangeStatistic {
    /// Commits touching the file up to and including this one
    pub past_changes: u64,
    /// Commits touching the file after this one
    pub future_changes: u64,
    /// Distinct author names (not committers) among the past changes
    pub past_authors: u64,
    /// Distinct author names (not committers) among the future changes
    pub future_authors: u64,
}

impl ChangeStatistic {
    pub fn add(&mut self, other: &ChangeStatistic) {
        self.past_changes += other.past_changes;
        self.future_changes += other.future_changes;
        self.past_authors += other.past_authors;
        self.future_authors += other.future_authors;
    }
}
