//! Per-file change statistics around a commit.
//!
//! Walks `git log --follow` for each file a commit touches (from HEAD of the
//! checkout) and splits the history at the commit: entries newer than it are
//! future changes, the commit itself and everything older are past changes.
//! Parsed logs are kept in the shared `HistoryCache`.

use std::collections::HashSet;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::git::cache::{CacheKey, FileHistory, HistoryCache, LogEntry};
use crate::models::{ChangeStatistic, CommitDiff, DiffStatus};

const FIELD_SEPARATOR: char = '\x1f';

pub struct FileHistoryLookup<'a> {
    workdir: &'a Path,
    repository: String,
    program: &'a str,
    cache: &'a dyn HistoryCache,
}

impl<'a> FileHistoryLookup<'a> {
    pub fn new(workdir: &'a Path, repository: impl Into<String>, program: &'a str, cache: &'a dyn HistoryCache) -> Self {
        Self {
            workdir,
            repository: repository.into(),
            program,
            cache,
        }
    }

    /// History of `path`, newest first, read through the cache.
    pub fn history(&self, path: &str) -> Result<FileHistory> {
        let key = CacheKey::new(self.repository.clone(), path);
        if let Some(history) = self.cache.get(&key) {
            return Ok(history);
        }

        let output = Command::new(self.program)
            .args(["log", "--follow", "--format=%H%x1f%an%x1f%aE%x1f%cn%x1f%cE", "--", path])
            .current_dir(self.workdir)
            .stdin(Stdio::null())
            .output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(AppError::Command(format!("git log --follow -- {}: {}", path, stderr)));
        }

        let history = Arc::new(parse_log(&String::from_utf8_lossy(&output.stdout))?);
        self.cache.put(key, Arc::clone(&history));
        Ok(history)
    }

    pub fn file_changes(&self, commit_id: &str, path: &str) -> Result<ChangeStatistic> {
        let history = self.history(path)?;
        Ok(split_history(&history, commit_id))
    }

    /// Sum of the statistics of every added, modified or deleted file.
    /// Files whose history cannot be read are logged and left out.
    pub fn commit_changes(&self, diff: &CommitDiff) -> ChangeStatistic {
        let mut total = ChangeStatistic::default();
        for file in &diff.files {
            if !matches!(file.status, DiffStatus::Added | DiffStatus::Modified | DiffStatus::Deleted) {
                debug!("{}: skipping change statistics for {:?} delta", diff.commit, file.status);
                continue;
            }
            let Some(path) = file.path() else {
                continue;
            };
            match self.file_changes(&diff.commit, path) {
                Ok(stat) => total.add(&stat),
                Err(e) => warn!("{}: change statistics for {}: {}", diff.commit, path, e),
            }
        }
        total
    }
}

pub fn parse_log(raw: &str) -> Result<Vec<LogEntry>> {
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let fields: Vec<&str> = line.trim_matches('"').split(FIELD_SEPARATOR).collect();
            match fields.as_slice() {
                [commit_id, author_name, author_email, committer_name, committer_email] => Ok(LogEntry {
                    commit_id: commit_id.to_string(),
                    author_name: author_name.to_string(),
                    author_email: author_email.to_string(),
                    committer_name: committer_name.to_string(),
                    committer_email: committer_email.to_string(),
                }),
                _ => Err(AppError::Command(format!("could not parse log line {:?}", line))),
            }
        })
        .collect()
}

/// Split a newest-first history at `commit_id`. Authors are counted by
/// author name on both sides of the split.
pub fn split_history(history: &[LogEntry], commit_id: &str) -> ChangeStatistic {
    let mut stat = ChangeStatistic::default();
    let mut past_authors: HashSet<&str> = HashSet::new();
    let mut future_authors: HashSet<&str> = HashSet::new();
    let mut future = true;

    for entry in history {
        if future && entry.commit_id == commit_id {
            future = false;
        }
        if future {
            stat.future_changes += 1;
            future_authors.insert(&entry.author_name);
        } else {
            stat.past_changes += 1;
            past_authors.insert(&entry.author_name);
        }
    }

    stat.future_authors = future_authors.len() as u64;
    stat.past_authors = past_authors.len() as u64;
    stat
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::cache::{LruHistoryCache, NoopHistoryCache};
    use crate::git::repository::testing::{git_available, TestRepo};
    use crate::git::GitRepository;

    fn entry(id: &str, author: &str) -> LogEntry {
        LogEntry {
            commit_id: id.to_string(),
            author_name: author.to_string(),
            author_email: format!("{}@x", author),
            committer_name: author.to_string(),
            committer_email: format!("{}@x", author),
        }
    }

    #[test]
    fn splits_history_at_commit() {
        let history = vec![
            entry("e", "ann"),
            entry("d", "bob"),
            entry("c", "ann"),
            entry("b", "cid"),
            entry("a", "cid"),
        ];
        let stat = split_history(&history, "c");
        assert_eq!(
            stat,
            ChangeStatistic {
                past_changes: 3,
                future_changes: 2,
                past_authors: 2,
                future_authors: 2,
            }
        );
    }

    #[test]
    fn authors_are_counted_by_author_name_not_committer() {
        let mut applied = entry("b", "ann");
        applied.committer_name = "maintainer".to_string();
        let mut older = entry("a", "bob");
        older.committer_name = "maintainer".to_string();
        let mut newer = entry("c", "cid");
        newer.committer_name = "maintainer".to_string();

        let stat = split_history(&[newer, applied, older], "b");
        assert_eq!(stat.past_changes, 2);
        assert_eq!(stat.past_authors, 2);
        assert_eq!(stat.future_authors, 1);
    }

    #[test]
    fn unknown_commit_counts_everything_as_future() {
        let stat = split_history(&[entry("a", "ann"), entry("b", "bob")], "z");
        assert_eq!(stat.future_changes, 2);
        assert_eq!(stat.past_changes, 0);
    }

    #[test]
    fn parses_separated_fields() {
        let raw = "abc\x1fAnn\x1fann@x\x1fBob\x1fbob@x\n\n\"def\x1fCid\x1fcid@x\x1fCid\x1fcid@x\"\n";
        let entries = parse_log(raw).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].committer_name, "Bob");
        assert_eq!(entries[1].commit_id, "def");
        assert!(parse_log("only\x1ftwo").is_err());
    }

    #[test]
    fn reads_history_through_cache() {
        if !git_available() {
            return;
        }
        let mut test_repo = TestRepo::new();
        let first = test_repo.commit("Ann", "one", &[("a.c", Some("1\n"))]);
        let second = test_repo.commit("Bob", "two", &[("a.c", Some("2\n"))]);
        test_repo.commit("Cid", "three", &[("a.c", Some("3\n"))]);

        let repo = GitRepository::open(test_repo.path()).unwrap();
        let workdir = repo.workdir().unwrap();
        let cache = LruHistoryCache::new(8);
        let lookup = FileHistoryLookup::new(&workdir, "repo", "git", &cache);

        let stat = lookup.file_changes(&second, "a.c").unwrap();
        assert_eq!(stat.past_changes, 2);
        assert_eq!(stat.future_changes, 1);
        assert_eq!(cache.len(), 1);

        let stat = lookup.file_changes(&first, "a.c").unwrap();
        assert_eq!(stat.past_changes, 1);
        assert_eq!(stat.future_authors, 2);

        let diff = repo.get_commit_diff(&second).unwrap();
        let noop = NoopHistoryCache;
        let uncached = FileHistoryLookup::new(&workdir, "repo", "git", &noop);
        assert_eq!(uncached.commit_changes(&diff).past_changes, 2);
    }
}
