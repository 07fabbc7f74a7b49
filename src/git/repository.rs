use git2::{Repository, Sort};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{AuthorInfo, CommitDetail};

pub struct GitRepository {
    pub repo: Mutex<Repository>,
}

impl GitRepository {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::discover(&path)
            .map_err(|_| AppError::RepoNotFound(path.as_ref().to_string_lossy().to_string()))?;

        Ok(Self {
            repo: Mutex::new(repo),
        })
    }

    pub fn with_repo<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Repository) -> Result<T>,
    {
        let repo = self.repo.lock().map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        f(&repo)
    }

    /// Directory external git commands run in: the checkout, or the git dir of a bare repository.
    pub fn workdir(&self) -> Result<PathBuf> {
        self.with_repo(|repo| {
            Ok(repo
                .workdir()
                .unwrap_or_else(|| repo.path())
                .to_path_buf())
        })
    }

    /// Stable identity of the repository, used as a cache key.
    pub fn identity(&self) -> Result<String> {
        self.with_repo(|repo| Ok(repo.path().to_string_lossy().to_string()))
    }

    pub fn commit_detail(&self, sha: &str) -> Result<CommitDetail> {
        self.with_repo(|repo| {
            let commit = find_commit(repo, sha)?;
            Ok(commit_to_detail(&commit))
        })
    }

    /// Walk history from HEAD, newest first.
    pub fn walk_history(&self) -> Result<Vec<CommitDetail>> {
        self.with_repo(|repo| {
            let mut revwalk = repo.revwalk()?;
            revwalk.set_sorting(Sort::TIME)?;
            revwalk.push_head()?;

            let mut commits = Vec::new();
            for oid in revwalk {
                let commit = repo.find_commit(oid?)?;
                commits.push(commit_to_detail(&commit));
            }
            Ok(commits)
        })
    }
}

/// Resolve a full id, abbreviated id or any other revision spec to a commit.
pub fn find_commit<'r>(repo: &'r Repository, rev: &str) -> Result<git2::Commit<'r>> {
    repo.revparse_single(rev)
        .and_then(|object| object.peel_to_commit())
        .map_err(|_| AppError::CommitNotFound(rev.to_string()))
}

pub fn commit_to_detail(commit: &git2::Commit) -> CommitDetail {
    let author = commit.author();
    let committer = commit.committer();
    CommitDetail {
        oid: commit.id().to_string(),
        message: String::from_utf8_lossy(commit.message_bytes()).trim().to_string(),
        author: AuthorInfo {
            name: String::from_utf8_lossy(author.name_bytes()).to_string(),
            email: String::from_utf8_lossy(author.email_bytes()).to_string(),
        },
        committer: AuthorInfo {
            name: String::from_utf8_lossy(committer.name_bytes()).to_string(),
            email: String::from_utf8_lossy(committer.email_bytes()).to_string(),
        },
        author_time: author.when().seconds(),
        commit_time: commit.time().seconds(),
        parents: commit.parent_ids().map(|id| id.to_string()).collect(),
    }
}
