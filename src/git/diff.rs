use git2::{Delta, DiffFormat, DiffOptions, Repository};

use crate::attribution::DiffSource;
use crate::error::Result;
use crate::git::repository::{find_commit, GitRepository};
use crate::models::{CommitDiff, DiffHunk, DiffLineEvent, DiffStats, DiffStatus, FileDelta};

impl GitRepository {
    /// Diff a commit against its first parent, or the empty tree for an initial commit.
    pub fn get_commit_diff(&self, commit_sha: &str) -> Result<CommitDiff> {
        self.with_repo(|repo| {
            let commit = find_commit(repo, commit_sha)?;
            let tree = commit.tree()?;

            let parent = if commit.parent_count() > 0 {
                Some(commit.parent(0)?)
            } else {
                None
            };
            let parent_tree = match &parent {
                Some(p) => Some(p.tree()?),
                None => None,
            };

            let mut opts = DiffOptions::new();
            opts.context_lines(3);
            opts.ignore_filemode(true);

            let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut opts))?;

            let mut files: Vec<FileDelta> = Vec::new();
            let mut stats = DiffStats::default();

            for (delta_idx, delta) in diff.deltas().enumerate() {
                let status = match delta.status() {
                    Delta::Added => DiffStatus::Added,
                    Delta::Deleted => DiffStatus::Deleted,
                    Delta::Modified => DiffStatus::Modified,
                    Delta::Renamed => DiffStatus::Renamed,
                    Delta::Copied => DiffStatus::Copied,
                    Delta::Typechange => DiffStatus::TypeChanged,
                    _ => DiffStatus::Unmodified,
                };

                let old_path = delta.old_file().path().map(|p| p.to_string_lossy().to_string());
                let new_path = delta.new_file().path().map(|p| p.to_string_lossy().to_string());
                let is_binary = delta.flags().is_binary();

                let old_content = if !is_binary && status != DiffStatus::Added {
                    blob_text(repo, delta.old_file().id())
                } else {
                    None
                };
                let new_content = if !is_binary && status != DiffStatus::Deleted {
                    blob_text(repo, delta.new_file().id())
                } else {
                    None
                };

                let mut hunks: Vec<DiffHunk> = Vec::new();
                if let Some(patch) = git2::Patch::from_diff(&diff, delta_idx)? {
                    for hunk_idx in 0..patch.num_hunks() {
                        let (hunk, _) = patch.hunk(hunk_idx)?;
                        let mut lines: Vec<DiffLineEvent> = Vec::new();

                        for line_idx in 0..patch.num_lines_in_hunk(hunk_idx)? {
                            let line = patch.line_in_hunk(hunk_idx, line_idx)?;
                            let event = match (line.origin(), line.old_lineno(), line.new_lineno()) {
                                ('+', _, Some(new)) => {
                                    stats.insertions += 1;
                                    DiffLineEvent::addition(new)
                                }
                                ('-', Some(old), _) => {
                                    stats.deletions += 1;
                                    DiffLineEvent::deletion(old)
                                }
                                (' ', Some(old), Some(new)) => DiffLineEvent::context(old, new),
                                // end-of-file newline markers carry no line of their own
                                _ => continue,
                            };
                            lines.push(event);
                        }

                        hunks.push(DiffHunk {
                            old_start: hunk.old_start(),
                            old_lines: hunk.old_lines(),
                            new_start: hunk.new_start(),
                            new_lines: hunk.new_lines(),
                            header: String::from_utf8_lossy(hunk.header()).to_string(),
                            lines,
                        });
                    }
                }
                stats.hunks += hunks.len();

                files.push(FileDelta {
                    old_path,
                    new_path,
                    status,
                    hunks,
                    old_content,
                    new_content,
                    is_binary,
                });
                stats.files_changed += 1;
            }

            let mut patch = Vec::new();
            diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
                if matches!(line.origin(), '+' | '-' | ' ') {
                    patch.push(line.origin() as u8);
                }
                patch.extend_from_slice(line.content());
                true
            })?;

            Ok(CommitDiff {
                commit: commit.id().to_string(),
                parent: parent.map(|p| p.id().to_string()),
                files,
                stats,
                patch: String::from_utf8_lossy(&patch).to_string(),
            })
        })
    }
}

impl DiffSource for GitRepository {
    fn commit_diff(&self, commit: &str) -> Result<CommitDiff> {
        self.get_commit_diff(commit)
    }
}

fn blob_text(repo: &Repository, oid: git2::Oid) -> Option<String> {
    if oid.is_zero() {
        return None;
    }
    let blob = repo.find_blob(oid).ok()?;
    Some(String::from_utf8_lossy(blob.content()).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::repository::testing::TestRepo;
    use crate::models::LineOrigin;

    #[test]
    fn initial_commit_diffs_against_empty_tree() {
        let mut test_repo = TestRepo::new();
        let first = test_repo.commit("Alice", "initial", &[("main.c", Some("int main() {\n  return 0;\n}\n"))]);

        let repo = GitRepository::open(test_repo.path()).unwrap();
        let diff = repo.get_commit_diff(&first).unwrap();
        assert!(diff.parent.is_none());
        assert_eq!(diff.files.len(), 1);
        assert_eq!(diff.files[0].status, DiffStatus::Added);
        assert_eq!(diff.stats.insertions, 3);
        assert!(diff.files[0].old_content.is_none());
        assert!(diff.files[0].new_content.as_deref().unwrap().contains("main"));
    }

    #[test]
    fn modified_file_lines_carry_line_numbers() {
        let mut test_repo = TestRepo::new();
        let first = test_repo.commit("Alice", "initial", &[("a.c", Some("one\ntwo\nthree\n"))]);
        let second = test_repo.commit("Bob", "change", &[("a.c", Some("one\n2\nthree\nfour\n"))]);

        let repo = GitRepository::open(test_repo.path()).unwrap();
        let diff = repo.get_commit_diff(&second).unwrap();
        assert_eq!(diff.parent.as_deref(), Some(first.as_str()));
        assert_eq!(diff.stats, DiffStats { files_changed: 1, insertions: 2, deletions: 1, hunks: 1 });

        let file = &diff.files[0];
        assert_eq!(file.status, DiffStatus::Modified);
        let changes: Vec<DiffLineEvent> = file.hunks[0]
            .lines
            .iter()
            .filter(|l| l.origin != LineOrigin::Context)
            .copied()
            .collect();
        assert_eq!(
            changes,
            vec![
                DiffLineEvent::deletion(2),
                DiffLineEvent::addition(2),
                DiffLineEvent::addition(4),
            ]
        );
        assert!(diff.patch.contains("-two"));
        assert!(diff.patch.contains("+four"));
    }

    #[test]
    fn deleted_file_keeps_old_content() {
        let mut test_repo = TestRepo::new();
        test_repo.commit("Alice", "initial", &[("a.c", Some("int a;\n")), ("b.c", Some("int b;\n"))]);
        let second = test_repo.commit("Bob", "remove", &[("b.c", None)]);

        let repo = GitRepository::open(test_repo.path()).unwrap();
        let diff = repo.get_commit_diff(&second).unwrap();
        let file = &diff.files[0];
        assert_eq!(file.status, DiffStatus::Deleted);
        assert_eq!(file.old_content.as_deref(), Some("int b;\n"));
        assert!(file.new_content.is_none());
        assert_eq!(file.path(), Some("b.c"));
    }
}
