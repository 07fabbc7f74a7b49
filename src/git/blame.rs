//! Historical per-line authorship.
//!
//! `BlameIndex` runs `git blame --line-porcelain <rev> -- <path>` in the
//! repository checkout and parses the output into `BlameRecord`s. Each record
//! block has the shape:
//!
//! ```text
//! <commit> <original-line> <final-line> [<run-length>]
//! author <name>
//! author-mail <email>
//! author-time <unix-seconds>
//! committer <name>
//! committer-mail <email>
//! [previous <commit> <path>]
//! \t<line content>
//! ```
//!
//! Other header keys (`author-tz`, `summary`, `filename`, ...) are accepted
//! and ignored. Blames rooted at a specific revision are not cached: every
//! attribution run starts from a different parent.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::attribution::BlameSource;
use crate::error::BlameError;
use crate::models::BlameRecord;

pub struct BlameIndex {
    workdir: PathBuf,
    program: String,
}

impl BlameIndex {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            program: "git".to_string(),
        }
    }

    /// Use a different `git` executable.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Annotate `path` as of `commit_ref`, walking history backwards from it.
    pub fn lines_for(&self, commit_ref: &str, path: &str) -> Result<FileBlame, BlameError> {
        let output = Command::new(&self.program)
            .args(["blame", "--line-porcelain", commit_ref, "--", path])
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .output()?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() || !stderr.is_empty() {
            debug!("git blame {} -- {} failed: {}", commit_ref, path, stderr);
            return Err(BlameError::CommandFailed(if stderr.is_empty() {
                format!("exit status {}", output.status)
            } else {
                stderr
            }));
        }

        FileBlame::parse(&String::from_utf8_lossy(&output.stdout))
    }
}

impl BlameSource for BlameIndex {
    fn lines_for(&self, commit_ref: &str, path: &str) -> Result<FileBlame, BlameError> {
        BlameIndex::lines_for(self, commit_ref, path)
    }
}

/// Parsed annotation of one file, ordered by final line number.
#[derive(Debug, Clone, Default)]
pub struct FileBlame {
    records: Vec<BlameRecord>,
    by_line: HashMap<u32, usize>,
}

impl FileBlame {
    pub fn from_records(records: Vec<BlameRecord>) -> Self {
        let by_line = records
            .iter()
            .enumerate()
            .map(|(idx, r)| (r.final_line_number, idx))
            .collect();
        Self { records, by_line }
    }

    pub fn parse(raw: &str) -> Result<Self, BlameError> {
        let mut records: Vec<BlameRecord> = Vec::new();
        // plain --porcelain only spells out a commit's fields the first time
        let mut seen: HashMap<String, BlameRecord> = HashMap::new();
        let mut current: Option<PartialRecord> = None;

        for (idx, line) in raw.lines().enumerate() {
            let line_no = idx + 1;

            if line.starts_with('\t') {
                let partial = current.take().ok_or_else(|| malformed(line_no, "content line without header"))?;
                let earlier = seen.get(&partial.commit_id);
                let record = partial.finish(earlier, line_no)?;
                seen.insert(record.commit_id.clone(), record.clone());
                records.push(record);
                continue;
            }

            match current.as_mut() {
                None => {
                    if line.is_empty() {
                        continue;
                    }
                    current = Some(PartialRecord::from_header(line, line_no)?);
                }
                Some(partial) => partial.apply(line, line_no)?,
            }
        }

        if current.is_some() {
            return Err(malformed(raw.lines().count(), "record without content line"));
        }

        Ok(Self::from_records(records))
    }

    pub fn for_line(&self, line: u32) -> Result<&BlameRecord, BlameError> {
        self.by_line
            .get(&line)
            .map(|&idx| &self.records[idx])
            .ok_or(BlameError::NotFound(line))
    }

    pub fn records(&self) -> &[BlameRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Default)]
struct PartialRecord {
    commit_id: String,
    original_line_number: u32,
    final_line_number: u32,
    author: Option<String>,
    author_email: Option<String>,
    author_timestamp: Option<i64>,
    committer: Option<String>,
    committer_email: Option<String>,
    previous: Option<(String, String)>,
}

impl PartialRecord {
    fn from_header(line: &str, line_no: usize) -> Result<Self, BlameError> {
        let mut fields = line.split(' ');
        let commit_id = fields.next().unwrap_or_default();
        if !is_commit_id(commit_id) {
            return Err(malformed(line_no, format!("invalid commit id {:?}", commit_id)));
        }
        let original_line_number = parse_number(fields.next(), line_no, "original line")?;
        let final_line_number = parse_number(fields.next(), line_no, "final line")?;
        if let Some(run) = fields.next() {
            parse_number(Some(run), line_no, "run length")?;
        }
        if fields.next().is_some() {
            return Err(malformed(line_no, "trailing fields in header"));
        }

        Ok(Self {
            commit_id: commit_id.to_string(),
            original_line_number,
            final_line_number,
            ..Default::default()
        })
    }

    fn apply(&mut self, line: &str, line_no: usize) -> Result<(), BlameError> {
        let (key, value) = line.split_once(' ').unwrap_or((line, ""));
        match key {
            "author" => self.author = Some(value.to_string()),
            "author-mail" => self.author_email = Some(value.to_string()),
            "author-time" => {
                let ts = value
                    .parse::<i64>()
                    .map_err(|_| malformed(line_no, format!("invalid author-time {:?}", value)))?;
                self.author_timestamp = Some(ts);
            }
            "committer" => self.committer = Some(value.to_string()),
            "committer-mail" => self.committer_email = Some(value.to_string()),
            "previous" => {
                let (commit, path) = value
                    .split_once(' ')
                    .filter(|(commit, _)| is_commit_id(commit))
                    .ok_or_else(|| malformed(line_no, format!("invalid previous {:?}", value)))?;
                self.previous = Some((commit.to_string(), path.to_string()));
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self, earlier: Option<&BlameRecord>, line_no: usize) -> Result<BlameRecord, BlameError> {
        let missing = |field: &str| malformed(line_no, format!("missing {}", field));
        let (previous_commit_id, previous_path) = match self.previous {
            Some((commit, path)) => (Some(commit), Some(path)),
            None => (
                earlier.and_then(|e| e.previous_commit_id.clone()),
                earlier.and_then(|e| e.previous_path.clone()),
            ),
        };

        Ok(BlameRecord {
            author: self
                .author
                .or_else(|| earlier.map(|e| e.author.clone()))
                .ok_or_else(|| missing("author"))?,
            author_email: self
                .author_email
                .or_else(|| earlier.map(|e| e.author_email.clone()))
                .ok_or_else(|| missing("author-mail"))?,
            author_timestamp: self
                .author_timestamp
                .or_else(|| earlier.map(|e| e.author_timestamp))
                .ok_or_else(|| missing("author-time"))?,
            committer: self
                .committer
                .or_else(|| earlier.map(|e| e.committer.clone()))
                .ok_or_else(|| missing("committer"))?,
            committer_email: self
                .committer_email
                .or_else(|| earlier.map(|e| e.committer_email.clone()))
                .ok_or_else(|| missing("committer-mail"))?,
            previous_commit_id,
            previous_path,
            original_line_number: self.original_line_number,
            final_line_number: self.final_line_number,
            commit_id: self.commit_id,
        })
    }
}

fn is_commit_id(s: &str) -> bool {
    s.len() == 40 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

fn parse_number(field: Option<&str>, line_no: usize, what: &str) -> Result<u32, BlameError> {
    let field = field.ok_or_else(|| malformed(line_no, format!("missing {}", what)))?;
    field
        .parse::<u32>()
        .map_err(|_| malformed(line_no, format!("invalid {} {:?}", what, field)))
}

fn malformed(line: usize, reason: impl Into<String>) -> BlameError {
    BlameError::MalformedRecord {
        line,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::repository::testing::{git_available, TestRepo};

    const SHA_A: &str = "1111111111111111111111111111111111111111";
    const SHA_B: &str = "2222222222222222222222222222222222222222";
    const SHA_P: &str = "abcdefabcdefabcdefabcdefabcdefabcdefabcd";

    fn sample() -> String {
        format!(
            "{SHA_A} 3 1 2\n\
             author Alice Example\n\
             author-mail <alice@example.com>\n\
             author-time 1500000000\n\
             author-tz +0200\n\
             committer Carol\n\
             committer-mail <carol@example.com>\n\
             committer-time 1500000100\n\
             committer-tz +0200\n\
             summary Initial import\n\
             previous {SHA_P} old/name.c\n\
             filename src/name.c\n\
             \tint main(void)\n\
             {SHA_A} 4 2\n\
             author Alice Example\n\
             author-mail <alice@example.com>\n\
             author-time 1500000000\n\
             author-tz +0200\n\
             committer Carol\n\
             committer-mail <carol@example.com>\n\
             committer-time 1500000100\n\
             committer-tz +0200\n\
             summary Initial import\n\
             previous {SHA_P} old/name.c\n\
             filename src/name.c\n\
             \t{{\n\
             {SHA_B} 1 3 1\n\
             author Bob\n\
             author-mail <bob@example.com>\n\
             author-time 1600000000\n\
             author-tz +0000\n\
             committer Bob\n\
             committer-mail <bob@example.com>\n\
             committer-time 1600000000\n\
             committer-tz +0000\n\
             summary Root commit\n\
             boundary\n\
             filename src/name.c\n\
             \t}}\n"
        )
    }

    #[test]
    fn parses_every_field() {
        let blame = FileBlame::parse(&sample()).unwrap();
        assert_eq!(blame.len(), 3);

        let first = blame.for_line(1).unwrap();
        assert_eq!(
            first,
            &BlameRecord {
                commit_id: SHA_A.to_string(),
                author: "Alice Example".to_string(),
                author_email: "<alice@example.com>".to_string(),
                author_timestamp: 1_500_000_000,
                committer: "Carol".to_string(),
                committer_email: "<carol@example.com>".to_string(),
                previous_commit_id: Some(SHA_P.to_string()),
                previous_path: Some("old/name.c".to_string()),
                original_line_number: 3,
                final_line_number: 1,
            }
        );
        assert_eq!(first.authored_at().map(|t| t.timestamp()), Some(1_500_000_000));

        let last = blame.for_line(3).unwrap();
        assert_eq!(last.commit_id, SHA_B);
        assert_eq!(last.original_line_number, 1);
        assert!(last.previous_commit_id.is_none());
        assert!(last.previous_path.is_none());
    }

    #[test]
    fn missing_line_is_not_found() {
        let blame = FileBlame::parse(&sample()).unwrap();
        assert!(matches!(blame.for_line(4), Err(BlameError::NotFound(4))));
        assert!(matches!(blame.for_line(0), Err(BlameError::NotFound(0))));
    }

    #[test]
    fn bad_numbers_are_malformed() {
        let raw = sample().replace("author-time 1600000000", "author-time soon");
        assert!(matches!(
            FileBlame::parse(&raw),
            Err(BlameError::MalformedRecord { line: 30, .. })
        ));

        let raw = sample().replace(&format!("{SHA_B} 1 3 1"), &format!("{SHA_B} one 3 1"));
        assert!(matches!(FileBlame::parse(&raw), Err(BlameError::MalformedRecord { .. })));
    }

    #[test]
    fn truncated_output_is_malformed() {
        let raw = format!("{SHA_A} 1 1 1\nauthor Alice\n");
        assert!(matches!(FileBlame::parse(&raw), Err(BlameError::MalformedRecord { .. })));

        let raw = format!("{SHA_A} 1 1 1\nauthor Alice\n\tcontent\n");
        assert!(matches!(FileBlame::parse(&raw), Err(BlameError::MalformedRecord { .. })));
    }

    #[test]
    fn compact_porcelain_reuses_earlier_fields() {
        let raw = format!(
            "{SHA_A} 1 1 2\n\
             author Alice\n\
             author-mail <a@x>\n\
             author-time 10\n\
             committer Alice\n\
             committer-mail <a@x>\n\
             \tfirst\n\
             {SHA_A} 2 2\n\
             \tsecond\n"
        );
        let blame = FileBlame::parse(&raw).unwrap();
        assert_eq!(blame.for_line(2).unwrap().author, "Alice");
        assert_eq!(blame.for_line(2).unwrap().author_timestamp, 10);
    }

    #[test]
    fn command_blames_file_at_revision() {
        if !git_available() {
            return;
        }
        let mut test_repo = TestRepo::new();
        let first = test_repo.commit("Alice", "initial", &[("a.c", Some("one\ntwo\n"))]);
        let second = test_repo.commit("Bob", "more", &[("a.c", Some("one\ntwo\nthree\n"))]);

        let index = BlameIndex::new(test_repo.path());
        let blame = index.lines_for(&second, "a.c").unwrap();
        assert_eq!(blame.len(), 3);
        assert_eq!(blame.for_line(1).unwrap().commit_id, first);
        assert_eq!(blame.for_line(3).unwrap().commit_id, second);
        assert_eq!(blame.for_line(3).unwrap().author, "Bob");

        let at_first = index.lines_for(&first, "a.c").unwrap();
        assert_eq!(at_first.len(), 2);
    }

    #[test]
    fn command_failure_carries_stderr() {
        if !git_available() {
            return;
        }
        let mut test_repo = TestRepo::new();
        let first = test_repo.commit("Alice", "initial", &[("a.c", Some("one\n"))]);

        let index = BlameIndex::new(test_repo.path());
        match index.lines_for(&first, "missing.c") {
            Err(BlameError::CommandFailed(stderr)) => assert!(!stderr.is_empty()),
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }
}
