//! Attribution of a single commit.
//!
//! Start → DiffComputed → PerFileIteration → Done. Only a failure to compute
//! the diff aborts the commit; blame failures cost single lines and parser
//! failures cost a file's function spans.
//!
//! A pipeline owns no shared mutable state: the classifier, tracker and voter
//! are created fresh for every run.

use tracing::{debug, info, warn};

use super::classifier::LineClassifier;
use super::functions::{FunctionSpans, FunctionTracker};
use super::voter::AttributionVoter;
use super::{BlameSource, DiffSource, SpanParser};
use crate::error::{AttributionError, BlameError, ParseError};
use crate::git::FileBlame;
use crate::models::{
    AttributionOutcome, CommitAttribution, CommitDiff, DiffStatus, FileDelta, FunctionSpan, FunctionState,
};
use crate::source::is_code_file;

/// Commits above this many changed lines are skipped by default.
pub const DEFAULT_MAX_CHANGES: usize = 2000;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub analyze_functions: bool,
    pub max_changes: Option<usize>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            analyze_functions: true,
            max_changes: Some(DEFAULT_MAX_CHANGES),
        }
    }
}

pub struct AttributionPipeline<'a> {
    diffs: &'a dyn DiffSource,
    blame: &'a dyn BlameSource,
    parser: &'a dyn SpanParser,
    options: PipelineOptions,
}

/// A finished run: the computed diff together with its attribution.
#[derive(Debug)]
pub struct PipelineRun {
    pub diff: CommitDiff,
    pub attribution: CommitAttribution,
}

/// Mutable state of one run.
#[derive(Default)]
struct RunState {
    voter: AttributionVoter,
    functions: Vec<FunctionSpan>,
    skipped_lines: usize,
}

impl<'a> AttributionPipeline<'a> {
    pub fn new(diffs: &'a dyn DiffSource, blame: &'a dyn BlameSource, parser: &'a dyn SpanParser) -> Self {
        Self {
            diffs,
            blame,
            parser,
            options: PipelineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Attribute `commit`. Only a diff failure is an error.
    pub fn run(&self, commit: &str) -> Result<PipelineRun, AttributionError> {
        let diff = self
            .diffs
            .commit_diff(commit)
            .map_err(|source| AttributionError::DiffComputationFailed {
                commit: commit.to_string(),
                source,
            })?;
        let attribution = self.attribute(&diff);
        Ok(PipelineRun { diff, attribution })
    }

    fn attribute(&self, diff: &CommitDiff) -> CommitAttribution {
        if let Some(max) = self.options.max_changes.filter(|&max| diff.stats.changes() > max) {
            info!("{}: ignoring commit with {} changes (limit {})", diff.commit, diff.stats.changes(), max);
            return CommitAttribution {
                commit: diff.commit.clone(),
                parent: diff.parent.clone(),
                outcome: AttributionOutcome::Skipped {
                    changes: diff.stats.changes(),
                },
                functions: Vec::new(),
                stats: diff.stats.clone(),
                skipped_lines: 0,
            };
        }

        let mut state = RunState::default();
        for file in &diff.files {
            self.attribute_file(diff, file, &mut state);
        }

        let outcome = match state.voter.finish() {
            Some(result) => {
                info!(
                    "{}: blame {} ({} votes)",
                    diff.commit,
                    result.blamed_commit_id,
                    result.votes_for(&result.blamed_commit_id)
                );
                AttributionOutcome::Blamed(result)
            }
            None => {
                warn!("{}: no blamed commit found", diff.commit);
                AttributionOutcome::NoAttributionFound
            }
        };

        CommitAttribution {
            commit: diff.commit.clone(),
            parent: diff.parent.clone(),
            outcome,
            functions: state.functions,
            stats: diff.stats.clone(),
            skipped_lines: state.skipped_lines,
        }
    }

    fn attribute_file(&self, diff: &CommitDiff, file: &FileDelta, state: &mut RunState) {
        let Some(path) = file.path() else {
            return;
        };
        if file.is_binary || !is_code_file(path) {
            debug!("{}: ignoring {} since not code", diff.commit, path);
            return;
        }

        let blame = self.open_blame(diff, file);
        let mut tracker = if self.options.analyze_functions {
            self.classify_functions(diff, file, state)
        } else {
            None
        };

        let mut classifier = LineClassifier::new();
        for hunk in &file.hunks {
            classifier.start_hunk();
            if let Some(tracker) = tracker.as_mut() {
                tracker.start_hunk();
            }

            for event in &hunk.lines {
                let decision = classifier.classify(event);

                if let (Some(tracker), Some(line)) = (tracker.as_mut(), decision.touched) {
                    if let Some(span) = tracker.touch(line) {
                        debug!("{}: function {}", diff.commit, span);
                        state.functions.push(span);
                    }
                }

                let Some(target) = decision.attribute else {
                    continue;
                };
                match &blame {
                    None => {}
                    Some(Ok(file_blame)) => match file_blame.for_line(target) {
                        Ok(record) => {
                            debug!(
                                "{}: blame line {} -> {} ({:?})",
                                diff.commit,
                                target,
                                record.commit_id,
                                record.authored_at()
                            );
                            state.voter.add(&record.commit_id);
                        }
                        Err(e) => {
                            warn!("{}: could not get blame for {}:{}: {}", diff.commit, path, target, e);
                            state.skipped_lines += 1;
                        }
                    },
                    Some(Err(_)) => {
                        warn!("{}: could not get blame for {}:{}: file blame unavailable", diff.commit, path, target);
                        state.skipped_lines += 1;
                    }
                }
            }
        }
    }

    /// Blame of the file's pre-change version, rooted at the first parent.
    /// `None` when there is nothing to blame (new file, initial commit).
    fn open_blame(&self, diff: &CommitDiff, file: &FileDelta) -> Option<Result<FileBlame, BlameError>> {
        if file.status == DiffStatus::Added {
            return None;
        }
        let parent = diff.parent.as_deref()?;
        let path = file.blame_path()?;
        let blame = self.blame.lines_for(parent, path);
        match &blame {
            Ok(file_blame) if file_blame.is_empty() => debug!("{}: {} is empty at {}", diff.commit, path, parent),
            Ok(file_blame) => debug!("{}: {} lines of {} blamed at {}", diff.commit, file_blame.len(), path, parent),
            Err(e) => warn!("{}: blame of {} at {} failed, skipping its lines: {}", diff.commit, path, parent, e),
        }
        Some(blame)
    }

    /// Record whole-file and cross-version function changes. Returns the
    /// tracker for in-place modifications of a modified file.
    fn classify_functions(&self, diff: &CommitDiff, file: &FileDelta, state: &mut RunState) -> Option<FunctionTracker> {
        match file.status {
            DiffStatus::Added => {
                let spans = self.spans_of(diff, file.new_path.as_deref(), file.new_content.as_deref()).ok()?;
                state.functions.extend(spans.all_with_state(FunctionState::Added));
                None
            }
            DiffStatus::Deleted => {
                let spans = self.spans_of(diff, file.old_path.as_deref(), file.old_content.as_deref()).ok()?;
                state.functions.extend(spans.all_with_state(FunctionState::Deleted));
                None
            }
            DiffStatus::Modified => {
                let new = self.spans_of(diff, file.new_path.as_deref(), file.new_content.as_deref()).ok()?;
                let old = self.spans_of(diff, file.old_path.as_deref(), file.old_content.as_deref()).ok()?;
                let (tracker, changed) = FunctionTracker::for_modified(new, &old);
                state.functions.extend(changed);
                Some(tracker)
            }
            _ => None,
        }
    }

    fn spans_of(&self, diff: &CommitDiff, path: Option<&str>, content: Option<&str>) -> Result<FunctionSpans, ParseError> {
        let (Some(path), Some(content)) = (path, content) else {
            return Ok(FunctionSpans::new());
        };
        match self.parser.spans(path, content) {
            Ok(spans) => Ok(spans
                .into_iter()
                .map(|mut span| {
                    span.file_name = path.to_string();
                    span
                })
                .collect()),
            Err(e) => {
                warn!("{}: functions of {}: {}", diff.commit, path, e);
                Err(e)
            }
        }
    }
}
