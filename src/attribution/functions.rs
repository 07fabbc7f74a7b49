//! Function-level classification of a commit.
//!
//! `FunctionSpans` holds one file snapshot's functions twice: by name (last
//! write wins) and in insertion order. Whole-file and cross-version changes
//! are a set difference on names; in-place edits are found by sweeping the
//! new version's spans with the touched line numbers of each hunk.
//!
//! The sweep only moves forward. Spans must be supplied in ascending start
//! line order and touched lines must be non-decreasing within a hunk, or a
//! modified function can be missed.

use std::collections::HashMap;

use crate::models::{FunctionSpan, FunctionState};

#[derive(Debug, Clone, Default)]
pub struct FunctionSpans {
    by_name: HashMap<String, usize>,
    spans: Vec<FunctionSpan>,
}

impl FunctionSpans {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a span unless it is a declaration. Returns whether it was kept.
    pub fn add(&mut self, span: FunctionSpan) -> bool {
        if span.is_declaration() {
            return false;
        }
        self.by_name.insert(span.name.clone(), self.spans.len());
        self.spans.push(span);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// The span each name resolves to, in insertion order.
    fn named(&self) -> impl Iterator<Item = (usize, &FunctionSpan)> {
        self.spans
            .iter()
            .enumerate()
            .filter(|(idx, span)| self.by_name.get(&span.name) == Some(idx))
    }

    /// Every named span with the given state, for wholly added or deleted files.
    pub fn all_with_state(&self, state: FunctionState) -> Vec<FunctionSpan> {
        self.named()
            .map(|(_, span)| FunctionSpan {
                state,
                ..span.clone()
            })
            .collect()
    }
}

impl FromIterator<FunctionSpan> for FunctionSpans {
    fn from_iter<I: IntoIterator<Item = FunctionSpan>>(iter: I) -> Self {
        let mut spans = FunctionSpans::new();
        for span in iter {
            spans.add(span);
        }
        spans
    }
}

/// Names present only in `new` are added, names present only in `old` are deleted.
pub fn added_and_deleted(new: &FunctionSpans, old: &FunctionSpans) -> Vec<FunctionSpan> {
    let added = new
        .named()
        .filter(|(_, span)| !old.contains(&span.name))
        .map(|(_, span)| FunctionSpan {
            state: FunctionState::Added,
            ..span.clone()
        });
    let deleted = old
        .named()
        .filter(|(_, span)| !new.contains(&span.name))
        .map(|(_, span)| FunctionSpan {
            state: FunctionState::Deleted,
            ..span.clone()
        });
    added.chain(deleted).collect()
}

/// Tracks in-place modifications of one modified file.
#[derive(Debug)]
pub struct FunctionTracker {
    spans: Vec<FunctionSpan>,
    cursor: usize,
}

impl FunctionTracker {
    /// Tracker over the new version's spans, used as given.
    pub fn new(new: FunctionSpans) -> Self {
        Self {
            spans: new.spans,
            cursor: 0,
        }
    }

    /// Build a tracker for a modified file and return the cross-version added
    /// and deleted functions. Added spans are excluded from the sweep.
    pub fn for_modified(new: FunctionSpans, old: &FunctionSpans) -> (Self, Vec<FunctionSpan>) {
        let changed = added_and_deleted(&new, old);
        let mut tracker = Self::new(new);
        for span in tracker.spans.iter_mut() {
            if !old.contains(&span.name) {
                span.state = FunctionState::Added;
            }
        }
        (tracker, changed)
    }

    /// Rewind the sweep at a hunk boundary. States are kept.
    pub fn start_hunk(&mut self) {
        self.cursor = 0;
    }

    /// Feed one touched line. Returns the span newly marked modified, if any.
    pub fn touch(&mut self, line: u32) -> Option<FunctionSpan> {
        while self.cursor < self.spans.len() {
            let span = &mut self.spans[self.cursor];
            if span.state == FunctionState::Unset && line <= span.end_line {
                if !span.contains_line(line) {
                    return None;
                }
                span.state = FunctionState::Modified;
                return Some(span.clone());
            }
            self.cursor += 1;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(items: &[(&str, u32, u32)]) -> FunctionSpans {
        items
            .iter()
            .map(|&(name, start, end)| FunctionSpan::new(name, start, end))
            .collect()
    }

    fn names(spans: &[FunctionSpan]) -> Vec<&str> {
        spans.iter().map(|s| s.name.as_str()).collect()
    }

    fn modified(tracker: &FunctionTracker) -> Vec<&str> {
        tracker
            .spans
            .iter()
            .filter(|span| span.state == FunctionState::Modified)
            .map(|span| span.name.as_str())
            .collect()
    }

    #[test]
    fn set_difference_finds_added_function() {
        let old = spans(&[("foo", 1, 10)]);
        let new = spans(&[("foo", 1, 10), ("bar", 20, 30)]);
        let changed = added_and_deleted(&new, &old);
        assert_eq!(names(&changed), vec!["bar"]);
        assert_eq!(changed[0].state, FunctionState::Added);
    }

    #[test]
    fn set_difference_finds_deleted_function() {
        let old = spans(&[("foo", 1, 10), ("gone", 12, 18)]);
        let new = spans(&[("foo", 1, 10)]);
        let changed = added_and_deleted(&new, &old);
        assert_eq!(names(&changed), vec!["gone"]);
        assert_eq!(changed[0].state, FunctionState::Deleted);
    }

    #[test]
    fn declarations_are_never_kept() {
        let mut set = FunctionSpans::new();
        assert!(!set.add(FunctionSpan::new("decl", 5, 6)));
        assert!(!set.add(FunctionSpan::new("oneliner", 5, 5)));
        assert!(set.add(FunctionSpan::new("body", 5, 7)));
        assert_eq!(set.spans.len(), 1);
        assert!(!set.contains("decl"));
    }

    #[test]
    fn duplicate_names_resolve_to_last_write() {
        let set = spans(&[("dup", 1, 5), ("dup", 10, 20)]);
        assert_eq!(set.spans.len(), 2);
        let resolved = set.all_with_state(FunctionState::Added);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].start_line, 10);
    }

    #[test]
    fn sweep_marks_each_function_once() {
        let mut tracker = FunctionTracker::new(spans(&[("f1", 1, 10), ("f2", 11, 20)]));
        assert_eq!(tracker.touch(5).map(|s| s.name), Some("f1".to_string()));
        assert!(tracker.touch(6).is_none());
        assert_eq!(tracker.touch(15).map(|s| s.name), Some("f2".to_string()));
        assert!(tracker.touch(16).is_none());
        assert_eq!(modified(&tracker), vec!["f1", "f2"]);
    }

    // Out-of-order input skips spans the cursor already passed. This is the
    // documented behavior and must not change silently.
    #[test]
    fn sweep_misses_functions_touched_out_of_order() {
        let mut tracker = FunctionTracker::new(spans(&[("f1", 1, 10), ("f2", 11, 20)]));
        assert_eq!(tracker.touch(15).map(|s| s.name), Some("f2".to_string()));
        assert!(tracker.touch(5).is_none());
        assert_eq!(modified(&tracker), vec!["f2"]);
    }

    #[test]
    fn lines_between_functions_touch_nothing() {
        let mut tracker = FunctionTracker::new(spans(&[("f1", 10, 20)]));
        assert!(tracker.touch(3).is_none());
        assert_eq!(tracker.touch(12).map(|s| s.name), Some("f1".to_string()));
    }

    #[test]
    fn hunk_boundary_rewinds_cursor() {
        let mut tracker = FunctionTracker::new(spans(&[("f1", 1, 10), ("f2", 11, 20)]));
        assert!(tracker.touch(15).is_some());
        tracker.start_hunk();
        assert_eq!(tracker.touch(5).map(|s| s.name), Some("f1".to_string()));
    }

    #[test]
    fn added_functions_are_not_reported_modified() {
        let old = spans(&[("keep", 1, 10)]);
        let new = spans(&[("keep", 1, 10), ("fresh", 12, 20)]);
        let (mut tracker, changed) = FunctionTracker::for_modified(new, &old);
        assert_eq!(names(&changed), vec!["fresh"]);
        assert!(tracker.touch(14).is_none());
        assert!(tracker.touch(3).is_none());
        tracker.start_hunk();
        assert_eq!(tracker.touch(3).map(|s| s.name), Some("keep".to_string()));
    }
}
