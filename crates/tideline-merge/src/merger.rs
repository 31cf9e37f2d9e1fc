//! Content merging.
//!
//! [`LineMerger`] is a line-based diff3: both sides are diffed against the
//! ancestor with Myers (`similar`), and changed regions are combined. Regions
//! changed on both sides that overlap or touch are conflicts unless both sides
//! produced the same lines.

use std::fmt;
use std::ops::Range;

use similar::{capture_diff_slices, Algorithm, DiffOp, DiffTag};
use tracing::debug;

use crate::error::MergeResult;

/// A range of ancestor lines that could not be merged (0-based, half-open).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConflictRegion {
    pub ancestor_lines: Range<usize>,
}

/// Result of a content merge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MergeOutput {
    Merged(Vec<u8>),
    Conflict { regions: Vec<ConflictRegion> },
}

/// Three-way content merger.
pub trait ContentMerger: Send + Sync + fmt::Debug {
    fn merge(&self, ancestor: &[u8], local: &[u8], remote: &[u8]) -> MergeResult<MergeOutput>;
}

/// Line-based three-way merge. Non-UTF-8 content merges only when one side is
/// unchanged or both sides are identical.
#[derive(Clone, Copy, Debug, Default)]
pub struct LineMerger;

impl ContentMerger for LineMerger {
    fn merge(&self, ancestor: &[u8], local: &[u8], remote: &[u8]) -> MergeResult<MergeOutput> {
        if local == ancestor || local == remote {
            debug!("local unchanged or identical to remote, taking remote");
            return Ok(MergeOutput::Merged(remote.to_vec()));
        }
        if remote == ancestor {
            debug!("remote unchanged, keeping local");
            return Ok(MergeOutput::Merged(local.to_vec()));
        }

        let (Ok(a), Ok(l), Ok(r)) = (
            std::str::from_utf8(ancestor),
            std::str::from_utf8(local),
            std::str::from_utf8(remote),
        ) else {
            debug!("binary content changed on both sides");
            return Ok(MergeOutput::Conflict {
                regions: vec![ConflictRegion {
                    ancestor_lines: 0..ancestor.split(|b| *b == b'\n').count(),
                }],
            });
        };

        Ok(diff3(&lines(a), &lines(l), &lines(r)))
    }
}

fn lines(text: &str) -> Vec<&str> {
    text.split_inclusive('\n').collect()
}

/// One side's diff against the ancestor.
struct SideDiff {
    ops: Vec<DiffOp>,
    /// Changed ancestor ranges, with adjacent non-equal ops coalesced.
    hunks: Vec<Range<usize>>,
}

impl SideDiff {
    fn new(ancestor: &[&str], side: &[&str]) -> Self {
        let ops = capture_diff_slices(Algorithm::Myers, ancestor, side);
        let mut hunks: Vec<Range<usize>> = Vec::new();
        let mut open = false;
        for op in &ops {
            let (tag, old, _) = op.as_tag_tuple();
            if tag == DiffTag::Equal {
                open = false;
                continue;
            }
            match hunks.last_mut() {
                Some(last) if open => last.end = old.end,
                _ => hunks.push(old),
            }
            open = true;
        }
        Self { ops, hunks }
    }

    /// Side position of the ancestor boundary `at`, before any insertion
    /// made there.
    fn map_start(&self, at: usize) -> usize {
        for op in &self.ops {
            let (tag, old, new) = op.as_tag_tuple();
            if old.start <= at && at <= old.end {
                return match tag {
                    DiffTag::Equal => new.start + (at - old.start),
                    _ if at == old.start => new.start,
                    _ => new.end,
                };
            }
        }
        0
    }

    /// Side position of the ancestor boundary `at`, after any insertion made
    /// there.
    fn map_end(&self, at: usize, side_len: usize) -> usize {
        for op in self.ops.iter().rev() {
            let (tag, old, new) = op.as_tag_tuple();
            if old.start <= at && at <= old.end {
                return match tag {
                    DiffTag::Equal => new.start + (at - old.start),
                    _ if at == old.end => new.end,
                    _ => new.start,
                };
            }
        }
        side_len
    }

    /// The lines `side` holds in place of `ancestor[range]`. Every hunk of
    /// this side either lies inside `range` or is clear of it.
    fn lines<'a>(&self, side: &[&'a str], range: &Range<usize>) -> Vec<&'a str> {
        let start = self.map_start(range.start);
        let end = self.map_end(range.end, side.len()).max(start);
        side[start..end].to_vec()
    }
}

fn diff3(ancestor: &[&str], local: &[&str], remote: &[&str]) -> MergeOutput {
    let ours_diff = SideDiff::new(ancestor, local);
    let theirs_diff = SideDiff::new(ancestor, remote);
    let (local_hunks, remote_hunks) = (&ours_diff.hunks, &theirs_diff.hunks);

    let mut merged: Vec<&str> = Vec::new();
    let mut regions = Vec::new();
    let mut cursor = 0;
    let (mut li, mut ri) = (0, 0);

    while li < local_hunks.len() || ri < remote_hunks.len() {
        let (l_from, r_from) = (li, ri);

        // Seed a group with whichever pending hunk starts first.
        let seed = match (local_hunks.get(li), remote_hunks.get(ri)) {
            (Some(l), Some(r)) if r.start < l.start => {
                ri += 1;
                r
            }
            (Some(l), _) => {
                li += 1;
                l
            }
            (None, Some(r)) => {
                ri += 1;
                r
            }
            (None, None) => break,
        };
        let mut group = seed.clone();

        // Absorb every hunk that overlaps or touches the group.
        loop {
            if let Some(h) = local_hunks.get(li).filter(|h| h.start <= group.end) {
                group.end = group.end.max(h.end);
                li += 1;
            } else if let Some(h) = remote_hunks.get(ri).filter(|h| h.start <= group.end) {
                group.end = group.end.max(h.end);
                ri += 1;
            } else {
                break;
            }
        }

        merged.extend_from_slice(&ancestor[cursor..group.start]);
        let (local_changed, remote_changed) = (li > l_from, ri > r_from);
        let ours = ours_diff.lines(local, &group);
        let theirs = theirs_diff.lines(remote, &group);

        if !remote_changed {
            merged.extend(ours);
        } else if !local_changed || ours == theirs {
            merged.extend(theirs);
        } else {
            debug!(lines = ?group, "both sides changed the same region");
            regions.push(ConflictRegion {
                ancestor_lines: group.clone(),
            });
        }
        cursor = group.end;
    }
    merged.extend_from_slice(&ancestor[cursor..]);

    if regions.is_empty() {
        MergeOutput::Merged(merged.concat().into_bytes())
    } else {
        MergeOutput::Conflict { regions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn merge(a: &str, l: &str, r: &str) -> MergeOutput {
        LineMerger.merge(a.as_bytes(), l.as_bytes(), r.as_bytes()).unwrap()
    }

    fn merged(a: &str, l: &str, r: &str) -> String {
        match merge(a, l, r) {
            MergeOutput::Merged(bytes) => String::from_utf8(bytes).unwrap(),
            other => panic!("expected clean merge, got {other:?}"),
        }
    }

    const BASE: &str = "a\nb\nc\nd\ne\n";

    // -----------------------------------------------------------------------
    // Fast paths
    // -----------------------------------------------------------------------

    #[test]
    fn one_side_unchanged() {
        assert_eq!(merged(BASE, BASE, "x\n"), "x\n");
        assert_eq!(merged(BASE, "y\n", BASE), "y\n");
    }

    #[test]
    fn identical_changes() {
        assert_eq!(merged(BASE, "same\n", "same\n"), "same\n");
    }

    // -----------------------------------------------------------------------
    // Line merging
    // -----------------------------------------------------------------------

    #[test]
    fn disjoint_edits_combine() {
        let local = "a\nB\nc\nd\ne\n";
        let remote = "a\nb\nc\nD\ne\n";
        assert_eq!(merged(BASE, local, remote), "a\nB\nc\nD\ne\n");
    }

    #[test]
    fn insertions_and_deletions_combine() {
        let local = "top\na\nb\nc\nd\ne\n";
        let remote = "a\nb\nc\ne\n";
        assert_eq!(merged(BASE, local, remote), "top\na\nb\nc\ne\n");
    }

    #[test]
    fn same_edit_in_same_place_is_clean() {
        let local = "a\nB\nc\nd\nlocal-only\n";
        let remote = "a\nB\nc\nd\ne\n";
        assert_eq!(merged(BASE, local, remote), "a\nB\nc\nd\nlocal-only\n");
    }

    #[test]
    fn overlapping_edits_conflict() {
        let local = "a\nmine\nc\nd\ne\n";
        let remote = "a\ntheirs\nc\nd\ne\n";
        match merge(BASE, local, remote) {
            MergeOutput::Conflict { regions } => {
                assert_eq!(regions, vec![ConflictRegion { ancestor_lines: 1..2 }]);
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn touching_edits_conflict() {
        let local = "a\nB\nc\nd\ne\n";
        let remote = "a\nb\nC\nd\ne\n";
        assert!(matches!(merge(BASE, local, remote), MergeOutput::Conflict { .. }));
    }

    #[test]
    fn missing_trailing_newline_is_preserved() {
        let base = "a\nb\nc";
        let local = "A\nb\nc";
        let remote = "a\nb\nC";
        assert_eq!(merged(base, local, remote), "A\nb\nC");
    }

    #[test]
    fn binary_content_conflicts_unless_fast_path() {
        let base = [0xff, 0x00, 0x01];
        let local = [0xff, 0x00, 0x02];
        let remote = [0xff, 0x00, 0x03];
        assert!(matches!(
            LineMerger.merge(&base, &local, &remote).unwrap(),
            MergeOutput::Conflict { .. }
        ));
        assert_eq!(
            LineMerger.merge(&base, &base, &remote).unwrap(),
            MergeOutput::Merged(remote.to_vec())
        );
    }

    #[test]
    fn deletion_against_shifted_insertion_conflicts() {
        // The remote side spans more lines than the ancestor group.
        let a = lines("d\nb\nb\n");
        let l = lines("");
        let r = lines("b\nb\nb\n");
        assert!(matches!(diff3(&a, &l, &r), MergeOutput::Conflict { .. }));
        assert!(matches!(
            merge("d\nb\nb\n", "", "b\nb\nb\n"),
            MergeOutput::Conflict { .. }
        ));
    }

    #[test]
    fn replacement_and_append_combine() {
        let base = "a\nb\n";
        assert_eq!(merged(base, "x\nb\n", "a\nb\ntail\n"), "x\nb\ntail\n");
    }

    fn text() -> impl Strategy<Value = String> {
        prop::collection::vec(prop::sample::select(vec!["a", "b", "c", "d", "x"]), 0..8)
            .prop_map(|words| words.iter().map(|w| format!("{w}\n")).collect())
    }

    proptest! {
        #[test]
        fn never_panics_and_agreeing_sides_merge(a in text(), l in text(), r in text()) {
            let out = LineMerger.merge(a.as_bytes(), l.as_bytes(), r.as_bytes()).unwrap();
            if l == r {
                prop_assert_eq!(out, MergeOutput::Merged(l.into_bytes()));
            }
        }

        #[test]
        fn line_merge_reproduces_a_lone_or_shared_change(a in text(), s in text()) {
            let (a, s) = (lines(&a), lines(&s));
            let expected = MergeOutput::Merged(s.concat().into_bytes());
            prop_assert_eq!(diff3(&a, &s, &s), expected.clone());
            prop_assert_eq!(diff3(&a, &a, &s), expected.clone());
            prop_assert_eq!(diff3(&a, &s, &a), expected);
        }
    }
}
