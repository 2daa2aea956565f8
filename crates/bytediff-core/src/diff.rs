//! Diff session: divide-and-conquer driver, Myers bisect, cleanup passes.
//!
//! The driver trims shared affixes and tries cheap shortcuts before paying
//! for the O(ND) middle-snake search; the cleanup pass then canonicalizes
//! the raw script into its minimal stable form. All nodes live in the
//! session's pool and borrow from the two caller-owned input buffers.

use std::io::{self, Write};
use std::mem;
use std::time::{Duration, Instant};

use thiserror::Error;

use bytediff_scan as scan;

use crate::options::DiffOptions;
use crate::pool::{At, DiffOp, NodePool, Pos, Range, Source, Span, NONE};

const START_POOL: usize = 8;

/// The single failure mode of the engine. Everything else (empty inputs,
/// degenerate scripts, tie-breaks) is defined behavior, not an error.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DiffError {
    #[error("diff node pool allocation failed")]
    OutOfMemory,
}

/// One finalized hunk: an operation and the bytes it covers.
///
/// The text borrows from the input buffer the hunk describes, so it stays
/// valid for as long as the inputs do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hunk<'a> {
    pub op: DiffOp,
    pub text: &'a [u8],
}

/// A computed diff between two byte sequences.
///
/// The input buffers must outlive the session; the borrow checker holds
/// callers to that. One session is single-threaded and must not be shared
/// mutably, but independent sessions are fully isolated.
pub struct Diff<'a> {
    options: DiffOptions,
    pool: NodePool,
    list: Range,
    text1: &'a [u8],
    text2: &'a [u8],
    deadline: Option<Instant>,
    // scratch contours reused across recursive bisect calls
    v1: Vec<i32>,
    v2: Vec<i32>,
}

impl<'a> Diff<'a> {
    /// Computes the diff from `text1` to `text2`.
    ///
    /// Fails only when the node pool cannot grow; a partial script is
    /// never exposed as success.
    pub fn new(
        options: &DiffOptions,
        text1: &'a [u8],
        text2: &'a [u8],
    ) -> Result<Diff<'a>, DiffError> {
        let pool = NodePool::with_capacity(START_POOL).map_err(|_| DiffError::OutOfMemory)?;
        let deadline = if options.timeout > 0.0 {
            Duration::try_from_secs_f32(options.timeout)
                .ok()
                .map(|budget| Instant::now() + budget)
        } else {
            None
        };

        let mut diff = Diff {
            options: options.clone(),
            pool,
            list: Range::unset(),
            text1,
            text2,
            deadline,
            v1: Vec::new(),
            v2: Vec::new(),
        };
        diff.list = diff.diff_main(Span::text1(0, text1.len()), Span::text2(0, text2.len()))?;
        Ok(diff)
    }

    /// Convenience wrapper over [`Diff::new`] for string inputs.
    pub fn from_strs(
        options: &DiffOptions,
        text1: &'a str,
        text2: &'a str,
    ) -> Result<Diff<'a>, DiffError> {
        Diff::new(options, text1.as_bytes(), text2.as_bytes())
    }

    pub fn options(&self) -> &DiffOptions {
        &self.options
    }

    /// Iterates the finalized hunks in script order.
    pub fn iter(&self) -> Hunks<'_, 'a> {
        Hunks { diff: self, pos: self.list.start }
    }

    /// Number of non-empty hunks in the finalized script.
    pub fn hunk_count(&self) -> usize {
        self.iter().count()
    }

    /// Callback form of [`Diff::iter`]: feeds every hunk to `cb` until it
    /// returns non-zero, and reports that signal (or 0 if the walk ran to
    /// the end).
    pub fn for_each<F>(&self, mut cb: F) -> i32
    where
        F: FnMut(DiffOp, &'a [u8]) -> i32,
    {
        for hunk in self.iter() {
            let signal = cb(hunk.op, hunk.text);
            if signal != 0 {
                return signal;
            }
        }
        0
    }

    /// Rebuilds the left input from the script (Equal + Delete hunks).
    pub fn source_text(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for hunk in self.iter() {
            if hunk.op != DiffOp::Insert {
                out.extend_from_slice(hunk.text);
            }
        }
        out
    }

    /// Rebuilds the right input from the script (Equal + Insert hunks).
    pub fn target_text(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for hunk in self.iter() {
            if hunk.op != DiffOp::Delete {
                out.extend_from_slice(hunk.text);
            }
        }
        out
    }

    /// Dumps both inputs and the raw script (every node, even transient
    /// zero-length ones) in a line-oriented human-readable form.
    pub fn write_raw<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w)?;
        writeln!(w, "> \"{}\"", scan::escape_bytes(self.text1))?;

        let mut pos = self.list.start;
        while pos != NONE {
            let node = *self.pool.node(pos);
            let sign = match node.op {
                DiffOp::Delete => '-',
                DiffOp::Equal => '=',
                DiffOp::Insert => '+',
            };
            write!(w, "{}\"{}\"", sign, scan::escape_bytes(self.bytes(node.span)))?;
            if node.next != NONE {
                write!(w, ", ")?;
            } else {
                writeln!(w)?;
            }
            pos = node.next;
        }

        writeln!(w, "< \"{}\"", scan::escape_bytes(self.text2))
    }

    fn bytes(&self, span: Span) -> &'a [u8] {
        let buf = match span.src {
            Source::Text1 => self.text1,
            Source::Text2 => self.text2,
        };
        &buf[span.off..span.off + span.len]
    }

    fn check(&self) -> Result<(), DiffError> {
        if self.pool.failed() {
            Err(DiffError::OutOfMemory)
        } else {
            Ok(())
        }
    }

    /// Diffs one pair of sub-windows. Re-entered by the bisect recursion.
    fn diff_main(&mut self, mut t1: Span, mut t2: Span) -> Result<Range, DiffError> {
        // one-sided diffs
        if t1.len == 0 {
            let out = self.pool.range_init(DiffOp::Insert, t2);
            self.check()?;
            return Ok(out);
        }
        if t2.len == 0 {
            let out = self.pool.range_init(DiffOp::Delete, t1);
            self.check()?;
            return Ok(out);
        }

        // zero-length sentinel; the final normalize prunes it
        let mut out = self.pool.range_init(DiffOp::Equal, t1.end_mark());
        self.check()?;

        if self.options.trim_common_prefix {
            let common = scan::common_prefix(self.bytes(t1), self.bytes(t2));
            if common > 0 {
                self.pool.insert(&mut out, At::Tail, DiffOp::Equal, t1.prefix(common));
                t1.advance(common);
                t2.advance(common);
            }
        }

        if self.options.trim_common_suffix {
            let common = scan::common_suffix(self.bytes(t1), self.bytes(t2));
            if common > 0 {
                // parked after the tail: `end` stays put, so every later
                // Tail insert lands in front of this suffix node
                let end = out.end;
                self.pool.insert(&mut out, At::After(end), DiffOp::Equal, t1.suffix(common));
                t1.shrink(common);
                t2.shrink(common);
            }
        }

        // trimming may have consumed a whole side
        if t1.len == 0 {
            if t2.len > 0 {
                self.pool.insert(&mut out, At::Tail, DiffOp::Insert, t2);
            }
        } else if t2.len == 0 {
            self.pool.insert(&mut out, At::Tail, DiffOp::Delete, t1);
        } else {
            self.subdiff(&mut out, t1, t2)?;
        }

        self.pool.normalize(&mut out);
        self.check()?;
        Ok(out)
    }

    /// The non-degenerate path: containment and single-byte shortcuts,
    /// then the full bisect plus cleanup.
    fn subdiff(&mut self, out: &mut Range, t1: Span, t2: Span) -> Result<(), DiffError> {
        let (short, long, short_is_t1) = if t1.len <= t2.len {
            (t1, t2, true)
        } else {
            (t2, t1, false)
        };

        // one text wholly inside the other
        if let Some(found) = scan::find(self.bytes(long), self.bytes(short)) {
            let op = if short_is_t1 { DiffOp::Insert } else { DiffOp::Delete };
            let after = found + short.len;
            self.pool.insert(out, At::Tail, op, long.prefix(found));
            self.pool.insert(out, At::Tail, DiffOp::Equal, short);
            self.pool.insert(out, At::Tail, op, long.suffix(long.len - after));
            return Ok(());
        }

        if short.len == 1 {
            // single byte and not contained: no finer split exists
            self.pool.insert(out, At::Tail, DiffOp::Delete, t1);
            self.pool.insert(out, At::Tail, DiffOp::Insert, t2);
            return Ok(());
        }

        // TODO: half-match and line-mode (check_lines) speedups

        if !self.pool.failed() {
            self.bisect(out, t1, t2)?;
        }
        if !self.pool.failed() {
            self.cleanup_merge(out)?;
        }
        Ok(())
    }

    /// Finds the middle snake and recurses on both halves, or falls back
    /// to a full replacement when there is no snake (or no time left).
    fn bisect(&mut self, out: &mut Range, t1: Span, t2: Span) -> Result<(), DiffError> {
        let a = self.bytes(t1);
        let b = self.bytes(t2);
        let mut v1 = mem::take(&mut self.v1);
        let mut v2 = mem::take(&mut self.v2);
        let split = middle_snake(a, b, &mut v1, &mut v2, self.deadline);
        self.v1 = v1;
        self.v2 = v2;

        match split {
            Some((x, y)) => self.bisect_split(out, t1, t2, x, y),
            None => {
                // deadline hit, or the texts share nothing at all
                self.pool.insert(out, At::Tail, DiffOp::Delete, t1);
                self.pool.insert(out, At::Tail, DiffOp::Insert, t2);
                self.check()
            }
        }
    }

    fn bisect_split(
        &mut self,
        out: &mut Range,
        t1: Span,
        t2: Span,
        x: usize,
        y: usize,
    ) -> Result<(), DiffError> {
        let (t1a, t1b) = t1.split_at(x);
        let (t2a, t2b) = t2.split_at(y);
        let first = self.diff_main(t1a, t2a)?;
        let second = self.diff_main(t1b, t2b)?;
        // left half strictly precedes the right half in the script
        self.pool.splice(out, At::Tail, first);
        self.pool.splice(out, At::Tail, second);
        Ok(())
    }

    /// Canonicalizes the script: coalesce runs, factor freshly exposed
    /// affixes, slide single edits over equalities, and repeat until a
    /// full cycle changes nothing.
    fn cleanup_merge(&mut self, list: &mut Range) -> Result<(), DiffError> {
        loop {
            self.pool.normalize(list);
            if list.is_unset() {
                return self.check();
            }

            // guarantee a terminating Equal so every run hits a boundary
            let last = *self.pool.node(list.end);
            if last.op != DiffOp::Equal {
                self.pool.insert(list, At::Tail, DiffOp::Equal, last.span.end_mark());
                self.check()?;
            }

            self.merge_runs(list)?;
            let slides = self.slide_edits(list);
            self.pool.normalize(list);

            if slides == 0 {
                return self.check();
            }
            // sliding can expose new merge work, so run both passes again
        }
    }

    /// Unlinks `pos` (whose predecessor is `prev` and successor `next`)
    /// and returns it to the pool.
    fn unlink(&mut self, list: &mut Range, prev: Pos, pos: Pos, next: Pos) {
        if prev == NONE {
            list.start = next;
        } else {
            self.pool.node_mut(prev).next = next;
        }
        if list.end == pos {
            list.end = prev;
        }
        self.pool.release(pos);
    }

    /// Pass 1: merge every run of same-op nodes into the run's first node
    /// and factor out affixes shared between a merged Insert and a merged
    /// Delete meeting at the same Equal boundary.
    fn merge_runs(&mut self, list: &mut Range) -> Result<(), DiffError> {
        let mut count_ins = 0usize;
        let mut count_del = 0usize;
        let mut len_ins = 0usize;
        let mut len_del = 0usize;
        let mut ins_head = NONE;
        let mut del_head = NONE;
        let mut prev_kept = NONE; // last node still linked into the list
        let mut before = NONE; // last surviving Equal boundary

        let mut i = list.start;
        while i != NONE {
            let node = *self.pool.node(i);
            let j = node.next;
            let mut kept = true;

            match node.op {
                DiffOp::Insert => {
                    count_ins += 1;
                    len_ins += node.span.len;
                    if ins_head == NONE {
                        ins_head = i;
                    } else {
                        // fold into the run head; slices are contiguous in
                        // text2, so summing lengths re-describes the span
                        self.unlink(list, prev_kept, i, j);
                        kept = false;
                    }
                }
                DiffOp::Delete => {
                    count_del += 1;
                    len_del += node.span.len;
                    if del_head == NONE {
                        del_head = i;
                    } else {
                        self.unlink(list, prev_kept, i, j);
                        kept = false;
                    }
                }
                DiffOp::Equal => {
                    if count_ins + count_del > 0 {
                        if count_ins > 0 && count_del > 0 {
                            // merging may have exposed commonality that was
                            // invisible while the edits were interleaved
                            let ins_span = self.pool.node(ins_head).span.with_len(len_ins);
                            let del_span = self.pool.node(del_head).span.with_len(len_del);
                            let common =
                                scan::common_prefix(self.bytes(ins_span), self.bytes(del_span));
                            if common > 0 {
                                if before == NONE {
                                    self.pool.insert(
                                        list,
                                        At::Head,
                                        DiffOp::Equal,
                                        ins_span.prefix(common),
                                    );
                                    self.check()?;
                                } else {
                                    self.pool.node_mut(before).span.len += common;
                                }
                                self.pool.node_mut(ins_head).span.advance(common);
                                len_ins -= common;
                                self.pool.node_mut(del_head).span.advance(common);
                                len_del -= common;
                            }

                            let ins_span = self.pool.node(ins_head).span.with_len(len_ins);
                            let del_span = self.pool.node(del_head).span.with_len(len_del);
                            let common =
                                scan::common_suffix(self.bytes(ins_span), self.bytes(del_span));
                            if common > 0 {
                                // donate the suffix to this Equal's leading edge
                                let eq = self.pool.node_mut(i);
                                eq.span.off -= common;
                                eq.span.len += common;
                                len_ins -= common;
                                len_del -= common;
                            }
                        }
                        if del_head != NONE {
                            self.pool.node_mut(del_head).span.len = len_del;
                        }
                        if ins_head != NONE {
                            self.pool.node_mut(ins_head).span.len = len_ins;
                        }
                        before = i;
                    } else if prev_kept != NONE && self.pool.node(prev_kept).op == DiffOp::Equal {
                        // two Equals in a row: fold this one into the last
                        self.pool.node_mut(prev_kept).span.len += node.span.len;
                        self.unlink(list, prev_kept, i, j);
                        kept = false;
                        before = prev_kept;
                    } else {
                        before = i;
                    }

                    count_ins = 0;
                    count_del = 0;
                    len_ins = 0;
                    len_del = 0;
                    ins_head = NONE;
                    del_head = NONE;
                }
            }

            if kept {
                prev_kept = i;
            }
            i = j;
        }

        self.check()
    }

    /// Pass 2: a single edit pinched between two equalities can sometimes
    /// slide fully over one of them, eliminating that equality. Returns
    /// the number of slides performed.
    fn slide_edits(&mut self, list: &mut Range) -> usize {
        let mut changes = 0;
        if list.is_unset() {
            return 0;
        }

        let mut prev = list.start;
        let mut cur = self.pool.node(prev).next;
        while cur != NONE {
            let next = self.pool.node(cur).next;
            if next == NONE {
                break;
            }

            let prev_node = *self.pool.node(prev);
            let next_node = *self.pool.node(next);
            if prev_node.op == DiffOp::Equal && next_node.op == DiffOp::Equal {
                let cur_span = self.pool.node(cur).span;
                let cur_bytes = self.bytes(cur_span);

                if prev_node.span.len > 0
                    && scan::has_suffix(cur_bytes, self.bytes(prev_node.span))
                {
                    // slide left: the equality's bytes move to the front of
                    // the edit and of the following equality
                    let shift = prev_node.span.len;
                    self.pool.node_mut(cur).span.off -= shift;
                    let follow = self.pool.node_mut(next);
                    follow.span.off -= shift;
                    follow.span.len += shift;
                    self.pool.node_mut(prev).span.len = 0;
                    changes += 1;
                } else if prev_node.span.len > 0
                    && next_node.span.len > 0
                    && scan::has_prefix(cur_bytes, self.bytes(next_node.span))
                {
                    // slide right: donate the edit's leading bytes to the
                    // preceding equality. A predecessor zeroed earlier in
                    // this sweep has a stale offset, so the slide waits for
                    // the next cycle, after normalize prunes the zeroed node.
                    let shift = next_node.span.len;
                    self.pool.node_mut(prev).span.len += shift;
                    self.pool.node_mut(cur).span.off += shift;
                    self.pool.node_mut(next).span.len = 0;
                    changes += 1;
                }
            }

            prev = cur;
            cur = next;
        }

        changes
    }
}

/// Iterator over the non-empty hunks of a finalized script.
pub struct Hunks<'d, 'a> {
    diff: &'d Diff<'a>,
    pos: Pos,
}

impl<'d, 'a> Iterator for Hunks<'d, 'a> {
    type Item = Hunk<'a>;

    fn next(&mut self) -> Option<Hunk<'a>> {
        while self.pos != NONE {
            let node = *self.diff.pool.node(self.pos);
            self.pos = node.next;
            if node.span.len > 0 {
                return Some(Hunk {
                    op: node.op,
                    text: self.diff.bytes(node.span),
                });
            }
        }
        None
    }
}

/// Myers contour search for the middle snake of `a` vs `b`.
///
/// Runs the forward and reverse D-contours in lockstep and reports the
/// forward (x, y) coordinates at their first overlap. The parity of
/// `delta` decides which sweep checks for the overlap; testing a single
/// side per iteration keeps the total work at O(ND). Returns `None` when
/// the texts share no bytes at all, or when the deadline expires first.
fn middle_snake(
    a: &[u8],
    b: &[u8],
    v1: &mut Vec<i32>,
    v2: &mut Vec<i32>,
    deadline: Option<Instant>,
) -> Option<(usize, usize)> {
    let n = a.len() as i32;
    let m = b.len() as i32;
    let max_d = (n + m + 1) / 2;
    let v_offset = max_d;
    let v_len = (2 * max_d) as usize;

    // scratch contours grow across recursion but never shrink
    if v1.len() < v_len {
        v1.resize(v_len, -1);
        v2.resize(v_len, -1);
    }
    v1[..v_len].fill(-1);
    v2[..v_len].fill(-1);
    v1[(v_offset + 1) as usize] = 0;
    v2[(v_offset + 1) as usize] = 0;

    let delta = n - m;
    let front = delta % 2 != 0;
    // active diagonal windows shrink as contours run off the grid
    let mut k1start = 0i32;
    let mut k1end = 0i32;
    let mut k2start = 0i32;
    let mut k2end = 0i32;

    for d in 0..max_d {
        if deadline.is_some_and(|t| Instant::now() >= t) {
            break;
        }

        // advance the forward contour
        let mut k1 = -d + k1start;
        while k1 <= d - k1end {
            let k1off = (v_offset + k1) as usize;
            let mut x1 = if k1 == -d || (k1 != d && v1[k1off - 1] < v1[k1off + 1]) {
                v1[k1off + 1]
            } else {
                v1[k1off - 1] + 1
            };
            let mut y1 = x1 - k1;
            while x1 < n && y1 < m && a[x1 as usize] == b[y1 as usize] {
                x1 += 1;
                y1 += 1;
            }
            v1[k1off] = x1;
            if x1 > n {
                k1end += 2; // ran off the right of the graph
            } else if y1 > m {
                k1start += 2; // ran off the bottom of the graph
            } else if front {
                let k2off = v_offset + delta - k1;
                if k2off >= 0 && k2off < v_len as i32 && v2[k2off as usize] != -1 {
                    // mirror the reverse x onto the forward coordinates
                    let x2 = n - v2[k2off as usize];
                    if x1 >= x2 {
                        return Some((x1 as usize, y1 as usize));
                    }
                }
            }
            k1 += 2;
        }

        // advance the reverse contour
        let mut k2 = -d + k2start;
        while k2 <= d - k2end {
            let k2off = (v_offset + k2) as usize;
            let mut x2 = if k2 == -d || (k2 != d && v2[k2off - 1] < v2[k2off + 1]) {
                v2[k2off + 1]
            } else {
                v2[k2off - 1] + 1
            };
            let mut y2 = x2 - k2;
            while x2 < n && y2 < m && a[(n - x2 - 1) as usize] == b[(m - y2 - 1) as usize] {
                x2 += 1;
                y2 += 1;
            }
            v2[k2off] = x2;
            if x2 > n {
                k2end += 2; // ran off the left of the graph
            } else if y2 > m {
                k2start += 2; // ran off the top of the graph
            } else if !front {
                let k1off = v_offset + delta - k2;
                if k1off >= 0 && k1off < v_len as i32 && v1[k1off as usize] != -1 {
                    let x1 = v1[k1off as usize];
                    let y1 = v_offset + x1 - k1off;
                    if x1 >= n - x2 {
                        return Some((x1 as usize, y1 as usize));
                    }
                }
            }
            k2 += 2;
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snake(a: &[u8], b: &[u8]) -> Option<(usize, usize)> {
        let mut v1 = Vec::new();
        let mut v2 = Vec::new();
        middle_snake(a, b, &mut v1, &mut v2, None)
    }

    #[test]
    fn test_middle_snake_splits_inside_both_texts() {
        let a = b"abcabba";
        let b = b"cbabac";
        let (x, y) = snake(a, b).expect("texts share bytes, split expected");
        assert!(x <= a.len());
        assert!(y <= b.len());
        // the split must not be the trivial all-left or all-right corner
        assert!(x + y > 0);
        assert!(x < a.len() || y < b.len());
    }

    #[test]
    fn test_middle_snake_no_common_bytes() {
        assert_eq!(snake(b"abcd", b"wxyz"), None);
    }

    #[test]
    fn test_middle_snake_expired_deadline() {
        let mut v1 = Vec::new();
        let mut v2 = Vec::new();
        let expired = Some(Instant::now());
        assert_eq!(
            middle_snake(b"abcabba", b"cbabac", &mut v1, &mut v2, expired),
            None
        );
    }

    #[test]
    fn test_scratch_arrays_grow_but_never_shrink() {
        let mut v1 = Vec::new();
        let mut v2 = Vec::new();
        middle_snake(b"abcabba", b"cbabac", &mut v1, &mut v2, None);
        let grown = v1.len();
        assert!(grown >= 7);
        middle_snake(b"ab", b"ba", &mut v1, &mut v2, None);
        assert_eq!(v1.len(), grown);
        assert_eq!(v2.len(), grown);
    }

    #[test]
    fn test_cleanup_is_idempotent_on_canonical_scripts() {
        let opts = DiffOptions::default();
        for (t1, t2) in [
            ("1ayb2", "abxab"),
            ("abcy", "xaxcxabc"),
            ("aabbccdd", "aaddccbb"),
            ("Apples are a fruit.", "Bananas are also fruit."),
        ] {
            let mut diff = Diff::from_strs(&opts, t1, t2).expect("diff must succeed");
            let before: Vec<_> = diff.iter().map(|h| (h.op, h.text.to_vec())).collect();

            let mut list = diff.list;
            diff.cleanup_merge(&mut list).expect("cleanup must succeed");
            diff.list = list;

            let after: Vec<_> = diff.iter().map(|h| (h.op, h.text.to_vec())).collect();
            assert_eq!(after, before, "cleanup changed a canonical script for {t1:?}");
        }
    }

    #[test]
    fn test_zero_timeout_disables_deadline() {
        let opts = DiffOptions { timeout: 0.0, ..DiffOptions::default() };
        let diff = Diff::from_strs(&opts, "1ayb2", "abxab").expect("diff must succeed");
        assert!(diff.deadline.is_none());
        assert_eq!(diff.source_text(), b"1ayb2");
        assert_eq!(diff.target_text(), b"abxab");
    }
}
