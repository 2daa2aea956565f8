//! Arena-backed storage for edit-script nodes.
//!
//! Scripts are singly-linked sequences of fixed-shape nodes living in one
//! growable pool. All links are pool indices, never references, so growth
//! can relocate the backing storage without invalidating anything already
//! handed out. Slot 0 is permanently reserved: every valid index is >= 1
//! and [`NONE`] marks the absence of a node. Released slots thread through
//! a free list and are reused before the pool grows again.

use std::collections::TryReserveError;

/// Pool index of a node, or [`NONE`].
pub type Pos = i32;

/// The "no node" sentinel, distinct from every valid (>= 1) index.
pub const NONE: Pos = -1;

const MIN_POOL: usize = 2;
const MAX_POOL_INCREMENT: usize = 128;

/// One edit-script operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiffOp {
    Delete = -1,
    Equal = 0,
    Insert = 1,
}

/// Which of the session's two input buffers a span borrows from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Text1,
    Text2,
}

/// A window into one of the session's input buffers.
///
/// Nodes never own bytes; they describe `buffer[off..off + len]` of the
/// buffer named by `src`. The session that owns the buffers resolves a
/// span back into a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub src: Source,
    pub off: usize,
    pub len: usize,
}

impl Span {
    pub fn text1(off: usize, len: usize) -> Span {
        Span { src: Source::Text1, off, len }
    }

    pub fn text2(off: usize, len: usize) -> Span {
        Span { src: Source::Text2, off, len }
    }

    /// Zero-length span sitting just past this one.
    pub fn end_mark(self) -> Span {
        Span { src: self.src, off: self.off + self.len, len: 0 }
    }

    /// First `n` bytes.
    pub fn prefix(self, n: usize) -> Span {
        debug_assert!(n <= self.len);
        Span { len: n, ..self }
    }

    /// Last `n` bytes.
    pub fn suffix(self, n: usize) -> Span {
        debug_assert!(n <= self.len);
        Span { off: self.off + self.len - n, len: n, ..self }
    }

    /// Same start, different length.
    pub fn with_len(self, len: usize) -> Span {
        Span { len, ..self }
    }

    pub fn split_at(self, at: usize) -> (Span, Span) {
        debug_assert!(at <= self.len);
        (
            Span { len: at, ..self },
            Span { off: self.off + at, len: self.len - at, ..self },
        )
    }

    /// Drop `n` bytes from the front.
    pub fn advance(&mut self, n: usize) {
        debug_assert!(n <= self.len);
        self.off += n;
        self.len -= n;
    }

    /// Drop `n` bytes from the back.
    pub fn shrink(&mut self, n: usize) {
        debug_assert!(n <= self.len);
        self.len -= n;
    }
}

/// One edit-script element: an operation applied to a span of input bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    pub op: DiffOp,
    pub span: Span,
    pub next: Pos,
}

/// An ordered node sequence inside one pool, addressed by first and last
/// index. Copying a `Range` copies the view, not the nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: Pos,
    pub end: Pos,
}

impl Range {
    /// The empty/unset range.
    pub fn unset() -> Range {
        Range { start: NONE, end: NONE }
    }

    pub fn is_unset(&self) -> bool {
        self.start == NONE
    }
}

/// Where to link a new node or spliced range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum At {
    /// Before the range's first node.
    Head,
    /// After the range's last node, becoming the new `end`.
    Tail,
    /// Immediately after an existing node. Does not move `end`, which
    /// lets a caller park a node past the tail and keep appending in
    /// front of it.
    After(Pos),
}

/// Slot arena for [`Node`]s with a free list and a sticky error flag.
#[derive(Debug)]
pub struct NodePool {
    nodes: Vec<Node>,
    free_list: Pos,
    failed: bool,
}

impl NodePool {
    /// Allocates a pool with room for about `hint` nodes before growing.
    pub fn with_capacity(hint: usize) -> Result<NodePool, TryReserveError> {
        let mut nodes = Vec::new();
        nodes.try_reserve_exact(hint.max(MIN_POOL))?;
        // slot 0 stays unused so NONE and valid indices never collide
        nodes.push(Node {
            op: DiffOp::Equal,
            span: Span::text1(0, 0),
            next: NONE,
        });
        Ok(NodePool { nodes, free_list: NONE, failed: false })
    }

    /// Whether an allocation has ever failed. Sticky for the life of the
    /// pool; once set, callers must stop and surface the failure.
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// High-water mark: slots ever allocated, including the reserved one.
    pub fn used(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, pos: Pos) -> &Node {
        &self.nodes[pos as usize]
    }

    pub fn node_mut(&mut self, pos: Pos) -> &mut Node {
        &mut self.nodes[pos as usize]
    }

    fn grow(&mut self) {
        let cap = self.nodes.capacity();
        // double while small, then settle into fixed increments
        let target = if cap > MAX_POOL_INCREMENT {
            cap + MAX_POOL_INCREMENT
        } else {
            cap * 2
        };
        if self.nodes.try_reserve_exact(target - self.nodes.len()).is_err() {
            self.failed = true;
        }
    }

    /// Allocates a node, reusing a released slot when one is available.
    ///
    /// Zero-length Insert/Delete spans are rejected outright (they carry
    /// no edit) and return [`NONE`] without touching the pool. Returns
    /// [`NONE`] and sets the sticky flag if the pool cannot grow.
    pub fn alloc(&mut self, op: DiffOp, span: Span) -> Pos {
        if span.len == 0 && op != DiffOp::Equal {
            return NONE;
        }

        if self.free_list > 0 {
            let pos = self.free_list;
            self.free_list = self.nodes[pos as usize].next;
            self.nodes[pos as usize] = Node { op, span, next: NONE };
            return pos;
        }

        if self.nodes.len() == self.nodes.capacity() {
            self.grow();
            if self.failed {
                return NONE;
            }
        }
        let pos = self.nodes.len() as Pos;
        self.nodes.push(Node { op, span, next: NONE });
        pos
    }

    /// Returns a slot to the free list. The caller must own `pos` and
    /// must not touch the node afterwards.
    pub fn release(&mut self, pos: Pos) {
        self.nodes[pos as usize].next = self.free_list;
        self.free_list = pos;
    }

    /// Starts a range with a single node. The range is unset if the
    /// allocation was rejected or failed.
    pub fn range_init(&mut self, op: DiffOp, span: Span) -> Range {
        let pos = self.alloc(op, span);
        Range { start: pos, end: pos }
    }

    /// Allocates a node and links it into `range` at `at`.
    ///
    /// A rejected allocation (zero-length edit, or pool failure) leaves
    /// the range untouched and returns [`NONE`].
    pub fn insert(&mut self, range: &mut Range, at: At, op: DiffOp, span: Span) -> Pos {
        let added = self.alloc(op, span);
        if added == NONE {
            return NONE;
        }

        if range.is_unset() {
            *range = Range { start: added, end: added };
            return added;
        }

        match at {
            At::Tail => {
                let end = range.end;
                self.nodes[added as usize].next = self.nodes[end as usize].next;
                self.nodes[end as usize].next = added;
                range.end = added;
            }
            At::Head => {
                self.nodes[added as usize].next = range.start;
                range.start = added;
            }
            At::After(pos) => {
                self.nodes[added as usize].next = self.nodes[pos as usize].next;
                self.nodes[pos as usize].next = added;
            }
        }

        added
    }

    /// Links every node of `from` into `onto` at `at`.
    ///
    /// `from` is normalized first; its nodes belong to `onto` afterwards
    /// and the `from` value must not be used again.
    pub fn splice(&mut self, onto: &mut Range, at: At, from: Range) {
        let mut from = from;
        self.normalize(&mut from);
        if from.is_unset() {
            return;
        }
        if onto.is_unset() {
            *onto = from;
            return;
        }

        let tail = from.end;
        match at {
            At::Tail => {
                let end = onto.end;
                self.nodes[tail as usize].next = self.nodes[end as usize].next;
                self.nodes[end as usize].next = from.start;
                onto.end = from.end;
            }
            At::Head => {
                self.nodes[tail as usize].next = onto.start;
                onto.start = from.start;
            }
            At::After(pos) => {
                self.nodes[tail as usize].next = self.nodes[pos as usize].next;
                self.nodes[pos as usize].next = from.start;
            }
        }
    }

    /// Number of nodes in the range, counting zero-length ones.
    pub fn range_len(&self, range: Range) -> usize {
        let mut count = 0;
        let mut pos = range.start;
        while pos != NONE {
            count += 1;
            pos = self.nodes[pos as usize].next;
        }
        count
    }

    /// Releases every zero-length node, relinks around the holes, and
    /// points `end` at the last survivor. Idempotent. A range that loses
    /// all of its nodes becomes unset.
    pub fn normalize(&mut self, range: &mut Range) {
        let mut last_nonzero = NONE;
        let mut prev = NONE;
        let mut pos = range.start;

        while pos != NONE {
            let next = self.nodes[pos as usize].next;
            if self.nodes[pos as usize].span.len == 0 {
                if prev == NONE {
                    range.start = next;
                } else {
                    self.nodes[prev as usize].next = next;
                }
                self.release(pos);
            } else {
                last_nonzero = pos;
                prev = pos;
            }
            pos = next;
        }

        range.end = last_nonzero;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(pool: &NodePool, range: Range) -> Vec<Span> {
        let mut out = Vec::new();
        let mut pos = range.start;
        while pos != NONE {
            let node = pool.node(pos);
            out.push(node.span);
            pos = node.next;
        }
        out
    }

    #[test]
    fn test_indices_start_at_one() {
        let mut pool = NodePool::with_capacity(4).expect("pool alloc");
        let range = pool.range_init(DiffOp::Equal, Span::text1(0, 0));
        assert!(range.start >= 1);
        assert_eq!(range.start, range.end);
        assert_eq!(pool.range_len(range), 1);
    }

    #[test]
    fn test_zero_length_edit_rejected() {
        let mut pool = NodePool::with_capacity(4).expect("pool alloc");
        assert_eq!(pool.alloc(DiffOp::Insert, Span::text2(0, 0)), NONE);
        assert_eq!(pool.alloc(DiffOp::Delete, Span::text1(3, 0)), NONE);
        assert!(!pool.failed());

        let mut range = pool.range_init(DiffOp::Equal, Span::text1(0, 2));
        let before = range;
        assert_eq!(pool.insert(&mut range, At::Tail, DiffOp::Insert, Span::text2(0, 0)), NONE);
        assert_eq!(range, before);
    }

    #[test]
    fn test_normalize_and_free_list_reuse() {
        let mut pool = NodePool::with_capacity(4).expect("pool alloc");

        // [len0] ab [len0] cd [len0] ef [len0]
        let mut r = pool.range_init(DiffOp::Equal, Span::text1(0, 0));
        assert!(r.start > 0);
        assert!(pool.insert(&mut r, At::Tail, DiffOp::Equal, Span::text1(0, 2)) > 0);
        assert_ne!(r.start, r.end);
        assert!(pool.insert(&mut r, At::Tail, DiffOp::Equal, Span::text1(2, 0)) > 0);
        assert!(pool.insert(&mut r, At::Tail, DiffOp::Equal, Span::text1(2, 2)) > 0);
        assert!(pool.insert(&mut r, At::Tail, DiffOp::Equal, Span::text1(4, 0)) > 0);
        assert!(pool.insert(&mut r, At::Tail, DiffOp::Equal, Span::text1(4, 2)) > 0);
        assert!(pool.insert(&mut r, At::Tail, DiffOp::Equal, Span::text1(6, 0)) > 0);
        assert_eq!(pool.range_len(r), 7);

        let used = pool.used();
        pool.normalize(&mut r);
        assert_eq!(pool.range_len(r), 3);
        assert_eq!(pool.node(r.start).span, Span::text1(0, 2));
        assert_eq!(pool.node(r.end).span, Span::text1(4, 2));

        // the four released slots are reused before the pool grows
        for _ in 0..4 {
            assert!(pool.insert(&mut r, At::Tail, DiffOp::Equal, Span::text1(6, 0)) > 0);
            assert_eq!(pool.used(), used);
        }
        assert!(pool.insert(&mut r, At::Tail, DiffOp::Equal, Span::text1(6, 0)) > 0);
        assert_eq!(pool.used(), used + 1);
    }

    #[test]
    fn test_normalize_idempotent() {
        let mut pool = NodePool::with_capacity(4).expect("pool alloc");
        let mut r = pool.range_init(DiffOp::Equal, Span::text1(0, 0));
        pool.insert(&mut r, At::Tail, DiffOp::Equal, Span::text1(0, 3));
        pool.insert(&mut r, At::Tail, DiffOp::Equal, Span::text1(3, 0));
        pool.insert(&mut r, At::Tail, DiffOp::Delete, Span::text1(3, 1));

        pool.normalize(&mut r);
        let once = spans(&pool, r);
        let r_once = r;
        pool.normalize(&mut r);
        assert_eq!(spans(&pool, r), once);
        assert_eq!(r, r_once);
    }

    #[test]
    fn test_normalize_empties_range() {
        let mut pool = NodePool::with_capacity(4).expect("pool alloc");
        let mut r = pool.range_init(DiffOp::Equal, Span::text1(5, 0));
        pool.insert(&mut r, At::Tail, DiffOp::Equal, Span::text1(5, 0));
        pool.normalize(&mut r);
        assert!(r.is_unset());
        assert_eq!(pool.range_len(r), 0);
    }

    #[test]
    fn test_insert_head_and_after() {
        let mut pool = NodePool::with_capacity(8).expect("pool alloc");
        let mut r = pool.range_init(DiffOp::Equal, Span::text1(2, 2));
        pool.insert(&mut r, At::Head, DiffOp::Equal, Span::text1(0, 2));
        assert_eq!(spans(&pool, r), vec![Span::text1(0, 2), Span::text1(2, 2)]);

        // After(end) parks a node past the tail without moving `end`
        let end_before = r.end;
        pool.insert(&mut r, At::After(end_before), DiffOp::Equal, Span::text1(9, 1));
        assert_eq!(r.end, end_before);

        // a Tail insert now lands in front of the parked node
        pool.insert(&mut r, At::Tail, DiffOp::Equal, Span::text1(4, 2));
        assert_eq!(
            spans(&pool, r),
            vec![
                Span::text1(0, 2),
                Span::text1(2, 2),
                Span::text1(4, 2),
                Span::text1(9, 1),
            ]
        );
    }

    #[test]
    fn test_splice_tail() {
        let mut pool = NodePool::with_capacity(8).expect("pool alloc");
        let mut onto = pool.range_init(DiffOp::Equal, Span::text1(0, 2));
        pool.insert(&mut onto, At::Tail, DiffOp::Equal, Span::text1(2, 2));

        let mut from = pool.range_init(DiffOp::Equal, Span::text1(4, 2));
        pool.insert(&mut from, At::Tail, DiffOp::Equal, Span::text1(6, 0));
        pool.insert(&mut from, At::Tail, DiffOp::Equal, Span::text1(6, 2));

        pool.splice(&mut onto, At::Tail, from);
        // the zero-length node was pruned during the splice
        assert_eq!(
            spans(&pool, onto),
            vec![
                Span::text1(0, 2),
                Span::text1(2, 2),
                Span::text1(4, 2),
                Span::text1(6, 2),
            ]
        );
        assert_eq!(pool.node(onto.end).span, Span::text1(6, 2));
    }

    #[test]
    fn test_splice_head() {
        let mut pool = NodePool::with_capacity(8).expect("pool alloc");
        let mut onto = pool.range_init(DiffOp::Equal, Span::text1(4, 2));
        let from = pool.range_init(DiffOp::Equal, Span::text1(0, 4));
        pool.splice(&mut onto, At::Head, from);
        assert_eq!(spans(&pool, onto), vec![Span::text1(0, 4), Span::text1(4, 2)]);
    }

    #[test]
    fn test_growth_preserves_indices() {
        let mut pool = NodePool::with_capacity(2).expect("pool alloc");
        let mut r = pool.range_init(DiffOp::Equal, Span::text1(0, 1));
        let first = r.start;
        for i in 1..64 {
            pool.insert(&mut r, At::Tail, DiffOp::Equal, Span::text1(i, 1));
        }
        assert!(!pool.failed());
        assert_eq!(r.start, first);
        assert_eq!(pool.node(first).span, Span::text1(0, 1));
        assert_eq!(pool.range_len(r), 64);
    }
}
