//! # Bounded In-order Iterator
//!
//! Advances a [`NodeHandle`] through the tree in ascending key order,
//! mirroring the successor algorithm libc++'s `__tree_iterator::operator++`
//! uses (`__tree_next` over left/right/parent links), so that the walk agrees
//! with the real node linkage in target memory.
//!
//! Nothing about that memory is trusted. A corrupted or mid-mutation tree can
//! contain cycles or dangling links, so every internal step — successor
//! search and left-minimum descent alike — is counted against a hard ceiling
//! (`max_depth`, the declared element count). Exceeding the ceiling collapses
//! the current handle to empty: the traversal is *exhausted*, which is a
//! definitive "no such element", not an error. A failed read, by contrast,
//! sets a sticky error flag; once set, every further [`InorderIter::advance`]
//! fails immediately.
//!
//! The iterator is built fresh per lookup and is cheap to snapshot, which is
//! what makes the container view's index cache possible.

use tracing::trace;

use crate::image::MemoryImage;
use crate::node::NodeHandle;
use crate::types::ValueId;

/// Cacheable state of an [`InorderIter`]
///
/// Holds the current entry token and the sticky error flag; the step ceiling
/// is deliberately *not* part of the snapshot, because the container view
/// re-derives it from the freshest known count on every lookup.
#[derive(Debug, Clone, Copy)]
pub struct IterSnapshot
{
    pub(crate) entry: Option<ValueId>,
    pub(crate) errored: bool,
}

/// Bounded in-order traversal over an untrusted remote tree
pub struct InorderIter<'a, M: MemoryImage + ?Sized>
{
    entry: NodeHandle<'a, M>,
    max_depth: usize,
    errored: bool,
}

impl<'a, M: MemoryImage + ?Sized> InorderIter<'a, M>
{
    /// Start a traversal at `entry` with a step ceiling of `max_depth`
    ///
    /// The ceiling should be the container's declared element count: no
    /// correct traversal can take more steps than there are elements, so
    /// exceeding it is conclusive evidence of corruption or of searching past
    /// the structure's true bound.
    pub fn new(entry: NodeHandle<'a, M>, max_depth: usize) -> Self
    {
        InorderIter { entry, max_depth, errored: false }
    }

    /// Rebuild an iterator from a cached snapshot
    ///
    /// `max_depth` is supplied fresh by the caller rather than restored; see
    /// [`IterSnapshot`].
    pub fn from_snapshot(image: &'a M, snapshot: IterSnapshot, max_depth: usize) -> Self
    {
        InorderIter {
            entry: NodeHandle::new(image, snapshot.entry),
            max_depth,
            errored: snapshot.errored,
        }
    }

    /// Capture the iterator's cacheable state
    pub fn snapshot(&self) -> IterSnapshot
    {
        IterSnapshot {
            entry: self.entry.entry(),
            errored: self.errored,
        }
    }

    /// The current node handle
    pub fn node(&self) -> NodeHandle<'a, M>
    {
        self.entry
    }

    /// Advance by `count` logical steps and return the resulting node
    ///
    /// Returns `None` if the iterator has errored (now or previously), the
    /// walk ran off the end of the structure, or the step ceiling was
    /// exceeded. `advance(0)` returns the current node without moving.
    ///
    /// Once this returns `None` the iterator is spent: the error flag is
    /// sticky and an exhausted handle stays empty.
    pub fn advance(&mut self, count: usize) -> Option<ValueId>
    {
        if self.errored {
            return None;
        }
        let mut steps = 0usize;
        let mut remaining = count;
        while remaining > 0 {
            self.next();
            remaining -= 1;
            steps += 1;
            if self.errored || self.entry.is_null() || steps > self.max_depth {
                trace!(steps, errored = self.errored, "in-order advance stopped early");
                return None;
            }
        }
        self.entry.entry()
    }

    /// One in-order successor step, mirroring libc++'s `__tree_next`
    ///
    /// The successor of null is null. A node with a right child succeeds to
    /// the left-most descendant of that right subtree; otherwise we walk
    /// parents until the current node is its parent's left child, and the
    /// successor is that parent.
    fn next(&mut self)
    {
        if self.entry.is_null() {
            return;
        }
        let right = self.entry.right();
        if !right.is_null() {
            self.entry = self.tree_min(right);
            return;
        }
        let mut steps = 0usize;
        while !Self::is_left_child(&self.entry) {
            if self.entry.is_error() {
                self.errored = true;
                return;
            }
            self.entry = self.entry.parent();
            steps += 1;
            if steps > self.max_depth {
                // Ancestor chain longer than the whole container: exhausted,
                // not errored.
                self.entry = NodeHandle::empty(self.entry.image());
                return;
            }
        }
        self.entry = self.entry.parent();
    }

    /// Left-most descendant of `x`, mirroring libc++'s `__tree_min`
    fn tree_min(&mut self, mut x: NodeHandle<'a, M>) -> NodeHandle<'a, M>
    {
        if x.is_null() {
            return NodeHandle::empty(x.image());
        }
        let mut left = x.left();
        let mut steps = 0usize;
        while !left.is_null() {
            if left.is_error() {
                self.errored = true;
                return NodeHandle::empty(x.image());
            }
            x = left;
            left = x.left();
            steps += 1;
            if steps > self.max_depth {
                return NodeHandle::empty(x.image());
            }
        }
        x
    }

    /// Whether `x` is the left child of its parent
    ///
    /// Decided by reading the parent's own left link and comparing node
    /// identities. A null node is never a left child; that is what terminates
    /// the parent walk at the root, whose ancestor chain runs out first.
    fn is_left_child(x: &NodeHandle<'a, M>) -> bool
    {
        if x.is_null() {
            return false;
        }
        x.identity_value() == x.parent().left().identity_value()
    }
}
