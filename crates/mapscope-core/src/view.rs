//! # Sorted Container View
//!
//! Resolves "the key/value payload at logical index *i*" of one remote
//! `std::map` instance, by driving a [`InorderIter`] from the container's
//! cached leftmost node and reading the payload at a memoized byte offset
//! into the reached node.
//!
//! ## Caching
//!
//! Three things are memoized per view generation:
//!
//! - the **element count**, read once from the tree's size field;
//! - the **element layout** (payload type and byte offset), treated as
//!   expensive to obtain and resolved lazily from the first node reached;
//! - an **iterator snapshot per resolved index**, so that a request for
//!   index *i* can restart from the snapshot at *i − 1* and advance a single
//!   step. Strictly increasing sequential access is amortized O(1) per
//!   element; any cold random access is O(index), bounded by O(count).
//!
//! All three are dropped together by [`SortedMapView::refresh`], which must
//! be called whenever the backing variable may have changed (new process
//! stop, new evaluation).
//!
//! ## Failing closed
//!
//! Any traversal-level failure marks the whole view unusable by clearing its
//! tree reference: the structure is garbage, and repeating a doomed bounded
//! walk for every remaining index would be expensive futility. Subsequent
//! lookups fail fast until the next refresh.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::image::{
    compressed_pair_first, LayoutResolver, MemoryImage, BEGIN_NODE_MEMBER, SIZE_PAIR_MEMBER,
    TREE_MEMBER,
};
use crate::iter::{InorderIter, IterSnapshot};
use crate::node::NodeHandle;
use crate::types::{TypeRef, ValueId};

/// Index-addressable view over one remote sorted container instance
///
/// One view serves one logical inspection session; it is not shared between
/// callers and needs no locking. Create it when inspection of a container
/// variable begins, [`refresh`](SortedMapView::refresh) it on every target
/// stop, and drop it when inspection ends.
pub struct SortedMapView<'a, M, L>
where
    M: MemoryImage + ?Sized,
    L: LayoutResolver + ?Sized,
{
    image: &'a M,
    layouts: &'a L,
    /// The `std::map` variable itself
    backend: ValueId,
    /// The tree object inside it; cleared to disable the view after a
    /// traversal failure
    tree: Option<ValueId>,
    /// The cached leftmost node, where every traversal starts
    begin_node: Option<ValueId>,
    payload_ty: Option<TypeRef>,
    skip_offset: Option<u64>,
    count: Option<usize>,
    iterators: BTreeMap<usize, IterSnapshot>,
}

impl<'a, M, L> SortedMapView<'a, M, L>
where
    M: MemoryImage + ?Sized,
    L: LayoutResolver + ?Sized,
{
    /// Create a view over `backend`, a `std::map` variable in the image
    ///
    /// Performs an initial [`refresh`](SortedMapView::refresh); an unreadable
    /// backend still yields a view, which then reports zero elements.
    pub fn new(image: &'a M, layouts: &'a L, backend: ValueId) -> Self
    {
        let mut view = SortedMapView {
            image,
            layouts,
            backend,
            tree: None,
            begin_node: None,
            payload_ty: None,
            skip_offset: None,
            count: None,
            iterators: BTreeMap::new(),
        };
        view.refresh();
        view
    }

    /// Re-derive all cached state from the backing variable
    ///
    /// Clears the count memo, the layout memo, and the entire iterator cache,
    /// then re-reads the tree reference and its leftmost node. Structurally
    /// infallible: if the re-reads fail, the view simply degrades to zero
    /// elements / failed lookups afterwards.
    pub fn refresh(&mut self)
    {
        self.count = None;
        self.payload_ty = None;
        self.skip_offset = None;
        self.iterators.clear();
        self.tree = self.image.child_by_name(self.backend, TREE_MEMBER).ok();
        self.begin_node = self
            .tree
            .and_then(|tree| self.image.child_by_name(tree, BEGIN_NODE_MEMBER).ok());
        trace!(
            tree_readable = self.tree.is_some(),
            begin_readable = self.begin_node.is_some(),
            "container view refreshed"
        );
    }

    /// The container's declared element count
    ///
    /// Read once per generation from the tree's size field and memoized.
    /// Returns `0` if the tree or size field is unreadable — a failed read is
    /// *not* memoized, so the next call retries.
    pub fn count(&mut self) -> usize
    {
        if let Some(count) = self.count {
            return count;
        }
        let Some(tree) = self.tree else {
            return 0;
        };
        let Ok(size_pair) = self.image.child_by_name(tree, SIZE_PAIR_MEMBER) else {
            return 0;
        };
        let Ok(size_node) = compressed_pair_first(self.image, size_pair) else {
            return 0;
        };
        let count = usize::try_from(self.image.unsigned_value(size_node)).unwrap_or(0);
        self.count = Some(count);
        count
    }

    /// Number of children this view exposes to the presentation layer
    ///
    /// Identical to [`count`](SortedMapView::count); kept separate so the
    /// presentation contract reads naturally.
    pub fn child_count(&mut self) -> usize
    {
        self.count()
    }

    /// Whether the element layout has been resolved for this generation
    pub fn layout_ready(&self) -> bool
    {
        self.skip_offset.is_some()
    }

    /// Number of iterator snapshots currently cached (diagnostics)
    pub fn cached_snapshots(&self) -> usize
    {
        self.iterators.len()
    }

    /// The key/value payload at logical index `idx`, in ascending key order
    ///
    /// Fails (returns `None`) for an out-of-range index, an unreadable tree,
    /// or any traversal failure. A traversal failure additionally disables
    /// the view until the next [`refresh`](SortedMapView::refresh): the tree
    /// is garbage, and every further index would fail the same way.
    pub fn element_at(&mut self, idx: usize) -> Option<ValueId>
    {
        // Re-derive the ceiling from the freshest known count on every call;
        // a stale cached bound would defeat the corruption defense.
        let num_elements = self.count();
        if idx >= num_elements {
            return None;
        }
        if self.tree.is_none() || self.begin_node.is_none() {
            return None;
        }

        match self.key_value_pair(idx, num_elements) {
            Some(payload) => Some(payload),
            None => {
                debug!(index = idx, "tree traversal failed; disabling view until refresh");
                self.tree = None;
                None
            }
        }
    }

    /// Presentation name for the element at `idx`
    pub fn element_name(&self, idx: usize) -> String
    {
        format!("[{idx}]")
    }

    /// Inverse of [`element_name`](SortedMapView::element_name)
    ///
    /// Unknown names (anything but `"[<digits>]"`) fail.
    pub fn index_of_name(&self, name: &str) -> Option<usize>
    {
        name.strip_prefix('[')?.strip_suffix(']')?.parse().ok()
    }

    /// Reach the node at `idx` and resolve its payload
    ///
    /// Restarts from the cached snapshot at `idx - 1` when one exists,
    /// advancing a single step; otherwise walks `idx` steps from the leftmost
    /// node. The snapshot at `idx` is cached before returning either way.
    fn key_value_pair(&mut self, idx: usize, max_depth: usize) -> Option<ValueId>
    {
        let begin = NodeHandle::new(self.image, self.begin_node);
        let mut iterator = InorderIter::new(begin, max_depth);

        let need_to_skip = idx > 0;
        let mut actual_advance = idx;
        if need_to_skip {
            // An iterator already positioned at the previous index lets us
            // advance by 1 instead of re-walking from the start.
            if let Some(cached) = self.iterators.get(&(idx - 1)).copied() {
                iterator = InorderIter::from_snapshot(self.image, cached, max_depth);
                actual_advance = 1;
            }
        }

        let node = iterator.advance(actual_advance)?;

        if !self.resolve_payload_type() {
            return None;
        }

        let payload = if need_to_skip {
            // Index 0 carries the responsibility of bootstrapping the layout
            // memo; if we got here cold, resolve it by reading element 0
            // first.
            if self.skip_offset.is_none() {
                self.element_at(0);
            }
            let skip = self.skip_offset?;
            let payload_ty = self.payload_ty?;
            self.image.child_at_offset(node, skip, payload_ty).ok()?
        } else {
            let deref = self.image.dereference(node).ok()?;
            self.resolve_layout(deref);
            let skip = self.skip_offset?;
            let payload_ty = self.payload_ty?;
            self.image.child_at_offset(deref, skip, payload_ty).ok()?
        };

        self.iterators.insert(idx, iterator.snapshot());
        Some(payload)
    }

    /// Memoize the payload type from the backend's compiler type
    fn resolve_payload_type(&mut self) -> bool
    {
        if self.payload_ty.is_some() {
            return true;
        }
        let Ok(backend_ty) = self.image.type_of(self.backend) else {
            return false;
        };
        match self.layouts.payload_type(backend_ty) {
            Ok(payload_ty) => {
                self.payload_ty = Some(payload_ty);
                true
            }
            Err(_) => false,
        }
    }

    /// Memoize the payload byte offset from a representative node
    ///
    /// Failure leaves the memo unset; a later call with a valid node retries.
    fn resolve_layout(&mut self, node: ValueId)
    {
        if self.skip_offset.is_some() {
            return;
        }
        if self.image.is_error(node) {
            return;
        }
        let Some(payload_ty) = self.payload_ty else {
            return;
        };
        match self.layouts.node_layout(payload_ty) {
            Ok(layout) => self.skip_offset = Some(layout.payload_offset),
            Err(err) => trace!(%err, "node layout not resolvable yet"),
        }
    }
}
