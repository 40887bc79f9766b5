//! # Single-Entry Resolver
//!
//! Resolves the one key/value pair behind a `std::map` iterator variable and
//! exposes it as two named children, `first` and `second`.
//!
//! Two resolution strategies, tried in order:
//!
//! 1. a direct symbolic path through the accessor to the referenced pair,
//!    explicitly bypassing synthetic children (the produced view's own child
//!    graph routes back through this resolver — following it would cycle);
//! 2. when the path does not resolve (typically the debug info it needs is
//!    missing), read the iterator's node pointer, pull one raw byte block of
//!    the node from target memory, and reinterpret its tail as the payload
//!    type.
//!
//! The intermediate pair reference from strategy 1 is deliberately kept as a
//! short-lived, non-owning token distinct from any long-lived consumer-facing
//! value: extending its lifetime would pin the consumer's object graph into
//! the cycle described above.

use tracing::debug;

use crate::image::{LayoutResolver, MemoryImage, ITER_INNER_MEMBER, ITER_PAIR_PATH, ITER_PTR_PATH};
use crate::types::{Address, ValueId};

/// Sentinel for "no such address" used by debugger hosts
const INVALID_ADDRESS: u64 = u64::MAX;

/// View over the single element referenced by one map iterator
pub struct IterEntryView<'a, M, L>
where
    M: MemoryImage + ?Sized,
    L: LayoutResolver + ?Sized,
{
    image: &'a M,
    layouts: &'a L,
    /// The iterator variable itself
    backend: ValueId,
    /// Pair reached through the symbolic path; non-owning, never to be
    /// stored beyond this view's generation
    pair_direct: Option<ValueId>,
    /// Pair rebuilt host-side from a raw node read
    pair_materialized: Option<ValueId>,
}

impl<'a, M, L> IterEntryView<'a, M, L>
where
    M: MemoryImage + ?Sized,
    L: LayoutResolver + ?Sized,
{
    /// Create a view over `backend`, a `std::map` iterator variable
    ///
    /// Performs an initial [`refresh`](IterEntryView::refresh).
    pub fn new(image: &'a M, layouts: &'a L, backend: ValueId) -> Self
    {
        let mut view = IterEntryView {
            image,
            layouts,
            backend,
            pair_direct: None,
            pair_materialized: None,
        };
        view.refresh();
        view
    }

    /// Re-resolve the referenced pair from the backing variable
    ///
    /// Drops both cached references first. Structurally infallible; if
    /// neither strategy resolves, the view simply exposes no children until
    /// the next refresh.
    pub fn refresh(&mut self)
    {
        self.pair_direct = None;
        self.pair_materialized = None;

        if let Ok(pair) = self.image.value_at_path(self.backend, ITER_PAIR_PATH) {
            self.pair_direct = Some(pair);
            return;
        }
        debug!("symbolic iterator path unavailable; falling back to raw node read");
        self.pair_materialized = self.materialize_from_node();
    }

    /// Number of children this view exposes: always `first` and `second`
    pub fn child_count(&self) -> usize
    {
        2
    }

    /// The child at `idx`: 0 is the key, 1 is the mapped value
    pub fn child_at(&self, idx: usize) -> Option<ValueId>
    {
        let pair = self.pair_direct.or(self.pair_materialized)?;
        self.image.child_at_index(pair, idx).ok()
    }

    /// Name-to-index lookup: `"first"` is 0, `"second"` is 1
    ///
    /// Unknown names fail.
    pub fn index_of_name(&self, name: &str) -> Option<usize>
    {
        match name {
            "first" => Some(0),
            "second" => Some(1),
            _ => None,
        }
    }

    /// Fallback: read the node block behind the iterator's pointer and
    /// reinterpret its payload tail
    ///
    /// Requires a successful layout match for the synthesized
    /// `{ptr, ptr, ptr, bool, payload}` node struct; a mismatch or failed
    /// memory read resolves to `None` for this generation.
    fn materialize_from_node(&self) -> Option<ValueId>
    {
        let node_ptr = self.image.value_at_path(self.backend, ITER_PTR_PATH).ok()?;
        let inner = self.image.child_by_name(self.backend, ITER_INNER_MEMBER).ok()?;
        let inner_ty = self.image.type_of(inner).ok()?;
        let payload_ty = self.layouts.payload_type(inner_ty).ok()?;

        let addr = self.image.unsigned_value(node_ptr);
        if addr == 0 || addr == INVALID_ADDRESS {
            return None;
        }

        let layout = self.layouts.node_layout(payload_ty).ok()?;
        let block = self
            .image
            .read_raw(Address::from(addr), usize::try_from(layout.byte_size).ok()?)
            .ok()?;
        let payload_offset = usize::try_from(layout.payload_offset).ok()?;
        if payload_offset >= block.len() {
            return None;
        }

        self.image
            .value_from_bytes("pair", &block[payload_offset..], payload_ty)
            .ok()
    }
}
