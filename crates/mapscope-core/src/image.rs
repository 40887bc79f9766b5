//! # Memory Image Collaborators
//!
//! The two interfaces mapscope consumes from the embedding debugger.
//!
//! mapscope never touches target memory directly. Every read goes through a
//! [`MemoryImage`] — the host debugger's view of the stopped process (or core
//! dump) — and every type/layout question goes through a [`LayoutResolver`]
//! backed by the host's compiler-type machinery. Both are blocking,
//! synchronous interfaces: a call either returns a value or an error, and any
//! timeout discipline against an unresponsive target belongs to the
//! implementation, not to the traversal engine.
//!
//! ## Why traits?
//!
//! Traits let the traversal engine run against a live process, a core dump,
//! or (as the test suite does) a byte-accurate in-memory fake, without
//! changing a line of tree-walking code.

use crate::error::MapscopeResult;
use crate::types::{Address, ByteOrder, NodeLayout, TypeRef, ValueId};

/// Member name of the tree object inside a libc++ `std::map`
pub const TREE_MEMBER: &str = "__tree_";

/// Member name of the cached leftmost-node pointer inside the tree
pub const BEGIN_NODE_MEMBER: &str = "__begin_node_";

/// Member name of the compressed pair holding the element count
pub const SIZE_PAIR_MEMBER: &str = "__pair3_";

/// Member name of the stored element in a post-2017 libc++ compressed pair
pub const COMPRESSED_PAIR_VALUE: &str = "__value_";

/// Member name of the first element in a legacy libc++ compressed pair
pub const COMPRESSED_PAIR_FIRST: &str = "__first_";

/// Member name of the inner tree iterator inside a `std::map` iterator
pub const ITER_INNER_MEMBER: &str = "__i_";

/// Expression path from a map iterator straight to its key/value pair
pub const ITER_PAIR_PATH: &str = ".__i_.__ptr_->__value_";

/// Expression path from a map iterator to its node pointer
///
/// Used by the raw-memory fallback when [`ITER_PAIR_PATH`] does not resolve.
pub const ITER_PTR_PATH: &str = ".__i_.__ptr_";

/// Typed view of a remote process's memory, owned by the host debugger
///
/// Values are represented by opaque [`ValueId`] tokens minted by the
/// implementation. Reads that fail (unmapped page, missing member, stale
/// handle) return an error; the traversal engine converts those errors into
/// sticky failure flags at the [`crate::node::NodeHandle`] boundary instead
/// of propagating them.
///
/// ## Blocking behavior
///
/// Every method may stall if the target is unresponsive. mapscope imposes no
/// timeout of its own; implementations that talk to live targets should.
pub trait MemoryImage
{
    /// Resolve a named member of `value`
    ///
    /// ## Errors
    ///
    /// - `FieldNotFound`: the member does not exist on the value's type
    /// - `InvalidHandle`: `value` is stale or unknown
    fn child_by_name(&self, value: ValueId, name: &str) -> MapscopeResult<ValueId>;

    /// Resolve the `index`-th member of an aggregate `value`
    ///
    /// ## Errors
    ///
    /// - `InvalidArgument`: the index is past the last member
    /// - `InvalidHandle`: `value` is stale or unknown
    fn child_at_index(&self, value: ValueId, index: usize) -> MapscopeResult<ValueId>;

    /// Materialize a child of `value` at a raw byte offset, typed as `ty`
    ///
    /// For pointer-typed values this reads *through* the pointer: the child
    /// is located at `pointee + offset`. That read-through is what lets a
    /// node-pointer handle reach the pointed-to node's link fields without an
    /// explicit dereference per step.
    ///
    /// ## Errors
    ///
    /// - `UnreadableMemory`: the pointer word itself could not be read
    /// - `InvalidHandle`: `value` is stale or unknown
    fn child_at_offset(&self, value: ValueId, offset: u64, ty: TypeRef) -> MapscopeResult<ValueId>;

    /// Resolve a symbolic expression path rooted at `value`
    ///
    /// The path uses the host's expression syntax (e.g.
    /// [`ITER_PAIR_PATH`]). Implementations must *not* route the path through
    /// synthetic children: the single-entry resolver uses this to reach the
    /// raw members underneath its own produced view, and a synthetic
    /// traversal would cycle straight back into it.
    ///
    /// ## Errors
    ///
    /// - `PathNotResolved`: the path (or the debug info it needs) is missing
    fn value_at_path(&self, value: ValueId, path: &str) -> MapscopeResult<ValueId>;

    /// Dereference a pointer-typed value
    ///
    /// ## Errors
    ///
    /// - `InvalidArgument`: `value` is not a pointer
    /// - `UnreadableMemory`: the pointer is null or dangling
    fn dereference(&self, value: ValueId) -> MapscopeResult<ValueId>;

    /// The unsigned scalar interpretation of `value`, or `0`
    ///
    /// Infallible by design: unreadable or non-scalar values read as `0`.
    /// Callers that need to distinguish a genuine zero from a failed read
    /// pair this with [`MemoryImage::is_error`].
    fn unsigned_value(&self, value: ValueId) -> u64;

    /// Whether the last read backing `value` failed
    fn is_error(&self, value: ValueId) -> bool;

    /// The compiler-level type of `value`
    ///
    /// ## Errors
    ///
    /// - `UnknownType`: the host has no type for this value
    fn type_of(&self, value: ValueId) -> MapscopeResult<TypeRef>;

    /// Read `len` raw bytes at `addr` in the target
    ///
    /// ## Errors
    ///
    /// - `UnreadableMemory`: any byte in the range is unmapped
    fn read_raw(&self, addr: Address, len: usize) -> MapscopeResult<Vec<u8>>;

    /// Materialize a fresh value from host-side bytes, typed as `ty`
    ///
    /// Used by the single-entry resolver's fallback path to reinterpret a raw
    /// node block it has already read. The resulting value lives in the
    /// host's memory, not the target's.
    fn value_from_bytes(&self, name: &str, bytes: &[u8], ty: TypeRef) -> MapscopeResult<ValueId>;

    /// Byte order of the target process
    fn byte_order(&self) -> ByteOrder;

    /// Size in bytes of a pointer in the target process
    ///
    /// Node link fields (left/right/parent) are laid out at multiples of this
    /// width from the start of a node.
    fn pointer_width(&self) -> u64;
}

/// Compiler-level layout resolution, owned by the host's type system
///
/// Kept separate from [`MemoryImage`] because it answers questions about
/// *types*, not about one process's bytes: the same resolver can serve every
/// container instance of the same template instantiation.
pub trait LayoutResolver
{
    /// The key/value payload type stored by a container or iterator type
    ///
    /// `container_ty` is the type of the `std::map` variable itself, or of
    /// the inner tree iterator for the single-entry resolver.
    ///
    /// ## Errors
    ///
    /// - `LayoutUnresolved`: the template arguments could not be recovered
    fn payload_type(&self, container_ty: TypeRef) -> MapscopeResult<TypeRef>;

    /// Synthesize the node layout `{ptr, ptr, ptr, bool, payload}` and locate
    /// the payload within it
    ///
    /// The returned [`NodeLayout`] carries the payload's byte offset (which
    /// depends on the payload type's alignment) and the node's total size
    /// (which bounds the raw read in the single-entry fallback).
    ///
    /// ## Errors
    ///
    /// - `LayoutUnresolved`: the payload type is incomplete or unsized
    fn node_layout(&self, payload_ty: TypeRef) -> MapscopeResult<NodeLayout>;
}

/// Read the first element of a libc++ compressed pair
///
/// libc++ changed the compressed-pair representation over time: newer
/// revisions store the element behind an `__value_` member of the first
/// base, older ones expose it directly as `__first_`. Try the modern shape
/// first and fall back to the legacy member.
pub fn compressed_pair_first<M>(image: &M, pair: ValueId) -> MapscopeResult<ValueId>
where
    M: MemoryImage + ?Sized,
{
    if let Ok(first) = image.child_at_index(pair, 0) {
        if let Ok(value) = image.child_by_name(first, COMPRESSED_PAIR_VALUE) {
            return Ok(value);
        }
    }
    image.child_by_name(pair, COMPRESSED_PAIR_FIRST)
}
