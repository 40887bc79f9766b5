//! # Node Handle
//!
//! A thin, copyable descriptor for one node of the remote tree.
//!
//! A [`NodeHandle`] wraps an opaque value token and knows how to reach the
//! node's three link fields, which sit at fixed offsets from the node's
//! start: `left` at 0, `right` at one pointer width, `parent` at two pointer
//! widths. It owns nothing — the handle is a lookup descriptor whose lifetime
//! is bounded to one resolution call — and it is always safe to query: an
//! empty handle answers null/error instead of failing.
//!
//! Read failures from the accessor are absorbed *here*: a failed link read
//! yields an empty handle (which reports `is_error()`), never a propagated
//! `Err`. That keeps the traversal loops above this layer free of error
//! plumbing and makes the sticky-flag policy easy to audit.

use crate::image::MemoryImage;
use crate::types::ValueId;

/// Non-owning reference to one tree node in the remote image
///
/// Cheap to copy and compare. Equality compares the underlying value tokens
/// (reference identity), not node contents; to compare *which node* two
/// handles point at, use [`NodeHandle::identity_value`].
pub struct NodeHandle<'a, M: MemoryImage + ?Sized>
{
    image: &'a M,
    value: Option<ValueId>,
}

impl<'a, M: MemoryImage + ?Sized> NodeHandle<'a, M>
{
    /// Wrap an accessor value as a node handle
    pub fn new(image: &'a M, value: Option<ValueId>) -> Self
    {
        NodeHandle { image, value }
    }

    /// An empty handle: null, and in error
    pub fn empty(image: &'a M) -> Self
    {
        NodeHandle { image, value: None }
    }

    /// The underlying accessor value, if any
    pub fn entry(&self) -> Option<ValueId>
    {
        self.value
    }

    pub(crate) fn image(&self) -> &'a M
    {
        self.image
    }

    /// The node's left child
    pub fn left(&self) -> Self
    {
        self.link_at(0)
    }

    /// The node's right child
    pub fn right(&self) -> Self
    {
        self.link_at(self.image.pointer_width())
    }

    /// The node's parent
    pub fn parent(&self) -> Self
    {
        self.link_at(2 * self.image.pointer_width())
    }

    /// The raw unsigned value of this handle (the node's address), or `0`
    ///
    /// Used only to test cheaply whether two handles designate the same
    /// node; `0` doubles as the null marker.
    pub fn identity_value(&self) -> u64
    {
        match self.value {
            Some(value) => self.image.unsigned_value(value),
            None => 0,
        }
    }

    /// Whether this handle designates no node
    pub fn is_null(&self) -> bool
    {
        self.identity_value() == 0
    }

    /// Whether this handle is empty or its backing read failed
    pub fn is_error(&self) -> bool
    {
        match self.value {
            Some(value) => self.image.is_error(value),
            None => true,
        }
    }

    /// Read the link field at `offset`, typed as the node's own type
    ///
    /// An empty handle propagates itself; a failed read collapses to an
    /// empty handle.
    fn link_at(&self, offset: u64) -> Self
    {
        let Some(value) = self.value else {
            return *self;
        };
        let Ok(ty) = self.image.type_of(value) else {
            return Self::empty(self.image);
        };
        match self.image.child_at_offset(value, offset, ty) {
            Ok(link) => Self::new(self.image, Some(link)),
            Err(_) => Self::empty(self.image),
        }
    }
}

// Manual Clone/Copy: deriving would demand `M: Clone`/`M: Copy`, but only the
// reference and token are copied.
impl<M: MemoryImage + ?Sized> Clone for NodeHandle<'_, M>
{
    fn clone(&self) -> Self
    {
        *self
    }
}

impl<M: MemoryImage + ?Sized> Copy for NodeHandle<'_, M> {}

impl<M: MemoryImage + ?Sized> PartialEq for NodeHandle<'_, M>
{
    fn eq(&self, other: &Self) -> bool
    {
        self.value == other.value
    }
}

impl<M: MemoryImage + ?Sized> std::fmt::Debug for NodeHandle<'_, M>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("NodeHandle")
            .field("value", &self.value)
            .field("identity", &format_args!("0x{:x}", self.identity_value()))
            .finish()
    }
}
