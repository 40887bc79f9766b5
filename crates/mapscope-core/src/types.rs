//! # Types
//!
//! Accessor-agnostic types used throughout mapscope.
//!
//! These types abstract away the embedding debugger's own value and type
//! machinery, allowing the traversal engine to work with opaque tokens
//! without knowing how the host represents values, types, or addresses.

use std::fmt;
use std::ops::{Add, Sub};

/// Strongly typed memory address in the target process
///
/// This wrapper around `u64` provides type safety when working with remote
/// addresses. It prevents accidentally mixing addresses with other `u64`
/// values (like sizes, counts, or raw pointer words read out of a node).
///
/// ## Example
///
/// ```rust
/// use mapscope_core::types::Address;
///
/// let addr = Address::from(0x1000);
/// let next_addr = addr + 0x100; // Add offset
/// assert_eq!(next_addr.value(), 0x1100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u64);

impl Address
{
    /// The null address (0x0)
    ///
    /// A null node reference reads as this address; it is never a valid
    /// target for a remote read.
    pub const ZERO: Self = Address(0);

    /// Create a new address from a `u64` value
    ///
    /// This is equivalent to `Address::from(value)` but can be used in const
    /// contexts.
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Add an offset to this address, checking for overflow
    ///
    /// Returns `Some(new_address)` if the addition doesn't overflow, or
    /// `None` if it does. Overflow while computing a field address is treated
    /// as conclusive evidence of a corrupt pointer.
    pub fn checked_add(self, offset: u64) -> Option<Self>
    {
        self.0.checked_add(offset).map(Address)
    }

    /// Add an offset to this address, saturating at the maximum value
    pub fn saturating_add(self, offset: u64) -> Self
    {
        Address(self.0.saturating_add(offset))
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:016x}", self.0)
    }
}

impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_add(rhs))
    }
}

impl Sub<u64> for Address
{
    type Output = Address;

    fn sub(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_sub(rhs))
    }
}

/// Byte order of the target process
///
/// Needed by accessor implementations to reassemble multi-byte values read
/// with [`crate::image::MemoryImage::read_raw`]. The traversal engine itself
/// never decodes bytes; it always goes through typed reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder
{
    /// Least significant byte first (x86-64, typical ARM64)
    Little,
    /// Most significant byte first
    Big,
}

/// Opaque handle to one value materialized by the memory image accessor
///
/// A `ValueId` is a token minted by a [`crate::image::MemoryImage`]
/// implementation; only that implementation can interpret it. mapscope moves
/// these tokens around, compares them, and hands them back to the accessor —
/// it never looks inside.
///
/// ## Ownership
///
/// A `ValueId` does not own anything. It is a lookup descriptor valid only
/// against the image that produced it, and only until that image is refreshed
/// (e.g. the target process runs again). Holding one longer than a single
/// resolution call is the caller's risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueId(pub u64);

/// Opaque token for a compiler-level type known to the host's type system
///
/// Produced and consumed by the [`crate::image::LayoutResolver`] and
/// [`crate::image::MemoryImage`] collaborators. Like [`ValueId`], mapscope
/// only transports these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeRef(pub u64);

/// Resolved byte layout of one tree node
///
/// Describes where the key/value payload sits inside a node's memory block.
/// The block itself is laid out as three pointers, a color flag, then the
/// payload:
///
/// ```text
/// +-------------------+
/// | pointer  left     |
/// | pointer  right    |
/// | pointer  parent   |
/// | bool     color    |
/// | payload  key/value|  <- starts at `payload_offset`
/// +-------------------+
/// ```
///
/// Computing this requires the host's type system (alignment of the payload
/// type decides the padding before it), so it comes from the
/// [`crate::image::LayoutResolver`] and is memoized by the container view —
/// it is treated as expensive to obtain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeLayout
{
    /// Byte offset of the key/value payload from the start of the node
    pub payload_offset: u64,
    /// Total byte size of the node block, payload included
    pub byte_size: u64,
}
