//! # Error Types
//!
//! General error handling for mapscope.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! Errors here describe why a single accessor operation failed. They are
//! deliberately boundary errors: per the propagation policy of this crate,
//! the tree-walking components catch them at the [`crate::node::NodeHandle`]
//! boundary and convert them into sticky error flags, so a caller of the
//! high-level views only ever sees "no value", never an `Err` bubbling out of
//! a traversal.

use thiserror::Error;

use crate::types::Address;

/// Main error type for mapscope operations
///
/// This enum represents all the ways a remote-memory access or layout
/// resolution can fail.
///
/// ## Error Categories
///
/// 1. **Handle errors**: InvalidHandle
/// 2. **Read errors**: FieldNotFound, UnreadableMemory, PathNotResolved
/// 3. **Type errors**: UnknownType, LayoutUnresolved
/// 4. **Usage errors**: InvalidArgument
/// 5. **I/O errors**: Io (for accessor implementations backed by files,
///    sockets, core dumps, etc.)
#[derive(Error, Debug)]
pub enum MapscopeError
{
    /// A value handle is stale or was never minted by this image
    ///
    /// Value handles are only valid against the accessor that produced them,
    /// and only for as long as the backing image is unchanged. Using a handle
    /// from a previous process stop typically produces this error.
    #[error("Stale or unknown value handle")]
    InvalidHandle,

    /// The requested member does not exist on the value's type
    ///
    /// This happens when the target was built against a container layout this
    /// crate does not recognize (for example a standard library revision with
    /// renamed internals).
    #[error("No field named `{name}`")]
    FieldNotFound
    {
        /// The member name that failed to resolve
        name: String,
    },

    /// The backing memory for a value could not be read
    ///
    /// The address is the start of the failed read. With a live process this
    /// usually means the pointer was dangling or the page is not mapped.
    #[error("Unreadable memory at {address}")]
    UnreadableMemory
    {
        /// Start address of the failed read
        address: Address,
    },

    /// A symbolic expression path did not resolve
    ///
    /// Typically the debug information needed to walk the path is missing,
    /// which is why the single-entry resolver keeps a raw-memory fallback.
    #[error("Expression path `{0}` did not resolve")]
    PathNotResolved(String),

    /// A value has no resolvable compiler-level type
    #[error("Value has no resolvable type")]
    UnknownType,

    /// The payload type or its byte offset within a node could not be derived
    ///
    /// Layout resolution is retried lazily on a later call with a fresh
    /// candidate node; see the container view for the retry policy.
    #[error("Could not resolve element layout: {0}")]
    LayoutUnresolved(String),

    /// Invalid argument passed to an accessor operation
    ///
    /// Examples:
    /// - A child index past the end of an aggregate
    /// - Dereferencing a non-pointer value
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error (for file operations, etc.)
    ///
    /// Used by accessor implementations that read from core dumps or remote
    /// connections. This is a standard Rust `std::io::Error` converted to our
    /// error type.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, MapscopeError>`
///
/// ```rust
/// use mapscope_core::error::MapscopeResult;
/// fn foo() -> MapscopeResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type MapscopeResult<T> = std::result::Result<T, MapscopeError>;
