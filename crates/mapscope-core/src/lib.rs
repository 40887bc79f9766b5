//! # mapscope-core
//!
//! Reconstruction of balanced-tree containers (libc++-style `std::map`) from
//! the memory image of another, already-running process, for debugger
//! variable views.
//!
//! The target memory is never trusted: it may be partially uninitialized,
//! mid-mutation, or outright corrupted. This crate guarantees only that every
//! lookup terminates and reports failure instead of looping or crashing —
//! it never validates tree balance or promises correct results on garbage
//! input.
//!
//! ## Components
//!
//! - [`NodeHandle`]: copyable, non-owning descriptor for one remote tree node
//! - [`InorderIter`]: bounded in-order successor traversal with a sticky
//!   error flag
//! - [`SortedMapView`]: index-to-payload resolution with an iterator-snapshot
//!   cache for cheap sequential access
//! - [`IterEntryView`]: the single pair behind a map iterator, with a
//!   raw-memory fallback when symbolic traversal is unavailable
//!
//! ## Collaborators
//!
//! Remote reads and compiler-type questions are delegated to the embedding
//! debugger through the [`MemoryImage`] and [`LayoutResolver`] traits; this
//! crate contains no platform code and forbids `unsafe`.
//!
//! ## Concurrency
//!
//! Single-threaded, synchronous, call-and-return. One view serves one
//! inspection session; there is no shared mutable state and nothing to
//! cancel — a consumer that loses interest simply stops calling.

pub mod entry;
pub mod error;
pub mod image;
pub mod iter;
pub mod node;
pub mod types;
pub mod view;

// Re-export commonly used types
pub use entry::IterEntryView;
pub use error::{MapscopeError, MapscopeResult};
pub use image::{LayoutResolver, MemoryImage};
pub use iter::{InorderIter, IterSnapshot};
pub use node::NodeHandle;
pub use types::{Address, ByteOrder, NodeLayout, TypeRef, ValueId};
pub use view::SortedMapView;
