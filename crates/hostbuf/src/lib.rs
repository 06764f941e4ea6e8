//! hostbuf: host-side buffers for heterogeneous task runtimes.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the hostbuf sub-crates. For most users, adding `hostbuf` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use hostbuf::prelude::*;
//!
//! // Borrow read-only host data; the first write switches to a private copy.
//! let input = [1, 2, 3, 4];
//! let buffer = Buffer::<i32, 1>::from_read_only(&input, 4).unwrap();
//!
//! // Ask for the final contents back in a shared vector.
//! let output = shared_host_data(vec![0; 4]);
//! buffer.set_final_data(output.clone());
//!
//! buffer
//!     .access(AccessMode::Write, AccessTarget::HostBuffer)
//!     .unwrap()
//!     .set(0, 99)
//!     .unwrap();
//! drop(buffer);
//!
//! assert_eq!(input, [1, 2, 3, 4]);
//! assert_eq!(*output.lock(), vec![99, 2, 3, 4]);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `hostbuf-core` | Ranges, access modes, IDs, errors, task seam |
//! | [`buffer`] | `hostbuf-buffer` | Buffers, builder, accessors, write-back, teardown |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`hostbuf-core`).
///
/// Contains [`types::Range`], [`types::AccessMode`], the scheduler seam
/// ([`types::TaskHandler`], [`types::TaskNode`]), and
/// [`types::BufferError`].
pub use hostbuf_core as types;

/// Buffers and their lifecycle (`hostbuf-buffer`).
///
/// [`buffer::Buffer`] and [`buffer::BufferBuilder`] for construction,
/// [`buffer::HostAccessor`] for host access, [`buffer::FinalData`] for
/// write-back, and [`buffer::BufferWaiter`] for scope-bound teardown.
pub use hostbuf_buffer as buffer;

/// Common imports for typical hostbuf usage.
///
/// ```rust
/// use hostbuf::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use hostbuf_core::{AccessMode, AccessTarget, Id, Range, TaskHandler, TaskNode, TaskRef};

    // Errors
    pub use hostbuf_buffer::ConfigError;
    pub use hostbuf_core::BufferError;

    // Buffers
    pub use hostbuf_buffer::{
        shared_host_data, Buffer, BufferBuilder, BufferConfig, BufferWaiter, DestructorFuture,
        FinalData, HostAccessor, Lifecycle, OwnershipMode, SharedHostData,
    };
}
