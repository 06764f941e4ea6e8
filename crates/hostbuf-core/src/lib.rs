//! Core types and traits for hostbuf buffers.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the buffer core and its collaborators:
//! shape descriptors, access modes, identifiers, the scheduler seam,
//! and error types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod access;
pub mod error;
pub mod id;
pub mod range;
pub mod task;

pub use access::{AccessMode, AccessTarget};
pub use error::BufferError;
pub use id::{BufferId, TaskId};
pub use range::{Id, Range};
pub use task::{Retained, TaskHandler, TaskNode, TaskRef};
