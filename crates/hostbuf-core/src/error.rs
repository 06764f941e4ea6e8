//! Error types for buffer construction and access.

use thiserror::Error;

use crate::access::AccessMode;

/// Errors from buffer construction, access-mode tracking, and host access.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BufferError {
    /// The supplied element count does not match the declared shape.
    #[error("invalid range: shape holds {expected} elements, data supplies {actual}")]
    InvalidRange {
        /// Element count implied by the shape.
        expected: usize,
        /// Element count actually supplied.
        actual: usize,
    },
    /// A runtime-owned allocation could not be made.
    ///
    /// Raised by Owned construction and by copy-on-write realization.
    /// In the latter case the buffer is left exactly as it was.
    #[error("out of memory: requested {requested} bytes{}", limit_suffix(.limit))]
    OutOfMemory {
        /// Bytes requested (saturated at `usize::MAX` on overflow).
        requested: usize,
        /// Configured allocation cap that was exceeded, if any.
        limit: Option<usize>,
    },
    /// Attempted to write caller-provided read-only storage in place.
    #[error("storage is read-only until a write-capable access realizes a private copy")]
    ReadOnlyStorage,
    /// A write was attempted through an accessor whose mode forbids it.
    #[error("accessor mode {mode} does not permit writes")]
    AccessDenied {
        /// The accessor's declared mode.
        mode: AccessMode,
    },
    /// An element index lies outside the buffer's range.
    #[error("index {index} outside range {range}")]
    IndexOutOfRange {
        /// The offending index, formatted.
        index: String,
        /// The buffer range, formatted.
        range: String,
    },
}

fn limit_suffix(limit: &Option<usize>) -> String {
    match limit {
        Some(l) => format!(" (limit {l} bytes)"),
        None => String::new(),
    }
}
