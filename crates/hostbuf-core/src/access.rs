//! Access modes and targets an accessor declares when it binds to a buffer.

use std::fmt;

/// How an accessor intends to use buffer data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Read only.
    Read,
    /// Write only; previous contents are preserved.
    Write,
    /// Read and write.
    ReadWrite,
    /// Write only; previous contents may be discarded.
    DiscardWrite,
    /// Read and write; previous contents may be discarded.
    DiscardReadWrite,
    /// Atomic read-modify-write.
    Atomic,
}

impl AccessMode {
    /// All access modes, in declaration order.
    pub const ALL: [AccessMode; 6] = [
        Self::Read,
        Self::Write,
        Self::ReadWrite,
        Self::DiscardWrite,
        Self::DiscardReadWrite,
        Self::Atomic,
    ];

    /// Whether an accessor in this mode may modify buffer contents.
    pub fn is_write_capable(self) -> bool {
        !matches!(self, Self::Read)
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::ReadWrite => "read_write",
            Self::DiscardWrite => "discard_write",
            Self::DiscardReadWrite => "discard_read_write",
            Self::Atomic => "atomic",
        };
        f.write_str(s)
    }
}

/// The memory space an accessor binds to.
///
/// The buffer core records nothing about the target; it is carried for
/// diagnostics and for collaborators that dispatch on it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AccessTarget {
    /// Device global memory.
    GlobalBuffer,
    /// Device constant memory.
    ConstantBuffer,
    /// Work-group local memory.
    Local,
    /// Host memory, accessed from the calling thread.
    #[default]
    HostBuffer,
}

impl fmt::Display for AccessTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::GlobalBuffer => "global_buffer",
            Self::ConstantBuffer => "constant_buffer",
            Self::Local => "local",
            Self::HostBuffer => "host_buffer",
        };
        f.write_str(s)
    }
}
