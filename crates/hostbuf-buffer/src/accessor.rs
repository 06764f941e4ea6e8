//! Host-side accessor: a typed window on a buffer's storage.

use hostbuf_core::{AccessMode, AccessTarget, BufferError, Id};

use crate::buffer::Buffer;

/// Host access to a buffer with a declared [`AccessMode`].
///
/// Constructing the accessor tracks its mode on the buffer, so a
/// write-capable accessor always sees writable storage.
#[derive(Debug)]
pub struct HostAccessor<'b, 'a, T, const D: usize> {
    buffer: &'b Buffer<'a, T, D>,
    mode: AccessMode,
    target: AccessTarget,
}

impl<'b, 'a, T: Clone, const D: usize> HostAccessor<'b, 'a, T, D> {
    /// Track `mode` on `buffer` and open an accessor on it.
    pub fn new(
        buffer: &'b Buffer<'a, T, D>,
        mode: AccessMode,
        target: AccessTarget,
    ) -> Result<Self, BufferError> {
        buffer.track_access_mode(mode, target)?;
        Ok(Self {
            buffer,
            mode,
            target,
        })
    }

    /// The declared access mode.
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// The declared access target.
    pub fn target(&self) -> AccessTarget {
        self.target
    }

    /// The buffer this accessor reads and writes.
    pub fn buffer(&self) -> &'b Buffer<'a, T, D> {
        self.buffer
    }

    /// Run `f` over the elements in row-major order.
    ///
    /// `f` runs under the buffer's storage lock. It may query or
    /// configure the buffer (`is_modified`, `set_final_data`, ...), but
    /// reading or writing the same buffer's elements from inside `f`
    /// deadlocks.
    pub fn read<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        self.buffer.read_storage(f)
    }

    /// Run `f` over the elements mutably. Fails for read-only accessors.
    ///
    /// Same locking as [`read`](Self::read).
    pub fn write<R>(&self, f: impl FnOnce(&mut [T]) -> R) -> Result<R, BufferError> {
        self.check_writable()?;
        self.buffer.write_storage(f)
    }

    /// Element at `id`.
    pub fn get(&self, id: impl Into<Id<D>>) -> Result<T, BufferError> {
        let index = self.index(id.into())?;
        Ok(self.read(|s| s[index].clone()))
    }

    /// Store `value` at `id`. Fails for read-only accessors.
    pub fn set(&self, id: impl Into<Id<D>>, value: T) -> Result<(), BufferError> {
        self.check_writable()?;
        let index = self.index(id.into())?;
        self.buffer.write_storage(|s| s[index] = value)
    }

    fn check_writable(&self) -> Result<(), BufferError> {
        if self.mode.is_write_capable() {
            Ok(())
        } else {
            Err(BufferError::AccessDenied { mode: self.mode })
        }
    }

    fn index(&self, id: Id<D>) -> Result<usize, BufferError> {
        let range = self.buffer.range();
        range
            .linear_index(id)
            .ok_or_else(|| BufferError::IndexOutOfRange {
                index: id.to_string(),
                range: range.to_string(),
            })
    }
}
