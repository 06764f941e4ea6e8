//! A buffer holder whose drop blocks until teardown has completed.

use std::ops::Deref;

use crate::buffer::Buffer;

/// Scope-bound buffer handle that synchronizes with teardown on drop.
///
/// Dropping a `BufferWaiter` asks its buffer for a destructor future,
/// releases its own holder, and then waits. When other holders (running
/// tasks) are still alive, the drop returns only after the last one has
/// gone and the write-back has landed. When nothing needs waiting for,
/// or this is the last holder, the drop tears down inline.
#[derive(Debug)]
pub struct BufferWaiter<'a, T, const D: usize> {
    buffer: Buffer<'a, T, D>,
    wait_on_drop: bool,
}

impl<'a, T, const D: usize> BufferWaiter<'a, T, D> {
    /// Wrap `buffer`.
    pub fn new(buffer: Buffer<'a, T, D>) -> Self {
        Self {
            buffer,
            wait_on_drop: true,
        }
    }

    /// Give the holder back without waiting.
    pub fn into_inner(mut self) -> Buffer<'a, T, D> {
        self.wait_on_drop = false;
        self.buffer.clone()
    }
}

impl<'a, T, const D: usize> From<Buffer<'a, T, D>> for BufferWaiter<'a, T, D> {
    fn from(buffer: Buffer<'a, T, D>) -> Self {
        Self::new(buffer)
    }
}

impl<'a, T, const D: usize> Deref for BufferWaiter<'a, T, D> {
    type Target = Buffer<'a, T, D>;

    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}

impl<T, const D: usize> Drop for BufferWaiter<'_, T, D> {
    fn drop(&mut self) {
        let future = if self.wait_on_drop {
            self.buffer.get_destructor_future()
        } else {
            None
        };
        // The holder must be gone before waiting, or teardown never starts.
        self.buffer.release_holder();
        if let Some(future) = future {
            tracing::debug!(buffer = %self.buffer.id(), "waiting for teardown");
            future.wait();
        }
    }
}
