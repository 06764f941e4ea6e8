//! The buffer core: holder handles, access tracking, and teardown.
//!
//! A [`Buffer`] is one holder of a shared buffer core. Cloning a buffer
//! adds a holder; dropping one removes it. The holder count is explicit
//! (an `AtomicUsize` in the core) and is the only thing lifetime
//! decisions look at. When it reaches zero the dropping thread runs the
//! destruction sequence:
//!
//! ```text
//! Live ──holders == 0──▶ Finalizing ──write-back, release──▶ Destroyed
//!                                                  └─ resolve destructor futures
//! ```
//!
//! Elements sit behind their own lock, separate from the bookkeeping
//! state. Accessor closures hold only the storage lock, so they may
//! query or configure the buffer but not touch its elements again.
//! Where both locks are taken, storage is locked first.

use std::fmt;
use std::mem;
use std::sync::atomic::{self, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use hostbuf_core::{
    AccessMode, AccessTarget, BufferError, BufferId, Range, TaskHandler, TaskRef,
};

use crate::accessor::HostAccessor;
use crate::config::BufferConfig;
use crate::destructor::{self, DestructorFuture, DestructorPromise};
use crate::final_data::{FinalData, WriteBack, WriteBackOutcome};
use crate::stats::{BufferStats, Lifecycle};
use crate::storage::{self, OwnershipMode, Storage};

/// Holder count at or below which only the caller itself holds the
/// buffer. A destructor future issued then could only be resolved by
/// the thread that would be waiting on it.
pub const SELF_HOLDER_THRESHOLD: usize = 1;

/// A logical `D`-dimensional array of `T` with an ownership policy and
/// mutation tracking.
///
/// `'a` is the lifetime of any caller memory the buffer borrows
/// (aliased host slices, borrowed write-back destinations). Buffers that
/// borrow nothing can be `'static`.
///
/// Each `Buffer` value is one holder. Clones share the same storage.
pub struct Buffer<'a, T, const D: usize> {
    core: Arc<BufferCore<'a, T, D>>,
    /// Cleared once this handle's holder has been given back.
    held: bool,
}

struct BufferCore<'a, T, const D: usize> {
    id: BufferId,
    range: Range<D>,
    config: BufferConfig,
    holders: AtomicUsize,
    stats: Arc<BufferStats>,
    storage: Mutex<Storage<'a, T>>,
    state: Mutex<BufferState<'a, T>>,
}

struct BufferState<'a, T> {
    /// Mirrors the storage variant; updated under both locks.
    mode: OwnershipMode,
    /// Monotonic: never reset once set.
    modified: bool,
    write_back: Option<WriteBack<'a, T>>,
    destructors: Vec<DestructorPromise>,
    latest_producer: Option<TaskRef>,
}

// Compile-time assertion: Buffer must be Send + Sync for Send + Sync elements.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Buffer<'static, f32, 1>>();
    assert::<Buffer<'static, u8, 3>>();
};

impl<'a, T, const D: usize> Buffer<'a, T, D> {
    pub(crate) fn from_storage(
        range: Range<D>,
        storage: Storage<'a, T>,
        config: BufferConfig,
        stats: Arc<BufferStats>,
    ) -> Self {
        let id = BufferId::next();
        let mode = storage.mode();
        tracing::debug!(
            buffer = %id,
            %mode,
            range = %range,
            elements = range.count(),
            "buffer created"
        );
        Self {
            core: Arc::new(BufferCore {
                id,
                range,
                config,
                holders: AtomicUsize::new(1),
                stats,
                storage: Mutex::new(storage),
                state: Mutex::new(BufferState {
                    mode,
                    modified: false,
                    write_back: None,
                    destructors: Vec::new(),
                    latest_producer: None,
                }),
            }),
            held: true,
        }
    }

    /// Unique identifier, for diagnostics.
    pub fn id(&self) -> BufferId {
        self.core.id
    }

    /// Per-dimension extents, fixed at construction.
    pub fn range(&self) -> Range<D> {
        self.core.range
    }

    /// Total number of elements.
    pub fn count(&self) -> usize {
        self.core.range.count()
    }

    /// Size of the element storage in bytes.
    pub fn byte_size(&self) -> usize {
        self.count().saturating_mul(mem::size_of::<T>())
    }

    /// The configuration this buffer was built with.
    pub fn config(&self) -> &BufferConfig {
        &self.core.config
    }

    /// Number of live holders, including this one.
    pub fn holder_count(&self) -> usize {
        self.core.holders.load(Ordering::Acquire)
    }

    /// Counters shared with the buffer. Stays readable after teardown.
    pub fn stats(&self) -> Arc<BufferStats> {
        Arc::clone(&self.core.stats)
    }

    /// Whether any write-capable access has been declared.
    pub fn is_modified(&self) -> bool {
        self.core.state.lock().modified
    }

    /// The current ownership policy.
    pub fn ownership_mode(&self) -> OwnershipMode {
        self.core.state.lock().mode
    }

    /// Whether the next write-capable access will copy the storage first.
    pub fn copy_if_modified(&self) -> bool {
        self.core.state.lock().mode.copy_if_modified()
    }

    /// Whether storage currently aliases caller-provided host memory.
    pub fn is_data_host(&self) -> bool {
        self.core.state.lock().mode.is_data_host()
    }

    /// Whether a write-back destination is configured.
    pub fn has_write_back(&self) -> bool {
        self.core.state.lock().write_back.is_some()
    }

    /// Consider the buffer modified, as a write-capable accessor would,
    /// without realizing copy-on-write storage.
    pub fn mark_as_written(&self) {
        self.core.state.lock().modified = true;
    }

    /// Record an accessor's intended access.
    ///
    /// Read access changes nothing. Write-capable access sets the
    /// modified flag and, if the storage is caller read-only memory,
    /// first replaces it with a private owned copy of identical shape.
    ///
    /// Realization happens at most once and is all-or-nothing: on
    /// `OutOfMemory` the buffer is exactly as before, modified flag
    /// included. Tracking runs under the storage lock, so concurrent
    /// accessor construction cannot realize twice.
    pub fn track_access_mode(
        &self,
        mode: AccessMode,
        target: AccessTarget,
    ) -> Result<(), BufferError>
    where
        T: Clone,
    {
        if !mode.is_write_capable() {
            return Ok(());
        }
        let mut elements = self.core.storage.lock();
        let read_only = match &*elements {
            Storage::HostReadOnly(src) => Some(*src),
            _ => None,
        };
        if let Some(src) = read_only {
            let copy = storage::allocate_copy(src, &self.core.config, &self.core.stats)?;
            *elements = Storage::Owned(copy);
            self.core.stats.record_cow_realization();
            tracing::debug!(
                buffer = %self.core.id,
                %mode,
                %target,
                elements = src.len(),
                "realized copy-on-write storage"
            );
        }
        let mut state = self.core.state.lock();
        state.mode = elements.mode();
        state.modified = true;
        Ok(())
    }

    /// Construct a host accessor. Its construction tracks `mode`.
    pub fn access(
        &self,
        mode: AccessMode,
        target: AccessTarget,
    ) -> Result<HostAccessor<'_, 'a, T, D>, BufferError>
    where
        T: Clone,
    {
        HostAccessor::new(self, mode, target)
    }

    /// Copy of the current contents in storage order.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.read_storage(|s| s.to_vec())
    }

    /// Configure where modified contents go at teardown.
    ///
    /// Replaces any previous configuration; the last one wins.
    /// [`FinalData::None`] disables write-back.
    pub fn set_final_data(&self, target: impl Into<FinalData<'a, T>>)
    where
        T: Clone + Send + 'a,
    {
        let write_back = WriteBack::new(target.into());
        tracing::debug!(
            buffer = %self.core.id,
            destination = write_back.as_ref().map_or("none", |wb| wb.kind()),
            "write-back configured"
        );
        self.core.state.lock().write_back = write_back;
    }

    /// Disable write-back.
    pub fn clear_final_data(&self) {
        self.core.state.lock().write_back = None;
    }

    /// Register this buffer as a dependency of the task `handler` is
    /// building.
    ///
    /// Orders the task after the buffer's latest unfinished producer and
    /// gives the handler a holder to retain until the task completes. A
    /// writing task becomes the new producer and marks the buffer
    /// modified; the host view is not realized, since the task does not
    /// write through it.
    pub fn add_to_task<H>(&self, handler: &mut H, is_write_mode: bool) -> TaskRef
    where
        H: TaskHandler<'a> + ?Sized,
        T: Send + Sync + 'a,
    {
        let task = handler.task();
        let producer = {
            let mut state = self.core.state.lock();
            let previous = state.latest_producer.clone();
            if is_write_mode {
                state.latest_producer = Some(Arc::clone(&task));
                state.modified = true;
            }
            previous
        };
        if let Some(producer) = producer {
            if producer.id() != task.id() && !producer.is_complete() {
                handler.add_prerequisite(&task, &producer);
            }
        }
        tracing::trace!(
            buffer = %self.core.id,
            task = %task.id(),
            is_write_mode,
            "registered with task"
        );
        handler.retain(&task, Box::new(self.clone()));
        task
    }

    /// Decide whether the caller must wait for teardown, and if so
    /// return the token to wait on.
    ///
    /// Returns `None` when this is the only holder (waiting would
    /// self-deadlock), when the buffer was never modified, or when there
    /// is nothing to write back and no host memory is aliased.
    /// Otherwise the returned future resolves as the last step of the
    /// destruction sequence. Every issued future stays pending until
    /// then, however many holders asked.
    pub fn get_destructor_future(&self) -> Option<DestructorFuture> {
        let mut state = self.core.state.lock();
        let holders = self.core.holders.load(Ordering::Acquire);
        let other_holders = holders > SELF_HOLDER_THRESHOLD;
        let has_output = state.write_back.is_some() || state.mode.is_data_host();
        if !(other_holders && state.modified && has_output) {
            tracing::trace!(
                buffer = %self.core.id,
                holders,
                modified = state.modified,
                has_output,
                "no destructor wait needed"
            );
            return None;
        }
        let (promise, future) = destructor::channel();
        state.destructors.push(promise);
        tracing::debug!(
            buffer = %self.core.id,
            holders,
            pending = state.destructors.len(),
            "destructor future issued"
        );
        Some(future)
    }

    /// Runs `f` under the storage lock only.
    pub(crate) fn read_storage<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        self.core.storage.lock().with_slice(f)
    }

    /// Runs `f` under the storage lock only.
    pub(crate) fn write_storage<R>(
        &self,
        f: impl FnOnce(&mut [T]) -> R,
    ) -> Result<R, BufferError> {
        self.core.storage.lock().with_slice_mut(f)
    }

    /// Give back this handle's holder now instead of at drop.
    ///
    /// Runs teardown if it was the last one. Later calls, and the eventual
    /// drop, do nothing. The handle must not be used afterwards.
    pub(crate) fn release_holder(&mut self) {
        if !mem::replace(&mut self.held, false) {
            return;
        }
        let prev = self.core.holders.fetch_sub(1, Ordering::Release);
        tracing::trace!(buffer = %self.core.id, holders = prev - 1, "holder released");
        if prev == 1 {
            // Synchronize with every other holder's release before tearing down.
            atomic::fence(Ordering::Acquire);
            self.core.finalize();
        }
    }
}

impl<T, const D: usize> BufferCore<'_, T, D> {
    /// The destruction sequence. Runs exactly once, on the thread that
    /// released the last holder.
    fn finalize(&self) {
        self.stats.set_lifecycle(Lifecycle::Finalizing);
        let storage = self.storage.lock().take();
        let (modified, write_back, promises) = {
            let mut state = self.state.lock();
            state.latest_producer = None;
            (
                state.modified,
                state.write_back.take(),
                mem::take(&mut state.destructors),
            )
        };
        tracing::debug!(buffer = %self.id, modified, "finalizing");

        match write_back {
            Some(wb) if modified => {
                let destination = wb.kind();
                match wb.fire(&storage, self.id) {
                    WriteBackOutcome::Copied(elements) => {
                        self.stats.record_write_back();
                        tracing::debug!(buffer = %self.id, destination, elements, "write-back fired");
                    }
                    outcome => {
                        self.stats.record_write_back_skipped();
                        tracing::debug!(buffer = %self.id, destination, ?outcome, "write-back skipped");
                    }
                }
            }
            Some(wb) => {
                tracing::debug!(buffer = %self.id, destination = wb.kind(), "unmodified, no write-back");
            }
            None => {}
        }

        storage.release(self.id, &self.stats);
        self.stats.set_lifecycle(Lifecycle::Destroyed);
        tracing::debug!(buffer = %self.id, "destroyed");

        for promise in promises {
            promise.resolve();
        }
    }
}

impl<T, const D: usize> Clone for Buffer<'_, T, D> {
    fn clone(&self) -> Self {
        let prev = self.core.holders.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(buffer = %self.core.id, holders = prev + 1, "holder added");
        Self {
            core: Arc::clone(&self.core),
            held: true,
        }
    }
}

impl<T, const D: usize> Drop for Buffer<'_, T, D> {
    fn drop(&mut self) {
        self.release_holder();
    }
}

impl<T, const D: usize> fmt::Debug for Buffer<'_, T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("id", &self.core.id)
            .field("range", &self.core.range)
            .field("mode", &self.ownership_mode())
            .field("holders", &self.holder_count())
            .finish()
    }
}
