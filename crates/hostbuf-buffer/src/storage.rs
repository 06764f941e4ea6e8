//! Storage ownership policy.
//!
//! A buffer's elements live in exactly one [`Storage`] variant at a time.
//! The variant is the ownership policy: it decides who may write the
//! memory in place and what happens to it at teardown.
//!
//! | Variant | Mode | Teardown |
//! |---|---|---|
//! | `Owned` | [`OwnershipMode::Owned`] | free |
//! | `HostWritable` | [`OwnershipMode::AliasWritable`] | nothing |
//! | `HostReadOnly` | [`OwnershipMode::AliasReadOnlyCow`] | nothing |
//! | `Shared` | [`OwnershipMode::AliasShared`] | drop one strong ref |
//! | `Transferred` | [`OwnershipMode::AliasTransferred`] | caller's release logic |
//!
//! The only transition is `HostReadOnly` → `Owned`, performed once by
//! copy-on-write realization.

use std::fmt;
use std::mem;
use std::sync::Arc;

use parking_lot::Mutex;

use hostbuf_core::{BufferError, BufferId};

use crate::config::BufferConfig;
use crate::stats::BufferStats;

/// Host data whose ownership is shared between the caller and a buffer.
///
/// The allocation lives as long as its longest holder. The caller keeps
/// using the same `Arc` and locks it to read or write.
pub type SharedHostData<T> = Arc<Mutex<Vec<T>>>;

/// Wrap `data` for shared ownership with a buffer.
pub fn shared_host_data<T>(data: Vec<T>) -> SharedHostData<T> {
    Arc::new(Mutex::new(data))
}

/// Caller-supplied release logic for transferred storage.
pub type ReleaseFn<'a, T> = Box<dyn FnOnce(Vec<T>) + Send + 'a>;

/// The ownership/aliasing policy a buffer was built with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OwnershipMode {
    /// Runtime-allocated storage, freed at teardown.
    Owned,
    /// Caller memory, written in place, never freed by the buffer.
    AliasWritable,
    /// Caller read-only memory, copied on the first write-capable access.
    AliasReadOnlyCow,
    /// Caller memory under shared ownership.
    AliasShared,
    /// Caller memory handed over together with its release logic.
    AliasTransferred,
}

impl fmt::Display for OwnershipMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Owned => "owned",
            Self::AliasWritable => "alias_writable",
            Self::AliasReadOnlyCow => "alias_read_only_cow",
            Self::AliasShared => "alias_shared",
            Self::AliasTransferred => "alias_transferred",
        };
        f.write_str(s)
    }
}

impl OwnershipMode {
    /// True while storage is caller read-only memory awaiting realization.
    pub fn copy_if_modified(self) -> bool {
        self == Self::AliasReadOnlyCow
    }

    /// True while storage aliases caller-provided host memory.
    pub fn is_data_host(self) -> bool {
        self != Self::Owned
    }
}

/// Backing storage of a buffer, tagged by ownership.
pub(crate) enum Storage<'a, T> {
    Owned(Vec<T>),
    HostWritable(&'a mut [T]),
    HostReadOnly(&'a [T]),
    Shared(SharedHostData<T>),
    Transferred {
        data: Vec<T>,
        release: ReleaseFn<'a, T>,
    },
}

impl<'a, T> Storage<'a, T> {
    /// An empty owned placeholder. Does not allocate.
    pub(crate) fn empty() -> Self {
        Self::Owned(Vec::new())
    }

    pub(crate) fn mode(&self) -> OwnershipMode {
        match self {
            Self::Owned(_) => OwnershipMode::Owned,
            Self::HostWritable(_) => OwnershipMode::AliasWritable,
            Self::HostReadOnly(_) => OwnershipMode::AliasReadOnlyCow,
            Self::Shared(_) => OwnershipMode::AliasShared,
            Self::Transferred { .. } => OwnershipMode::AliasTransferred,
        }
    }

    pub(crate) fn shared_handle(&self) -> Option<&SharedHostData<T>> {
        match self {
            Self::Shared(arc) => Some(arc),
            _ => None,
        }
    }

    pub(crate) fn with_slice<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        match self {
            Self::Owned(v) => f(v),
            Self::HostWritable(s) => f(s),
            Self::HostReadOnly(s) => f(s),
            Self::Shared(arc) => f(&arc.lock()),
            Self::Transferred { data, .. } => f(data),
        }
    }

    /// Mutable view of the elements.
    ///
    /// Fails on caller read-only storage: it must be realized first.
    pub(crate) fn with_slice_mut<R>(
        &mut self,
        f: impl FnOnce(&mut [T]) -> R,
    ) -> Result<R, BufferError> {
        match self {
            Self::Owned(v) => Ok(f(v)),
            Self::HostWritable(s) => Ok(f(s)),
            Self::HostReadOnly(_) => Err(BufferError::ReadOnlyStorage),
            Self::Shared(arc) => Ok(f(&mut arc.lock())),
            Self::Transferred { data, .. } => Ok(f(data)),
        }
    }

    /// Run the teardown action for this ownership mode.
    pub(crate) fn release(self, id: BufferId, stats: &BufferStats) {
        let mode = self.mode();
        match self {
            Self::Owned(v) => {
                drop(v);
                stats.record_release();
                tracing::debug!(buffer = %id, %mode, "freed owned storage");
            }
            Self::HostWritable(_) | Self::HostReadOnly(_) => {
                tracing::debug!(buffer = %id, %mode, "left borrowed storage to caller");
            }
            Self::Shared(arc) => match Arc::try_unwrap(arc) {
                Ok(last) => {
                    drop(last);
                    stats.record_release();
                    tracing::debug!(buffer = %id, %mode, "freed shared storage, last holder");
                }
                Err(still_shared) => {
                    let remaining = Arc::strong_count(&still_shared) - 1;
                    drop(still_shared);
                    tracing::debug!(buffer = %id, %mode, remaining, "dropped shared storage reference");
                }
            },
            Self::Transferred { data, release } => {
                release(data);
                stats.record_release();
                tracing::debug!(buffer = %id, %mode, "ran transferred release logic");
            }
        }
    }

    /// Swap in a placeholder and return the real storage.
    pub(crate) fn take(&mut self) -> Self {
        mem::replace(self, Self::empty())
    }
}

/// Byte size of `count` elements of `T`, reported as `OutOfMemory` on
/// overflow or when it exceeds the configured cap.
fn checked_bytes<T>(count: usize, config: &BufferConfig) -> Result<usize, BufferError> {
    let limit = config.max_allocation_bytes;
    let requested = count
        .checked_mul(mem::size_of::<T>())
        .ok_or(BufferError::OutOfMemory {
            requested: usize::MAX,
            limit,
        })?;
    match limit {
        Some(cap) if requested > cap => Err(BufferError::OutOfMemory { requested, limit }),
        _ => Ok(requested),
    }
}

/// Reserve an empty vector with room for exactly `count` elements.
///
/// Records the allocation in `stats` only on success.
pub(crate) fn reserve<T>(
    count: usize,
    config: &BufferConfig,
    stats: &BufferStats,
) -> Result<Vec<T>, BufferError> {
    let requested = checked_bytes::<T>(count, config)?;
    let mut v = Vec::new();
    v.try_reserve_exact(count)
        .map_err(|_| BufferError::OutOfMemory {
            requested,
            limit: config.max_allocation_bytes,
        })?;
    stats.record_allocation(requested);
    Ok(v)
}

/// Allocate `count` default-initialised elements.
pub(crate) fn allocate<T: Clone + Default>(
    count: usize,
    config: &BufferConfig,
    stats: &BufferStats,
) -> Result<Vec<T>, BufferError> {
    let mut v = reserve(count, config, stats)?;
    v.resize(count, T::default());
    Ok(v)
}

/// Allocate a private copy of `src`, preserving element order.
pub(crate) fn allocate_copy<T: Clone>(
    src: &[T],
    config: &BufferConfig,
    stats: &BufferStats,
) -> Result<Vec<T>, BufferError> {
    let mut v = reserve(src.len(), config, stats)?;
    v.extend_from_slice(src);
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn stats() -> BufferStats {
        BufferStats::new()
    }

    #[test]
    fn modes_and_flags_follow_variant() {
        let mut host = [1, 2, 3];
        let ro = [1, 2, 3];
        let cases: Vec<(Storage<'_, i32>, OwnershipMode, bool, bool)> = vec![
            (Storage::Owned(vec![0; 3]), OwnershipMode::Owned, false, false),
            (
                Storage::HostWritable(&mut host),
                OwnershipMode::AliasWritable,
                false,
                true,
            ),
            (
                Storage::HostReadOnly(&ro),
                OwnershipMode::AliasReadOnlyCow,
                true,
                true,
            ),
            (
                Storage::Shared(shared_host_data(vec![0; 3])),
                OwnershipMode::AliasShared,
                false,
                true,
            ),
        ];
        for (storage, mode, cow, host) in cases {
            assert_eq!(storage.mode(), mode);
            assert_eq!(storage.mode().copy_if_modified(), cow);
            assert_eq!(storage.mode().is_data_host(), host);
        }
    }

    #[test]
    fn read_only_storage_refuses_mutation() {
        let ro = [1, 2, 3];
        let mut storage = Storage::HostReadOnly(&ro);
        let r = storage.with_slice_mut(|s| s[0] = 9);
        assert_eq!(r, Err(BufferError::ReadOnlyStorage));
        storage.with_slice(|s| assert_eq!(s, &[1, 2, 3]));
    }

    #[test]
    fn allocate_respects_cap() {
        let config = BufferConfig::new().with_max_allocation_bytes(16);
        let s = stats();
        assert!(allocate::<u32>(4, &config, &s).is_ok());
        let err = allocate::<u32>(5, &config, &s).unwrap_err();
        assert_eq!(
            err,
            BufferError::OutOfMemory {
                requested: 20,
                limit: Some(16)
            }
        );
        assert_eq!(s.allocations(), 1);
    }

    #[test]
    fn allocate_reports_overflow_as_oom() {
        let s = stats();
        let err = allocate::<u64>(usize::MAX, &BufferConfig::default(), &s).unwrap_err();
        assert!(matches!(
            err,
            BufferError::OutOfMemory {
                requested: usize::MAX,
                ..
            }
        ));
        assert_eq!(s.allocations(), 0);
    }

    #[test]
    fn allocate_copy_preserves_order() {
        let s = stats();
        let v = allocate_copy(&[4, 3, 2, 1], &BufferConfig::default(), &s).unwrap();
        assert_eq!(v, vec![4, 3, 2, 1]);
        assert_eq!(s.bytes_allocated(), 16);
    }

    #[test]
    fn borrowed_release_frees_nothing() {
        let s = stats();
        let mut host = [1, 2];
        Storage::HostWritable(&mut host).release(BufferId::next(), &s);
        assert_eq!(s.releases(), 0);
        assert_eq!(host, [1, 2]);
    }

    #[test]
    fn shared_release_counts_only_last_holder() {
        let s = stats();
        let data = shared_host_data(vec![1, 2]);
        Storage::Shared(Arc::clone(&data)).release(BufferId::next(), &s);
        assert_eq!(s.releases(), 0);
        assert_eq!(Arc::strong_count(&data), 1);
        Storage::Shared(data).release(BufferId::next(), &s);
        assert_eq!(s.releases(), 1);
    }

    #[test]
    fn transferred_release_runs_caller_logic_once() {
        let s = stats();
        let calls = AtomicUsize::new(0);
        let storage = Storage::Transferred {
            data: vec![7, 8],
            release: Box::new(|v: Vec<i32>| {
                assert_eq!(v, vec![7, 8]);
                calls.fetch_add(1, Ordering::SeqCst);
            }),
        };
        storage.release(BufferId::next(), &s);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(s.releases(), 1);
    }

    #[test]
    fn take_leaves_unallocated_placeholder() {
        let mut storage = Storage::Owned(vec![1, 2, 3]);
        let taken = storage.take();
        assert_eq!(taken.mode(), OwnershipMode::Owned);
        storage.with_slice(|s| assert!(s.is_empty()));
    }
}
