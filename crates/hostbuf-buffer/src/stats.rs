//! Allocation and teardown counters for a single buffer.
//!
//! [`BufferStats`] is shared via `Arc` between the buffer and anyone who
//! asked for it, so it stays readable after the buffer is destroyed.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Destruction state of a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    /// At least one holder is alive.
    Live,
    /// The last holder is gone; write-back and storage release are running.
    Finalizing,
    /// Teardown has completed.
    Destroyed,
}

impl Lifecycle {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Live,
            1 => Self::Finalizing,
            _ => Self::Destroyed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Live => 0,
            Self::Finalizing => 1,
            Self::Destroyed => 2,
        }
    }
}

/// Counters describing what a buffer did with memory over its lifetime.
#[derive(Debug)]
pub struct BufferStats {
    allocations: AtomicU64,
    bytes_allocated: AtomicU64,
    releases: AtomicU64,
    cow_realizations: AtomicU64,
    write_backs: AtomicU64,
    write_backs_skipped: AtomicU64,
    lifecycle: AtomicU8,
}

// Compile-time assertion: BufferStats must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<BufferStats>();
};

impl BufferStats {
    pub(crate) fn new() -> Self {
        Self {
            allocations: AtomicU64::new(0),
            bytes_allocated: AtomicU64::new(0),
            releases: AtomicU64::new(0),
            cow_realizations: AtomicU64::new(0),
            write_backs: AtomicU64::new(0),
            write_backs_skipped: AtomicU64::new(0),
            lifecycle: AtomicU8::new(Lifecycle::Live.as_u8()),
        }
    }

    /// Number of runtime-owned allocations made.
    pub fn allocations(&self) -> u64 {
        self.allocations.load(Ordering::Acquire)
    }

    /// Total bytes of runtime-owned storage allocated.
    pub fn bytes_allocated(&self) -> u64 {
        self.bytes_allocated.load(Ordering::Acquire)
    }

    /// Number of times storage was actually freed or handed to release logic.
    ///
    /// Never incremented for storage the buffer only borrowed.
    pub fn releases(&self) -> u64 {
        self.releases.load(Ordering::Acquire)
    }

    /// Number of copy-on-write realizations. At most 1.
    pub fn cow_realizations(&self) -> u64 {
        self.cow_realizations.load(Ordering::Acquire)
    }

    /// Number of write-backs that copied data out.
    pub fn write_backs(&self) -> u64 {
        self.write_backs.load(Ordering::Acquire)
    }

    /// Number of write-backs that fired but had nothing to copy into
    /// (released weak destination, or destination is the storage itself).
    pub fn write_backs_skipped(&self) -> u64 {
        self.write_backs_skipped.load(Ordering::Acquire)
    }

    /// Current destruction state.
    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_u8(self.lifecycle.load(Ordering::Acquire))
    }

    pub(crate) fn record_allocation(&self, bytes: usize) {
        self.allocations.fetch_add(1, Ordering::AcqRel);
        self.bytes_allocated
            .fetch_add(bytes as u64, Ordering::AcqRel);
    }

    pub(crate) fn record_release(&self) {
        self.releases.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn record_cow_realization(&self) {
        self.cow_realizations.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn record_write_back(&self) {
        self.write_backs.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn record_write_back_skipped(&self) {
        self.write_backs_skipped.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn set_lifecycle(&self, state: Lifecycle) {
        self.lifecycle.store(state.as_u8(), Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_stats_are_zero_and_live() {
        let s = BufferStats::new();
        assert_eq!(s.allocations(), 0);
        assert_eq!(s.bytes_allocated(), 0);
        assert_eq!(s.releases(), 0);
        assert_eq!(s.cow_realizations(), 0);
        assert_eq!(s.write_backs(), 0);
        assert_eq!(s.write_backs_skipped(), 0);
        assert_eq!(s.lifecycle(), Lifecycle::Live);
    }

    #[test]
    fn lifecycle_round_trips_through_atomic() {
        let s = BufferStats::new();
        for state in [Lifecycle::Finalizing, Lifecycle::Destroyed, Lifecycle::Live] {
            s.set_lifecycle(state);
            assert_eq!(s.lifecycle(), state);
        }
    }

    #[test]
    fn allocation_accumulates_bytes() {
        let s = BufferStats::new();
        s.record_allocation(16);
        s.record_allocation(8);
        assert_eq!(s.allocations(), 2);
        assert_eq!(s.bytes_allocated(), 24);
    }
}
