//! Buffer construction, one entry point per ownership mode.
//!
//! Every constructor checks that the data it is given matches the
//! requested shape before taking ownership of anything. Owned storage
//! goes through the builder's [`BufferConfig`] allocation cap.

use std::sync::Arc;

use hostbuf_core::{BufferError, Range};

use crate::buffer::Buffer;
use crate::config::{BufferConfig, ConfigError};
use crate::stats::BufferStats;
use crate::storage::{self, SharedHostData, Storage};

/// Factory for buffers sharing one validated [`BufferConfig`].
#[derive(Clone, Debug, Default)]
pub struct BufferBuilder {
    config: BufferConfig,
}

impl BufferBuilder {
    /// Validate `config` and create a builder.
    pub fn new(config: BufferConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration buffers are built with.
    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    /// Runtime-owned storage of `range.count()` default elements.
    pub fn owned<'a, T, const D: usize>(
        &self,
        range: impl Into<Range<D>>,
    ) -> Result<Buffer<'a, T, D>, BufferError>
    where
        T: Clone + Default,
    {
        let range = range.into();
        let count = expected_count(&range)?;
        let stats = Arc::new(BufferStats::new());
        let data = storage::allocate(count, &self.config, &stats)?;
        Ok(self.finish(range, Storage::Owned(data), stats))
    }

    /// Alias writable caller memory. Reads and writes go to `data` in
    /// place; the buffer never frees it.
    pub fn host<'a, T, const D: usize>(
        &self,
        data: &'a mut [T],
        range: impl Into<Range<D>>,
    ) -> Result<Buffer<'a, T, D>, BufferError> {
        let range = range.into();
        check_len(&range, data.len())?;
        Ok(self.finish(range, Storage::HostWritable(data), fresh_stats()))
    }

    /// Alias read-only caller memory. The first write-capable access
    /// switches the buffer to a private copy; `data` is never written.
    pub fn read_only<'a, T, const D: usize>(
        &self,
        data: &'a [T],
        range: impl Into<Range<D>>,
    ) -> Result<Buffer<'a, T, D>, BufferError> {
        let range = range.into();
        check_len(&range, data.len())?;
        Ok(self.finish(range, Storage::HostReadOnly(data), fresh_stats()))
    }

    /// Share ownership of caller memory. The allocation outlives the
    /// buffer if the caller still holds it.
    pub fn shared<'a, T, const D: usize>(
        &self,
        data: SharedHostData<T>,
        range: impl Into<Range<D>>,
    ) -> Result<Buffer<'a, T, D>, BufferError> {
        let range = range.into();
        let len = data.lock().len();
        check_len(&range, len)?;
        Ok(self.finish(range, Storage::Shared(data), fresh_stats()))
    }

    /// Take over caller memory together with the logic that releases it.
    /// `release` runs exactly once, at teardown.
    pub fn transferred<'a, T, const D: usize>(
        &self,
        data: Vec<T>,
        range: impl Into<Range<D>>,
        release: impl FnOnce(Vec<T>) + Send + 'a,
    ) -> Result<Buffer<'a, T, D>, BufferError> {
        let range = range.into();
        check_len(&range, data.len())?;
        let storage = Storage::Transferred {
            data,
            release: Box::new(release),
        };
        Ok(self.finish(range, storage, fresh_stats()))
    }

    /// Take over a vector with default release: it is dropped at teardown.
    pub fn vec<'a, T, const D: usize>(
        &self,
        data: Vec<T>,
        range: impl Into<Range<D>>,
    ) -> Result<Buffer<'a, T, D>, BufferError>
    where
        T: Send,
    {
        self.transferred(data, range, drop)
    }

    /// Owned 1-D storage initialised from an exact-size sequence.
    pub fn elements<'a, T, I>(&self, iter: I) -> Result<Buffer<'a, T, 1>, BufferError>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        let iter = iter.into_iter();
        let range = Range::from(iter.len());
        self.elements_with_range(iter, range)
    }

    /// Owned storage of shape `range` initialised from a sequence in
    /// row-major order. The sequence length must equal `range.count()`.
    pub fn elements_with_range<'a, T, I, const D: usize>(
        &self,
        iter: I,
        range: impl Into<Range<D>>,
    ) -> Result<Buffer<'a, T, D>, BufferError>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        let range = range.into();
        let count = expected_count(&range)?;
        let iter = iter.into_iter();
        check_len(&range, iter.len())?;
        let stats = Arc::new(BufferStats::new());
        let mut data = storage::reserve(count, &self.config, &stats)?;
        data.extend(iter);
        check_len(&range, data.len())?;
        Ok(self.finish(range, Storage::Owned(data), stats))
    }

    fn finish<'a, T, const D: usize>(
        &self,
        range: Range<D>,
        storage: Storage<'a, T>,
        stats: Arc<BufferStats>,
    ) -> Buffer<'a, T, D> {
        Buffer::from_storage(range, storage, self.config.clone(), stats)
    }
}

fn fresh_stats() -> Arc<BufferStats> {
    Arc::new(BufferStats::new())
}

fn expected_count<const D: usize>(range: &Range<D>) -> Result<usize, BufferError> {
    range.checked_count().ok_or(BufferError::InvalidRange {
        expected: usize::MAX,
        actual: 0,
    })
}

fn check_len<const D: usize>(range: &Range<D>, actual: usize) -> Result<(), BufferError> {
    let expected = expected_count(range)?;
    if expected != actual {
        return Err(BufferError::InvalidRange { expected, actual });
    }
    Ok(())
}

/// Shorthand constructors using the default configuration.
impl<'a, T, const D: usize> Buffer<'a, T, D> {
    /// See [`BufferBuilder::owned`].
    pub fn new(range: impl Into<Range<D>>) -> Result<Self, BufferError>
    where
        T: Clone + Default,
    {
        BufferBuilder::default().owned(range)
    }

    /// See [`BufferBuilder::host`].
    pub fn from_host(data: &'a mut [T], range: impl Into<Range<D>>) -> Result<Self, BufferError> {
        BufferBuilder::default().host(data, range)
    }

    /// See [`BufferBuilder::read_only`].
    pub fn from_read_only(data: &'a [T], range: impl Into<Range<D>>) -> Result<Self, BufferError> {
        BufferBuilder::default().read_only(data, range)
    }

    /// See [`BufferBuilder::shared`].
    pub fn from_shared(
        data: SharedHostData<T>,
        range: impl Into<Range<D>>,
    ) -> Result<Self, BufferError> {
        BufferBuilder::default().shared(data, range)
    }

    /// See [`BufferBuilder::transferred`].
    pub fn from_transferred(
        data: Vec<T>,
        range: impl Into<Range<D>>,
        release: impl FnOnce(Vec<T>) + Send + 'a,
    ) -> Result<Self, BufferError> {
        BufferBuilder::default().transferred(data, range, release)
    }

    /// See [`BufferBuilder::vec`].
    pub fn from_vec(data: Vec<T>, range: impl Into<Range<D>>) -> Result<Self, BufferError>
    where
        T: Send,
    {
        BufferBuilder::default().vec(data, range)
    }

    /// See [`BufferBuilder::elements_with_range`].
    pub fn from_elements_with_range<I>(
        iter: I,
        range: impl Into<Range<D>>,
    ) -> Result<Self, BufferError>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        BufferBuilder::default().elements_with_range(iter, range)
    }
}

impl<'a, T> Buffer<'a, T, 1> {
    /// See [`BufferBuilder::elements`].
    pub fn from_elements<I>(iter: I) -> Result<Self, BufferError>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        BufferBuilder::default().elements(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{shared_host_data, OwnershipMode};
    use crate::Lifecycle;
    use hostbuf_test_utils::ReleaseRecorder;

    #[test]
    fn zero_cap_config_is_rejected() {
        let err = BufferBuilder::new(BufferConfig::new().with_max_allocation_bytes(0)).unwrap_err();
        assert_eq!(err, ConfigError::ZeroAllocationLimit);
    }

    #[test]
    fn owned_is_default_filled() {
        let buf = Buffer::<f32, 2>::new([2, 3]).unwrap();
        assert_eq!(buf.count(), 6);
        assert_eq!(buf.byte_size(), 24);
        assert_eq!(buf.to_vec(), vec![0.0; 6]);
        assert_eq!(buf.ownership_mode(), OwnershipMode::Owned);
        assert!(!buf.is_data_host());
        assert!(!buf.is_modified());
        assert_eq!(buf.stats().allocations(), 1);
        assert_eq!(buf.stats().bytes_allocated(), 24);
    }

    #[test]
    fn owned_respects_allocation_cap() {
        let builder =
            BufferBuilder::new(BufferConfig::new().with_max_allocation_bytes(8)).unwrap();
        let err = builder.owned::<u32, 1>(3).unwrap_err();
        assert_eq!(
            err,
            BufferError::OutOfMemory {
                requested: 12,
                limit: Some(8)
            }
        );
    }

    #[test]
    fn owned_overflowing_range_is_out_of_memory() {
        let err = Buffer::<u64, 1>::new(usize::MAX).unwrap_err();
        assert!(matches!(err, BufferError::OutOfMemory { .. }));
    }

    #[test]
    fn overflowing_shape_is_invalid_range() {
        let err = Buffer::<u8, 2>::from_vec(vec![0; 4], [usize::MAX, 2]).unwrap_err();
        assert!(matches!(err, BufferError::InvalidRange { .. }));
    }

    #[test]
    fn zero_extent_owned_buffer_is_empty() {
        let buf = Buffer::<i32, 2>::new([0, 5]).unwrap();
        assert_eq!(buf.count(), 0);
        assert!(buf.to_vec().is_empty());
    }

    #[test]
    fn alias_constructors_reject_length_mismatch() {
        let mut host = [0; 5];
        let err = Buffer::<i32, 2>::from_host(&mut host, [2, 3]).unwrap_err();
        assert_eq!(
            err,
            BufferError::InvalidRange {
                expected: 6,
                actual: 5
            }
        );
        assert!(Buffer::<i32, 1>::from_read_only(&[1, 2], 3).is_err());
        assert!(Buffer::<i32, 1>::from_shared(shared_host_data(vec![1]), 2).is_err());
        assert!(Buffer::<i32, 1>::from_vec(vec![1, 2, 3], 2).is_err());
    }

    #[test]
    fn mismatched_transfer_keeps_release_unrun() {
        let recorder = ReleaseRecorder::new();
        let r = Buffer::<i32, 1>::from_transferred(vec![1, 2], 3, recorder.release_fn());
        assert!(r.is_err());
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn alias_constructors_allocate_nothing() {
        let mut host = [1, 2];
        let buf = Buffer::<i32, 1>::from_host(&mut host, 2).unwrap();
        assert_eq!(buf.ownership_mode(), OwnershipMode::AliasWritable);
        assert!(buf.is_data_host());
        assert_eq!(buf.stats().allocations(), 0);
    }

    #[test]
    fn shared_buffer_is_visible_through_caller_handle() {
        let data = shared_host_data(vec![1, 2, 3]);
        let buf = Buffer::<i32, 1>::from_shared(Arc::clone(&data), 3).unwrap();
        buf.access(hostbuf_core::AccessMode::Write, Default::default())
            .unwrap()
            .set(1, 20)
            .unwrap();
        assert_eq!(*data.lock(), vec![1, 20, 3]);
        let stats = buf.stats();
        drop(buf);
        assert_eq!(stats.releases(), 0);
        assert_eq!(*data.lock(), vec![1, 20, 3]);
    }

    #[test]
    fn transferred_release_runs_once_at_teardown() {
        let recorder = ReleaseRecorder::new();
        let buf = Buffer::<i32, 1>::from_transferred(vec![1, 2], 2, recorder.release_fn()).unwrap();
        let extra = buf.clone();
        drop(buf);
        assert!(recorder.events().is_empty());
        let stats = extra.stats();
        drop(extra);
        assert_eq!(recorder.events(), vec!["release 2".to_string()]);
        assert_eq!(stats.lifecycle(), Lifecycle::Destroyed);
        assert_eq!(stats.releases(), 1);
    }

    #[test]
    fn elements_fill_in_row_major_order() {
        let buf = Buffer::<i32, 2>::from_elements_with_range(1..7, [2, 3]).unwrap();
        let acc = buf.access(hostbuf_core::AccessMode::Read, Default::default()).unwrap();
        assert_eq!(acc.get([1, 1]).unwrap(), 5);
        assert_eq!(Buffer::<i32, 1>::from_elements(vec![7, 8]).unwrap().range(), Range::new([2]));
    }

    #[test]
    fn elements_length_mismatch_is_rejected() {
        let err = Buffer::<i32, 2>::from_elements_with_range(0..5, [2, 3]).unwrap_err();
        assert_eq!(
            err,
            BufferError::InvalidRange {
                expected: 6,
                actual: 5
            }
        );
    }

    #[test]
    fn builder_config_is_carried_to_buffers() {
        let config = BufferConfig::new().with_max_allocation_bytes(1024);
        let builder = BufferBuilder::new(config.clone()).unwrap();
        let buf: Buffer<'_, u8, 1> = builder.owned(4).unwrap();
        assert_eq!(buf.config(), &config);
    }
}
