//! Buffer configuration parameters.

use thiserror::Error;

/// Configuration applied to every buffer built by a
/// [`BufferBuilder`](crate::BufferBuilder).
///
/// Validated at builder construction; immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferConfig {
    /// Upper bound on a single runtime-owned allocation, in bytes.
    ///
    /// Applies to Owned construction and to copy-on-write realization.
    /// Requests above the cap fail with `BufferError::OutOfMemory`
    /// before touching the allocator. Default: `None` (unlimited).
    pub max_allocation_bytes: Option<usize>,
}

impl BufferConfig {
    /// Default allocation cap: unlimited.
    pub const DEFAULT_MAX_ALLOCATION_BYTES: Option<usize> = None;

    /// Create a config with default values.
    pub fn new() -> Self {
        Self {
            max_allocation_bytes: Self::DEFAULT_MAX_ALLOCATION_BYTES,
        }
    }

    /// Set the allocation cap in bytes.
    pub fn with_max_allocation_bytes(mut self, bytes: usize) -> Self {
        self.max_allocation_bytes = Some(bytes);
        self
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_allocation_bytes == Some(0) {
            return Err(ConfigError::ZeroAllocationLimit);
        }
        Ok(())
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors detected during [`BufferConfig::validate()`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An allocation cap of zero bytes would reject every Owned buffer.
    #[error("max_allocation_bytes must be non-zero")]
    ZeroAllocationLimit,
}
