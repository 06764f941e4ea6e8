//! Benchmark profiles for hostbuf buffers.
//!
//! - [`REFERENCE_SHAPE`]: 256x256 grid (64K elements), the default workload
//! - [`reference_input`]: deterministic `f32` host data for that shape
//! - [`capped_builder`]: builder with an allocation cap sized to the workload

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use hostbuf_buffer::{BufferBuilder, BufferConfig};
use hostbuf_core::Range;

/// Reference workload shape: 256x256 (64K elements).
pub const REFERENCE_SHAPE: [usize; 2] = [256, 256];

/// Element count of [`REFERENCE_SHAPE`].
pub fn reference_count() -> usize {
    Range::new(REFERENCE_SHAPE).count()
}

/// Deterministic host data for the reference shape.
pub fn reference_input() -> Vec<f32> {
    (0..reference_count()).map(|i| (i % 251) as f32 * 0.5).collect()
}

/// Builder whose cap admits exactly one reference-sized `f32` allocation.
pub fn capped_builder() -> BufferBuilder {
    let cap = reference_count() * std::mem::size_of::<f32>();
    BufferBuilder::new(BufferConfig::new().with_max_allocation_bytes(cap))
        .expect("reference cap is non-zero")
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostbuf_buffer::Buffer;
    use hostbuf_core::BufferError;

    #[test]
    fn capped_builder_admits_one_reference_buffer() {
        let builder = capped_builder();
        let buf: Buffer<'static, f32, 2> = builder.owned(REFERENCE_SHAPE).unwrap();
        assert_eq!(buf.count(), reference_count());
        let wider: Result<Buffer<'static, f64, 2>, _> = builder.owned(REFERENCE_SHAPE);
        assert!(matches!(wider, Err(BufferError::OutOfMemory { .. })));
    }
}
