//! Shape descriptors: per-dimension extents ([`Range`]) and element
//! indices ([`Id`]).
//!
//! Element storage is row-major: the last dimension varies fastest.

use std::fmt;

/// Per-dimension extents of a `D`-dimensional buffer.
///
/// `D` is fixed at compile time and must be at least 1. Extents may be
/// zero, which describes an empty buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Range<const D: usize> {
    extents: [usize; D],
}

impl<const D: usize> Range<D> {
    /// Create a range from its per-dimension extents.
    pub fn new(extents: [usize; D]) -> Self {
        const { assert!(D > 0, "a range needs at least one dimension") };
        Self { extents }
    }

    /// The per-dimension extents.
    pub fn extents(&self) -> [usize; D] {
        self.extents
    }

    /// Extent of dimension `dim`.
    ///
    /// # Panics
    ///
    /// Panics if `dim >= D`.
    pub fn get(&self, dim: usize) -> usize {
        self.extents[dim]
    }

    /// Number of dimensions.
    pub const fn dimensions(&self) -> usize {
        D
    }

    /// Total element count, or `None` if the product overflows `usize`.
    pub fn checked_count(&self) -> Option<usize> {
        self.extents
            .iter()
            .try_fold(1usize, |acc, &e| acc.checked_mul(e))
    }

    /// Total element count, saturating at `usize::MAX`.
    pub fn count(&self) -> usize {
        self.checked_count().unwrap_or(usize::MAX)
    }

    /// Row-major linear offset of `id`, or `None` if any coordinate is
    /// outside its extent.
    pub fn linear_index(&self, id: Id<D>) -> Option<usize> {
        let mut offset = 0usize;
        for (&i, &extent) in id.0.iter().zip(self.extents.iter()) {
            if i >= extent {
                return None;
            }
            offset = offset * extent + i;
        }
        Some(offset)
    }
}

impl<const D: usize> From<[usize; D]> for Range<D> {
    fn from(extents: [usize; D]) -> Self {
        Self::new(extents)
    }
}

impl From<usize> for Range<1> {
    fn from(len: usize) -> Self {
        Self::new([len])
    }
}

impl<const D: usize> fmt::Display for Range<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, e) in self.extents.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{e}")?;
        }
        write!(f, ")")
    }
}

/// A `D`-dimensional element index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Id<const D: usize>(pub [usize; D]);

impl<const D: usize> From<[usize; D]> for Id<D> {
    fn from(v: [usize; D]) -> Self {
        Self(v)
    }
}

impl From<usize> for Id<1> {
    fn from(v: usize) -> Self {
        Self([v])
    }
}

impl<const D: usize> fmt::Display for Id<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Range::new(self.0))
    }
}
