//! Seeded input generation.
//!
//! Every test fills its inputs from one [`InputGenerator`], then writes
//! boundary values over chosen indices. The same seed always yields the same
//! buffers, so a failing run can be replayed with `CLCONF_SEED`.

use rand::distr::uniform::{SampleRange, SampleUniform};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

use crate::element::{Element, HostBuffer, VectorWidth};
use crate::error::{HarnessError, Result};

/// A flattened, fixed-length sequence of elements with a vector width.
#[derive(Debug, Clone, PartialEq)]
pub struct TestVector<T> {
    values: Vec<T>,
    width: VectorWidth,
}

impl<T: Element> TestVector<T> {
    /// Wrap `values`, which must hold a whole number of storage-width vectors.
    pub fn new(values: Vec<T>, width: VectorWidth) -> Result<Self> {
        let lanes = width.storage_lanes();
        if values.len() % lanes != 0 {
            return Err(HarnessError::InvalidLength { len: values.len(), lanes });
        }
        Ok(Self { values, width })
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn width(&self) -> VectorWidth {
        self.width
    }

    /// Number of scalar slots, padding included.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of (possibly padded) vectors.
    pub fn vector_count(&self) -> usize {
        self.values.len() / self.width.storage_lanes()
    }

    pub fn to_buffer(&self) -> HostBuffer {
        T::into_buffer(self.values.clone())
    }
}

/// Deterministic pseudo-random input source.
pub struct InputGenerator {
    rng: ChaCha8Rng,
    seed: u64,
}

impl InputGenerator {
    pub fn new(seed: u64) -> Self {
        debug!(seed, "input generator seeded");
        Self { rng: ChaCha8Rng::seed_from_u64(seed), seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Fill `vectors` vectors of `width` with values drawn uniformly from
    /// `range`, then apply `overrides`. Padding lanes of 3-wide vectors are
    /// filled too; nothing reads them.
    pub fn uniform<T, R>(
        &mut self,
        vectors: usize,
        width: VectorWidth,
        range: R,
        overrides: &[(usize, T)],
    ) -> TestVector<T>
    where
        T: Element + SampleUniform,
        R: SampleRange<T> + Clone,
    {
        let len = vectors * width.storage_lanes();
        let values = (0..len).map(|_| self.rng.random_range(range.clone())).collect();
        finish(values, width, overrides)
    }

    /// Fill with a deterministic pattern `f(index)`, then apply `overrides`.
    pub fn from_fn<T, F>(
        &mut self,
        vectors: usize,
        width: VectorWidth,
        f: F,
        overrides: &[(usize, T)],
    ) -> TestVector<T>
    where
        T: Element,
        F: FnMut(usize) -> T,
    {
        let len = vectors * width.storage_lanes();
        finish((0..len).map(f).collect(), width, overrides)
    }

    /// Draw a single value.
    pub fn value<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.rng.random_range(range)
    }
}

fn finish<T: Element>(mut values: Vec<T>, width: VectorWidth, overrides: &[(usize, T)]) -> TestVector<T> {
    for &(index, value) in overrides {
        match values.get_mut(index) {
            Some(slot) => *slot = value,
            None => warn!(index, len = values.len(), "boundary override past end of vector, skipped"),
        }
    }
    // Length is vectors * storage_lanes by construction.
    TestVector { values, width }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_values() {
        let a = InputGenerator::new(7).uniform::<u32, _>(8, VectorWidth::V4, 0..=u32::MAX, &[]);
        let b = InputGenerator::new(7).uniform::<u32, _>(8, VectorWidth::V4, 0..=u32::MAX, &[]);
        assert_eq!(a, b);
        let c = InputGenerator::new(8).uniform::<u32, _>(8, VectorWidth::V4, 0..=u32::MAX, &[]);
        assert_ne!(a, c);
    }

    #[test]
    fn overrides_land_at_their_index() {
        let v = InputGenerator::new(1).uniform(4, VectorWidth::Scalar, 0.0f32..1.0, &[(0, -3.0), (3, 9.5)]);
        assert_eq!(v.values()[0], -3.0);
        assert_eq!(v.values()[3], 9.5);
        assert!(v.values()[1] >= 0.0 && v.values()[1] < 1.0);
    }

    #[test]
    fn out_of_range_override_is_skipped() {
        let v = InputGenerator::new(1).from_fn(2, VectorWidth::Scalar, |i| i as u8, &[(5, 9)]);
        assert_eq!(v.values(), &[0, 1]);
    }

    #[test]
    fn three_wide_vectors_are_padded() {
        let v = InputGenerator::new(3).uniform::<f32, _>(3, VectorWidth::V3, 0.0f32..1.0, &[]);
        assert_eq!(v.len(), 12);
        assert_eq!(v.vector_count(), 3);
    }

    #[test]
    fn new_rejects_partial_vectors() {
        let err = TestVector::new(vec![1u8, 2, 3], VectorWidth::V2).unwrap_err();
        assert!(matches!(err, HarnessError::InvalidLength { len: 3, lanes: 2 }));
        let err = TestVector::new(vec![0f32; 6], VectorWidth::V3).unwrap_err();
        assert!(matches!(err, HarnessError::InvalidLength { len: 6, lanes: 4 }));
    }
}
