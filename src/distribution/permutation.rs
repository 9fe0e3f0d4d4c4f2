//! Random offset permutation
//!
//! Produces a uniformly shuffled ordering of the record numbers
//! `0..file_size / block_size` using a Fisher-Yates shuffle driven by the
//! xoshiro256++ PRNG.

use crate::error::BenchError;
use crate::Result;
use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Shuffled record numbers of one file
///
/// Built once before workers start and shared behind an `Arc`; it is never
/// mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetPermutation {
    records: Vec<u64>,
}

impl OffsetPermutation {
    /// Generate a permutation seeded from OS entropy
    ///
    /// # Errors
    ///
    /// Returns `BenchError::Configuration` if `block_size` is zero or does not
    /// divide `file_size` evenly.
    pub fn generate(file_size: u64, block_size: u64) -> Result<Self> {
        Self::build(file_size, block_size, Xoshiro256PlusPlus::from_entropy())
    }

    /// Generate a reproducible permutation
    pub fn generate_with_seed(file_size: u64, block_size: u64, seed: u64) -> Result<Self> {
        Self::build(file_size, block_size, Xoshiro256PlusPlus::seed_from_u64(seed))
    }

    fn build(file_size: u64, block_size: u64, mut rng: Xoshiro256PlusPlus) -> Result<Self> {
        if block_size == 0 || file_size % block_size != 0 {
            return Err(BenchError::config(format!(
                "file size {} is not a multiple of record size {}",
                file_size, block_size
            ))
            .into());
        }

        let count = file_size / block_size;
        let mut records: Vec<u64> = (0..count).collect();

        // Fisher-Yates: every position swaps with a uniformly chosen position at or before it
        for i in (1..records.len()).rev() {
            let j = rng.gen_range(0..=i);
            records.swap(i, j);
        }

        Ok(Self { records })
    }

    /// Number of records in the file
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record number at position `index`
    #[inline(always)]
    pub fn record(&self, index: usize) -> u64 {
        self.records[index]
    }

    /// Byte offset at position `index`
    #[inline(always)]
    pub fn offset(&self, index: usize, block_size: u64) -> u64 {
        self.records[index] * block_size
    }

    pub fn records(&self) -> &[u64] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_permutation(perm: &OffsetPermutation, count: u64) -> bool {
        let mut sorted = perm.records().to_vec();
        sorted.sort_unstable();
        sorted == (0..count).collect::<Vec<_>>()
    }

    #[test]
    fn test_every_record_exactly_once() {
        let perm = OffsetPermutation::generate(1024 * 1024, 4096).unwrap();
        assert_eq!(perm.len(), 256);
        assert!(is_permutation(&perm, 256));
    }

    #[test]
    fn test_single_record() {
        let perm = OffsetPermutation::generate(4096, 4096).unwrap();
        assert_eq!(perm.records(), &[0]);
        assert_eq!(perm.offset(0, 4096), 0);
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let a = OffsetPermutation::generate_with_seed(1024 * 1024, 4096, 42).unwrap();
        let b = OffsetPermutation::generate_with_seed(1024 * 1024, 4096, 42).unwrap();
        let c = OffsetPermutation::generate_with_seed(1024 * 1024, 4096, 43).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(is_permutation(&c, 256));
    }

    #[test]
    fn test_actually_shuffles() {
        let perm = OffsetPermutation::generate_with_seed(1024 * 1024, 4096, 1).unwrap();
        let identity: Vec<u64> = (0..256).collect();
        assert_ne!(perm.records(), identity.as_slice());
    }

    #[test]
    fn test_offsets_are_record_aligned() {
        let perm = OffsetPermutation::generate_with_seed(64 * 1024, 8192, 9).unwrap();
        for i in 0..perm.len() {
            let off = perm.offset(i, 8192);
            assert_eq!(off % 8192, 0);
            assert!(off < 64 * 1024);
        }
    }

    #[test]
    fn test_uneven_division_rejected() {
        let err = OffsetPermutation::generate(10_000, 4096).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BenchError>(),
            Some(BenchError::Configuration(_))
        ));
        assert!(OffsetPermutation::generate(4096, 0).is_err());
    }

    #[test]
    fn test_first_position_is_roughly_uniform() {
        // 4 records, 4000 shuffles: each record should lead about 1000 times
        let mut counts = [0u32; 4];
        for seed in 0..4000 {
            let perm = OffsetPermutation::generate_with_seed(4 * 512, 512, seed).unwrap();
            counts[perm.record(0) as usize] += 1;
        }
        for &c in &counts {
            assert!(c > 800 && c < 1200, "skewed first-position counts: {:?}", counts);
        }
    }
}
