//! Offset ordering for random workloads
//!
//! Random workloads visit the record-aligned offsets of a file in a shuffled
//! order. The order is computed once per run and shared read-only by every
//! worker, so all workers touch the same offsets in the same order.
//!
//! # Block-Based Design
//!
//! The permutation holds record numbers, not byte offsets. The worker converts
//! them with `offset = record * block_size`, which keeps every transfer
//! aligned to the record size (required for O_DIRECT).
//!
//! # Example
//!
//! ```
//! use fsperf::distribution::permutation::OffsetPermutation;
//!
//! let perm = OffsetPermutation::generate_with_seed(64 * 1024, 4096, 7).unwrap();
//! assert_eq!(perm.len(), 16);
//! let first_offset = perm.offset(0, 4096);
//! assert_eq!(first_offset % 4096, 0);
//! ```

pub mod permutation;

pub use permutation::OffsetPermutation;
