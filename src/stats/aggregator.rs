//! Statistics aggregation
//!
//! Merges per-worker results into one aggregate result: the aggregate
//! interval spans from the earliest start to the latest end, and every
//! counter is summed.
//!
//! # Example
//!
//! ```
//! use fsperf::stats::{WorkerResult, aggregator::ResultAggregator};
//!
//! let mut a = WorkerResult::new(0);
//! a.start_ns = 100;
//! a.end_ns = 500;
//! a.files_written = 3;
//!
//! let mut b = WorkerResult::new(1);
//! b.start_ns = 50;
//! b.end_ns = 400;
//! b.files_written = 2;
//!
//! let mut aggregator = ResultAggregator::new();
//! aggregator.add_worker(a);
//! aggregator.add_worker(b);
//!
//! let total = aggregator.aggregate();
//! assert_eq!(total.worker_id, None);
//! assert_eq!((total.start_ns, total.end_ns), (50, 500));
//! assert_eq!(total.files_written, 5);
//! ```

use crate::stats::WorkerResult;

/// Merge any number of results into one aggregate record
///
/// An empty slice yields an all-zero aggregate.
pub fn merge(results: &[WorkerResult]) -> WorkerResult {
    let mut iter = results.iter();
    let first = match iter.next() {
        Some(first) => first,
        None => return WorkerResult::aggregate(),
    };

    let seed = WorkerResult {
        worker_id: None,
        ..first.clone()
    };
    iter.fold(seed, |acc, r| merge_pair(&acc, r))
}

/// Merge two results; the output is always an aggregate record
pub fn merge_pair(a: &WorkerResult, b: &WorkerResult) -> WorkerResult {
    WorkerResult {
        worker_id: None,
        start_ns: a.start_ns.min(b.start_ns),
        end_ns: a.end_ns.max(b.end_ns),
        total_bytes: a.total_bytes + b.total_bytes,
        io_count: a.io_count + b.io_count,
        files_read: a.files_read + b.files_read,
        files_written: a.files_written + b.files_written,
        files_deleted: a.files_deleted + b.files_deleted,
    }
}

/// Collects per-worker results as they arrive
#[derive(Debug, Default)]
pub struct ResultAggregator {
    workers: Vec<WorkerResult>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_worker(&mut self, result: WorkerResult) {
        self.workers.push(result);
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Per-worker results ordered by worker id
    pub fn per_worker(&self) -> Vec<WorkerResult> {
        let mut workers = self.workers.clone();
        workers.sort_by_key(|r| r.worker_id);
        workers
    }

    pub fn aggregate(&self) -> WorkerResult {
        merge(&self.workers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: usize, start: u64, end: u64, seed: u64) -> WorkerResult {
        WorkerResult {
            worker_id: Some(id),
            start_ns: start,
            end_ns: end,
            total_bytes: seed * 4096,
            io_count: seed,
            files_read: seed % 3,
            files_written: seed % 5,
            files_deleted: seed % 7,
        }
    }

    fn strip_id(mut r: WorkerResult) -> WorkerResult {
        r.worker_id = None;
        r
    }

    #[test]
    fn test_empty_merge_is_zero() {
        assert_eq!(merge(&[]), WorkerResult::aggregate());
    }

    #[test]
    fn test_single_merge_preserves_values() {
        let r = result(4, 10, 90, 11);
        let merged = merge(&[r.clone()]);
        assert_eq!(merged, strip_id(r));
    }

    #[test]
    fn test_merge_associative_and_commutative() {
        let a = result(0, 100, 900, 3);
        let b = result(1, 50, 700, 8);
        let c = result(2, 300, 1200, 13);

        let left = merge_pair(&merge_pair(&a, &b), &c);
        let right = merge_pair(&a, &merge_pair(&b, &c));
        assert_eq!(left, right);

        assert_eq!(
            merge(&[a.clone(), b.clone(), c.clone()]),
            merge(&[c.clone(), a.clone(), b.clone()])
        );
        assert_eq!(merge_pair(&a, &b), merge_pair(&b, &a));
        assert_eq!(merge(&[a, b, c]), left);
    }

    #[test]
    fn test_merge_bounds_and_sums() {
        let results: Vec<_> = (0..8)
            .map(|i| result(i, 1000 - i as u64 * 10, 2000 + i as u64 * 5, i as u64 + 1))
            .collect();
        let merged = merge(&results);

        for r in &results {
            assert!(merged.start_ns <= r.start_ns);
            assert!(merged.end_ns >= r.end_ns);
        }
        assert_eq!(merged.start_ns, 930);
        assert_eq!(merged.end_ns, 2035);
        assert_eq!(merged.io_count, (1..=8).sum::<u64>());
        assert_eq!(merged.total_bytes, merged.io_count * 4096);
        assert_eq!(
            merged.files_done(),
            results.iter().map(|r| r.files_done()).sum::<u64>()
        );
    }

    #[test]
    fn test_aggregator_orders_workers() {
        let mut agg = ResultAggregator::new();
        agg.add_worker(result(2, 0, 1, 1));
        agg.add_worker(result(0, 0, 1, 1));
        agg.add_worker(result(1, 0, 1, 1));
        let ids: Vec<_> = agg.per_worker().iter().map(|r| r.worker_id).collect();
        assert_eq!(ids, vec![Some(0), Some(1), Some(2)]);
        assert_eq!(agg.worker_count(), 3);
        assert!(agg.aggregate().is_aggregate());
    }
}
