//! Search execution strategies.
//!
//! Two interchangeable ways to push a query set through a filtered index:
//!
//! - **Per-query**: every query independently compiles its bitmap and issues
//!   a single-row search; the loop body is distributed across a fixed-size
//!   rayon pool sized by the concurrency degree.
//! - **Grouped-batch**: queries are grouped by predicate equality; each group
//!   compiles one bitmap and issues one batched search, sequentially across
//!   groups (any parallelism lives inside the index's batched call).
//!
//! Grouping is purely a performance optimization: for a fixed index state
//! both strategies must produce identical per-query results.

use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::ann::FilteredAnnIndex;
use crate::error::{BenchError, Result};
use crate::filtering::{compile_bitmap, group_by_predicate};
use crate::predicate::{BaseLabels, Query};

/// Which execution strategy a trial uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecMode {
    PerQuery,
    GroupedBatch,
}

/// Per-trial output: one id list per query plus timing counters.
///
/// `query_time` is wall-clock for the whole trial. `filter_time` and
/// `search_time` are sums over workers (per-query) or groups (batched), so
/// under parallel execution they can exceed `query_time`.
#[derive(Clone, Debug)]
pub struct TrialOutput {
    pub results: Vec<Vec<i64>>,
    pub query_time: Duration,
    pub filter_time: Duration,
    pub search_time: Duration,
}

/// Executes one trial of a query set against a shared index.
pub struct SearchExecutor<'a> {
    index: &'a dyn FilteredAnnIndex,
    labels: &'a BaseLabels,
    k: usize,
}

impl<'a> SearchExecutor<'a> {
    pub fn new(index: &'a dyn FilteredAnnIndex, labels: &'a BaseLabels, k: usize) -> Self {
        Self { index, labels, k }
    }

    /// Run every query once and collect results plus timing counters.
    ///
    /// Fails fast on an empty query set, an un-built index, a probe depth of
    /// zero, or any query vector whose length disagrees with the index
    /// dimension. A failing trial aborts the run; there is no partial-result
    /// recovery.
    pub fn run(
        &self,
        queries: &[Query],
        nprobe: usize,
        threads: usize,
        mode: ExecMode,
    ) -> Result<TrialOutput> {
        if queries.is_empty() {
            return Err(BenchError::InvalidParameter("empty query batch".into()));
        }
        if nprobe == 0 {
            return Err(BenchError::InvalidParameter("probe depth must be > 0".into()));
        }
        if threads == 0 {
            return Err(BenchError::InvalidParameter("concurrency must be > 0".into()));
        }
        if self.index.ntotal() == 0 {
            return Err(BenchError::IndexNotBuilt);
        }
        let dim = self.index.dimension();
        for query in queries {
            if query.vector.len() != dim {
                return Err(BenchError::DimensionMismatch {
                    expected: dim,
                    found: query.vector.len(),
                });
            }
        }

        match mode {
            ExecMode::PerQuery => self.per_query(queries, nprobe, threads),
            ExecMode::GroupedBatch => self.grouped(queries, nprobe),
        }
    }

    fn per_query(&self, queries: &[Query], nprobe: usize, threads: usize) -> Result<TrialOutput> {
        let nb = self.index.ntotal();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()?;

        let mut results: Vec<Vec<i64>> = vec![Vec::new(); queries.len()];
        let started = Instant::now();

        // Timers accumulate per worker and combine once at the end of the
        // parallel region; no shared counter is touched per iteration.
        let (filter_us, search_us) = pool.install(|| {
            queries
                .par_iter()
                .zip(results.par_iter_mut())
                .try_fold(
                    || (0u64, 0u64),
                    |(filter_us, search_us), (query, slot)| -> Result<(u64, u64)> {
                        let t = Instant::now();
                        let bitmap = compile_bitmap(&query.predicate, self.labels, nb)?;
                        let filter_elapsed = t.elapsed().as_micros() as u64;

                        let t = Instant::now();
                        let (ids, _distances) = self.index.search_filtered(
                            &query.vector,
                            1,
                            self.k,
                            nprobe,
                            &bitmap,
                        )?;
                        let search_elapsed = t.elapsed().as_micros() as u64;

                        *slot = ids;
                        Ok((filter_us + filter_elapsed, search_us + search_elapsed))
                    },
                )
                .try_reduce(|| (0, 0), |a, b| Ok((a.0 + b.0, a.1 + b.1)))
        })?;

        Ok(TrialOutput {
            results,
            query_time: started.elapsed(),
            filter_time: Duration::from_micros(filter_us),
            search_time: Duration::from_micros(search_us),
        })
    }

    fn grouped(&self, queries: &[Query], nprobe: usize) -> Result<TrialOutput> {
        let nb = self.index.ntotal();
        let dim = self.index.dimension();
        let mut results: Vec<Vec<i64>> = vec![Vec::new(); queries.len()];
        let mut filter_us = 0u64;
        let mut search_us = 0u64;

        let started = Instant::now();
        let groups = group_by_predicate(queries);

        for (_key, members) in &groups {
            let nq = members.len();
            let mut batch = Vec::with_capacity(nq * dim);
            for &qi in members {
                batch.extend_from_slice(&queries[qi].vector);
            }

            let t = Instant::now();
            let bitmap = compile_bitmap(&queries[members[0]].predicate, self.labels, nb)?;
            filter_us += t.elapsed().as_micros() as u64;

            let t = Instant::now();
            let (ids, _distances) =
                self.index
                    .search_filtered(&batch, nq, self.k, nprobe, &bitmap)?;
            search_us += t.elapsed().as_micros() as u64;

            // Scatter batched rows back to each query's original position.
            for (row, &qi) in members.iter().enumerate() {
                results[qi] = ids[row * self.k..(row + 1) * self.k].to_vec();
            }
        }

        Ok(TrialOutput {
            results,
            query_time: started.elapsed(),
            filter_time: Duration::from_micros(filter_us),
            search_time: Duration::from_micros(search_us),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ann::FlatIndex;
    use crate::predicate::Predicate;

    fn small_index(nb: usize, dim: usize) -> FlatIndex {
        let data: Vec<f32> = (0..nb * dim).map(|i| (i % 17) as f32 * 0.25).collect();
        let mut index = FlatIndex::new();
        index.train(&data, dim).unwrap();
        index.add(&data, dim).unwrap();
        index
    }

    #[test]
    fn test_rejects_zero_probe_depth() {
        let index = small_index(16, 4);
        let labels = BaseLabels::new();
        let executor = SearchExecutor::new(&index, &labels, 2);
        let queries = vec![Query::new(Predicate::range(0, 15), vec![0.0; 4])];
        let err = executor
            .run(&queries, 0, 1, ExecMode::PerQuery)
            .unwrap_err();
        assert!(matches!(err, BenchError::InvalidParameter(_)));
    }

    #[test]
    fn test_rejects_empty_batch() {
        let index = small_index(16, 4);
        let labels = BaseLabels::new();
        let executor = SearchExecutor::new(&index, &labels, 2);
        let err = executor.run(&[], 1, 1, ExecMode::GroupedBatch).unwrap_err();
        assert!(matches!(err, BenchError::InvalidParameter(_)));
    }

    #[test]
    fn test_rejects_dimension_mismatch() {
        let index = small_index(16, 4);
        let labels = BaseLabels::new();
        let executor = SearchExecutor::new(&index, &labels, 2);
        let queries = vec![Query::new(Predicate::range(0, 15), vec![0.0; 3])];
        let err = executor
            .run(&queries, 1, 1, ExecMode::PerQuery)
            .unwrap_err();
        assert!(matches!(err, BenchError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_rejects_unbuilt_index() {
        let index = FlatIndex::new();
        let labels = BaseLabels::new();
        let executor = SearchExecutor::new(&index, &labels, 2);
        let queries = vec![Query::new(Predicate::range(0, 15), vec![0.0; 4])];
        let err = executor
            .run(&queries, 1, 1, ExecMode::PerQuery)
            .unwrap_err();
        assert!(matches!(err, BenchError::IndexNotBuilt));
    }

    #[test]
    fn test_results_keep_query_order() {
        let index = small_index(64, 4);
        let labels = BaseLabels::new();
        let executor = SearchExecutor::new(&index, &labels, 1);
        // Singleton ranges pin each query's only possible answer.
        let queries: Vec<Query> = (0..8u32)
            .map(|i| Query::new(Predicate::range(i, i), vec![0.0; 4]))
            .collect();

        for mode in [ExecMode::PerQuery, ExecMode::GroupedBatch] {
            let output = executor.run(&queries, 1, 4, mode).unwrap();
            for (i, ids) in output.results.iter().enumerate() {
                assert_eq!(ids, &vec![i as i64], "mode {mode:?}");
            }
        }
    }
}
