//! Synthetic filtered-search benchmark.
//!
//! Builds an exact flat index over seeded clustered vectors, attaches a
//! discrete attribute to every base vector, runs a mixed range/attribute
//! query set through both execution strategies and writes the usual CSV
//! rows next to the working directory.
//!
//! ```bash
//! cargo run --bin synthetic_bench --release
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smallvec::smallvec;

use cull::ann::{FilteredAnnIndex, FlatIndex};
use cull::benchmark::{CsvReporter, Harness, SweepConfig, TrialSelection};
use cull::filtering::compile_bitmap;
use cull::predicate::{BaseLabels, Predicate, Query};
use cull::search::ExecMode;

const NB: usize = 10_000;
const DIM: usize = 32;
const NQ: usize = 200;
const K: usize = 10;
const N_CLUSTERS: usize = 16;
const SEED: u64 = 42;

fn main() -> cull::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut rng = StdRng::seed_from_u64(SEED);

    // Clustered base set, one attribute per vector (its cluster id).
    let centers: Vec<Vec<f32>> = (0..N_CLUSTERS)
        .map(|_| (0..DIM).map(|_| rng.random::<f32>()).collect())
        .collect();
    let mut base = Vec::with_capacity(NB * DIM);
    let mut labels = BaseLabels::new();
    for _ in 0..NB {
        let c = rng.random_range(0..N_CLUSTERS);
        for &x in &centers[c] {
            base.push((x + rng.random::<f32>() * 0.1).clamp(0.0, 1.0));
        }
        labels.push(smallvec![c as u16]);
    }

    let mut index = FlatIndex::new();
    index.train(&base, DIM)?;
    index.add(&base, DIM)?;

    // Mixed query set: odd queries constrain a random id window, even ones
    // constrain the cluster attribute.
    let queries: Vec<Query> = (0..NQ)
        .map(|i| {
            let vector: Vec<f32> = (0..DIM).map(|_| rng.random::<f32>()).collect();
            let predicate = if i % 2 == 1 {
                let imin = rng.random_range(0..(NB as u32 - 500));
                Predicate::range(imin, imin + 499)
            } else {
                Predicate::attrs(&[rng.random_range(0..N_CLUSTERS) as u16])
            };
            Query::new(predicate, vector)
        })
        .collect();

    // The flat index is exact, so its own filtered answers are the ground
    // truth and every sweep point should report recall 1.0.
    let mut ground_truth = Vec::with_capacity(NQ);
    for query in &queries {
        let bitmap = compile_bitmap(&query.predicate, &labels, NB)?;
        let (ids, _) = index.search_filtered(&query.vector, 1, K, 1, &bitmap)?;
        ground_truth.push(ids.iter().map(|&id| id as i32).collect::<Vec<i32>>());
    }

    for mode in [ExecMode::PerQuery, ExecMode::GroupedBatch] {
        let tag = match mode {
            ExecMode::PerQuery => "perquery",
            ExecMode::GroupedBatch => "grouped",
        };
        let mut reporter = CsvReporter::new(
            format!("synthetic_{tag}_search.csv"),
            format!("synthetic_{tag}_build.csv"),
        );

        let config = SweepConfig {
            dataset: format!("synthetic-{tag}"),
            k: K,
            thread_counts: vec![1, 4],
            probe_depths: vec![1, 8, 32],
            cycle_count: 3,
            mode,
            selection: TrialSelection::MinLatency,
        };
        let harness = Harness::new(&index, &labels, &queries, &ground_truth, config);
        let rows = harness.run(&mut reporter)?;

        println!("\n{tag}: {} sweep points", rows.len());
        println!(
            "{:>8} {:>8} {:>14} {:>10} {:>10}",
            "threads", "nprobe", "query(ms)", "qps", "recall"
        );
        for row in &rows {
            println!(
                "{:>8} {:>8} {:>14.3} {:>10.1} {:>10.4}",
                row.threads, row.nprobe, row.query_time_ms, row.qps, row.recall
            );
        }
    }

    Ok(())
}
