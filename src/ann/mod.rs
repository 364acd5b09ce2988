//! Seam to the external ANN index.
//!
//! The engine never looks inside the index: training, insertion, probe-list
//! traversal and distance computation all belong to the wrapped library.
//! Everything the benchmark needs goes through [`FilteredAnnIndex`], which
//! also keeps the engine testable against [`FlatIndex`].

pub mod flat;

use std::path::Path;

use crate::error::Result;
use crate::filtering::Bitmap;

pub use flat::FlatIndex;

/// Sentinel id an index reports when fewer than `k` satisfying neighbors exist.
pub const MISSING_ID: i64 = -1;

/// Capability contract for the ANN index under benchmark.
///
/// `search_filtered` must be safe to call concurrently through `&self`; the
/// engine issues parallel single-row searches during the per-query strategy
/// and requires (but cannot enforce) that precondition of implementations.
pub trait FilteredAnnIndex: Send + Sync {
    /// Train index internals on the base set. Called once per dataset.
    fn train(&mut self, vectors: &[f32], dim: usize) -> Result<()>;

    /// Insert base vectors. Called once per dataset, after [`train`](Self::train).
    fn add(&mut self, vectors: &[f32], dim: usize) -> Result<()>;

    /// Number of indexed base vectors.
    fn ntotal(&self) -> usize;

    /// Vector dimensionality, 0 before the index is built or loaded.
    fn dimension(&self) -> usize;

    /// Filtered top-k search over a row-major batch of `nq` query vectors.
    ///
    /// Returns `nq * k` ids and distances, row-major, padded with
    /// [`MISSING_ID`] / `f32::INFINITY` when a row has fewer than `k`
    /// candidates passing the filter. Batch sizes 1 and > 1 must behave
    /// identically per row. `nprobe` bounds how many internal partitions
    /// are examined per query.
    fn search_filtered(
        &self,
        queries: &[f32],
        nq: usize,
        k: usize,
        nprobe: usize,
        filter: &Bitmap,
    ) -> Result<(Vec<i64>, Vec<f32>)>;

    /// Persist the built index.
    fn save(&self, path: &Path) -> Result<()>;

    /// Replace this index's state with a previously persisted one.
    fn load(&mut self, path: &Path) -> Result<()>;
}
