//! Exact flat index honoring bitmap filters.
//!
//! A linear-scan collaborator for tests, demos and ground-truth generation.
//! It implements the full [`FilteredAnnIndex`] contract so the engine can
//! run without the wrapped external library; being exhaustive, it accepts
//! the probe-depth knob and ignores it (every candidate is always examined).

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::ann::{FilteredAnnIndex, MISSING_ID};
use crate::error::{BenchError, Result};
use crate::filtering::Bitmap;

const MAGIC: &[u8; 4] = b"CULF";
const VERSION: u32 = 1;

/// A candidate with its computed distance, for bounded top-k selection.
struct Scored {
    id: i64,
    distance: f32,
}

impl PartialEq for Scored {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance
    }
}

impl Eq for Scored {}

impl PartialOrd for Scored {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scored {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap on distance: peek() is the current worst of the k best.
        self.distance.total_cmp(&other.distance)
    }
}

/// Exact L2 index over a flat `f32` buffer.
#[derive(Debug, Default)]
pub struct FlatIndex {
    dim: usize,
    data: Vec<f32>,
    trained: bool,
}

impl FlatIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
    }

    fn check_shape(&self, vectors: &[f32], dim: usize) -> Result<()> {
        if dim == 0 {
            return Err(BenchError::InvalidParameter("dimension must be > 0".into()));
        }
        if self.dim != 0 && self.dim != dim {
            return Err(BenchError::DimensionMismatch {
                expected: self.dim,
                found: dim,
            });
        }
        if vectors.len() % dim != 0 {
            return Err(BenchError::DimensionMismatch {
                expected: dim,
                found: vectors.len() % dim,
            });
        }
        Ok(())
    }

    fn top_k(&self, query: &[f32], k: usize, filter: &Bitmap) -> Vec<(i64, f32)> {
        let mut heap: BinaryHeap<Scored> = BinaryHeap::with_capacity(k);
        for id in 0..self.ntotal() {
            if !filter.get(id) {
                continue;
            }
            let base = &self.data[id * self.dim..(id + 1) * self.dim];
            let distance = Self::l2_squared(query, base);
            if heap.len() < k {
                heap.push(Scored {
                    id: id as i64,
                    distance,
                });
            } else if distance < heap.peek().map_or(f32::INFINITY, |s| s.distance) {
                heap.pop();
                heap.push(Scored {
                    id: id as i64,
                    distance,
                });
            }
        }
        let mut results: Vec<(i64, f32)> =
            heap.into_iter().map(|s| (s.id, s.distance)).collect();
        results.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        results
    }
}

impl FilteredAnnIndex for FlatIndex {
    fn train(&mut self, vectors: &[f32], dim: usize) -> Result<()> {
        // Nothing to learn for an exhaustive scan; record the shape.
        self.check_shape(vectors, dim)?;
        self.dim = dim;
        self.trained = true;
        Ok(())
    }

    fn add(&mut self, vectors: &[f32], dim: usize) -> Result<()> {
        if !self.trained {
            return Err(BenchError::IndexNotBuilt);
        }
        self.check_shape(vectors, dim)?;
        self.data.extend_from_slice(vectors);
        Ok(())
    }

    fn ntotal(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.data.len() / self.dim
        }
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn search_filtered(
        &self,
        queries: &[f32],
        nq: usize,
        k: usize,
        _nprobe: usize,
        filter: &Bitmap,
    ) -> Result<(Vec<i64>, Vec<f32>)> {
        if !self.trained || self.ntotal() == 0 {
            return Err(BenchError::IndexNotBuilt);
        }
        if queries.len() != nq * self.dim {
            return Err(BenchError::DimensionMismatch {
                expected: nq * self.dim,
                found: queries.len(),
            });
        }

        let mut ids = vec![MISSING_ID; nq * k];
        let mut distances = vec![f32::INFINITY; nq * k];
        for row in 0..nq {
            let query = &queries[row * self.dim..(row + 1) * self.dim];
            for (j, (id, distance)) in self.top_k(query, k, filter).into_iter().enumerate() {
                ids[row * k + j] = id;
                distances[row * k + j] = distance;
            }
        }
        Ok((ids, distances))
    }

    fn save(&self, path: &Path) -> Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        w.write_all(MAGIC)?;
        w.write_u32::<LittleEndian>(VERSION)?;
        w.write_u32::<LittleEndian>(self.dim as u32)?;
        w.write_u64::<LittleEndian>(self.ntotal() as u64)?;
        for &v in &self.data {
            w.write_f32::<LittleEndian>(v)?;
        }
        w.flush()?;
        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<()> {
        let mut r = BufReader::new(File::open(path)?);
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(BenchError::IndexFormat(format!(
                "bad magic in {}",
                path.display()
            )));
        }
        let version = r.read_u32::<LittleEndian>()?;
        if version != VERSION {
            return Err(BenchError::IndexFormat(format!(
                "unsupported version {version}"
            )));
        }
        let dim = r.read_u32::<LittleEndian>()? as usize;
        let count = r.read_u64::<LittleEndian>()? as usize;
        let mut data = vec![0f32; dim * count];
        for v in &mut data {
            *v = r.read_f32::<LittleEndian>()?;
        }
        self.dim = dim;
        self.data = data;
        self.trained = true;
        Ok(())
    }
}
