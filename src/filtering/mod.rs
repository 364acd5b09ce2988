//! Predicate-to-bitmap compilation.
//!
//! The engine restricts index traversal with a one-bit-per-base-vector mask:
//! bit `i` (byte `i >> 3`, LSB-first within the byte) is set iff base vector
//! `i` satisfies the query's predicate. Bitmaps are built fresh for every
//! predicate instance; nothing is cached across trials.

pub mod group;

use crate::error::{BenchError, Result};
use crate::predicate::{BaseLabels, Predicate};

pub use group::group_by_predicate;

/// Bit-per-base-vector filter mask, `ceil(nbits / 8)` bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    bits: Vec<u8>,
    nbits: usize,
}

impl Bitmap {
    /// All-clear bitmap covering `nbits` base vectors.
    pub fn zeros(nbits: usize) -> Self {
        Self {
            bits: vec![0u8; nbits.div_ceil(8)],
            nbits,
        }
    }

    pub fn nbits(&self) -> usize {
        self.nbits
    }

    pub fn set(&mut self, i: usize) {
        debug_assert!(i < self.nbits);
        self.bits[i >> 3] |= 1 << (i & 7);
    }

    pub fn get(&self, i: usize) -> bool {
        i < self.nbits && self.bits[i >> 3] & (1 << (i & 7)) != 0
    }

    pub fn count_ones(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Raw mask bytes, for handing to an external index.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }
}

/// Compile a predicate into a bitmap over `nb` base vectors.
///
/// The range path works byte-at-a-time: a left-aligned partial mask in the
/// byte containing `imin`, a bulk fill of every fully-covered byte, and a
/// right-aligned partial mask in the byte containing `imax`. Cost is
/// O(bytes covered), not O(range length) in bits, and the output is
/// bit-identical to setting every bit of `[imin, imax]` individually.
///
/// Bounds outside `[0, nb)` are clamped to `[0, nb - 1]`; a range with
/// `imin > imax` compiles to an all-zero mask (no candidates).
///
/// The attribute path scans the full label store once, which is O(nb) per
/// distinct predicate. Grouping queries that share a predicate exists to
/// amortize exactly this cost.
pub fn compile_bitmap(predicate: &Predicate, labels: &BaseLabels, nb: usize) -> Result<Bitmap> {
    match predicate {
        Predicate::Range { imin, imax } => Ok(compile_range(*imin, *imax, nb)),
        Predicate::Attrs(_) => {
            if labels.len() != nb {
                return Err(BenchError::LabelCountMismatch {
                    labels: labels.len(),
                    vectors: nb,
                });
            }
            let mut bitmap = Bitmap::zeros(nb);
            for (i, row) in labels.iter().enumerate() {
                if predicate.matches(i, row) {
                    bitmap.set(i);
                }
            }
            Ok(bitmap)
        }
    }
}

fn compile_range(imin: u32, imax: u32, nb: usize) -> Bitmap {
    let mut bitmap = Bitmap::zeros(nb);
    if nb == 0 || imin > imax {
        return bitmap;
    }

    let last = nb - 1;
    let lo = (imin as usize).min(last);
    let hi = (imax as usize).min(last);

    let start_byte = lo >> 3;
    let end_byte = hi >> 3;
    let lo_mask = 0xFFu8 << (lo & 7);
    let hi_mask = 0xFFu8 >> (7 - (hi & 7));

    if start_byte == end_byte {
        bitmap.bits[start_byte] |= lo_mask & hi_mask;
    } else {
        bitmap.bits[start_byte] |= lo_mask;
        bitmap.bits[start_byte + 1..end_byte].fill(0xFF);
        bitmap.bits[end_byte] |= hi_mask;
    }
    bitmap
}
