//! Predicates, queries and the base-label store.
//!
//! A predicate is a scalar constraint every returned neighbor must satisfy:
//! either a closed integer range over base-vector ordinals, or an equality
//! tuple over one or more discrete attributes attached to each base vector.
//! The two shapes are a closed set, so they live in one enum and every
//! consumer does an exhaustive case split.

use smallvec::SmallVec;

/// Attribute tuple attached to a base vector or carried by a query.
///
/// Real workloads constrain one to three attributes; inline storage avoids
/// a heap allocation per row.
pub type AttrTuple = SmallVec<[u16; 3]>;

/// Scalar filter a search result must satisfy.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Predicate {
    /// Closed range `[imin, imax]` over base-vector ordinal ids.
    Range { imin: u32, imax: u32 },
    /// Equality over one or more discrete attributes (AND semantics).
    Attrs(AttrTuple),
}

impl Predicate {
    pub fn range(imin: u32, imax: u32) -> Self {
        Self::Range { imin, imax }
    }

    pub fn attrs(values: &[u16]) -> Self {
        Self::Attrs(AttrTuple::from_slice(values))
    }

    /// Deterministic grouping key derived from the exact predicate value:
    /// `"imin_imax"` for ranges, `"a1_a2_a3"` for attribute tuples.
    ///
    /// Two value-equal predicates produce the same key; distinct predicates
    /// never collide — the `a` prefix keeps attribute keys disjoint from
    /// range keys, and the `_` separator keeps fields unambiguous.
    pub fn group_key(&self) -> String {
        match self {
            Self::Range { imin, imax } => format!("{imin}_{imax}"),
            Self::Attrs(attrs) => {
                let mut key = String::new();
                for (i, a) in attrs.iter().enumerate() {
                    if i > 0 {
                        key.push('_');
                    }
                    key.push('a');
                    key.push_str(&a.to_string());
                }
                key
            }
        }
    }

    /// Whether base vector `id` with attribute row `row` satisfies the predicate.
    pub fn matches(&self, id: usize, row: &[u16]) -> bool {
        match self {
            Self::Range { imin, imax } => {
                let id = id as u64;
                u64::from(*imin) <= id && id <= u64::from(*imax)
            }
            Self::Attrs(attrs) => {
                attrs.len() == row.len() && attrs.iter().zip(row).all(|(a, b)| a == b)
            }
        }
    }
}

/// A benchmark query: predicate plus a dense similarity vector.
///
/// Queries are produced once at load time and read-only during the run.
#[derive(Clone, Debug)]
pub struct Query {
    pub predicate: Predicate,
    pub vector: Vec<f32>,
}

impl Query {
    pub fn new(predicate: Predicate, vector: Vec<f32>) -> Self {
        Self { predicate, vector }
    }
}

/// Attribute rows for the base set, one tuple per base vector.
///
/// Range predicates never consult this store; the attribute path of the
/// bitmap compiler scans it once per distinct predicate.
#[derive(Clone, Debug, Default)]
pub struct BaseLabels {
    rows: Vec<AttrTuple>,
}

impl BaseLabels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<AttrTuple>) -> Self {
        Self { rows }
    }

    pub fn push(&mut self, row: AttrTuple) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, id: usize) -> &[u16] {
        &self.rows[id]
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttrTuple> {
        self.rows.iter()
    }
}
