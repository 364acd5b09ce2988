//! Grouping queries by predicate equality.
//!
//! The grouped-batch strategy compiles one bitmap per distinct predicate and
//! issues one batched index call per group, so the O(nb) attribute scan is
//! paid once per group instead of once per query.

use std::collections::BTreeMap;

use crate::predicate::Query;

/// Partition a query set into groups sharing a value-equal predicate.
///
/// Returns `(key, indices)` pairs sorted by key. Every query index appears
/// in exactly one group, indices within a group keep query order, and two
/// queries land in the same group iff their predicates are value-equal.
pub fn group_by_predicate(queries: &[Query]) -> Vec<(String, Vec<usize>)> {
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, query) in queries.iter().enumerate() {
        groups.entry(query.predicate.group_key()).or_default().push(i);
    }
    groups.into_iter().collect()
}
