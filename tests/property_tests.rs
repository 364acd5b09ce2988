//! Property-based tests for the filtering and scoring components.
//!
//! These verify invariants that must hold regardless of input:
//! - Range bitmaps are bit-identical to a naive per-bit reference
//! - Grouping always partitions the query set
//! - Recall stays in [0, 1] and is 1.0 against itself

use proptest::prelude::*;

use cull::benchmark::micro_recall;
use cull::filtering::{compile_bitmap, group_by_predicate, Bitmap};
use cull::predicate::{BaseLabels, Predicate, Query};

/// Set-every-bit reference the fast range path must match exactly.
fn naive_range_bitmap(imin: u32, imax: u32, nb: usize) -> Bitmap {
    let mut bitmap = Bitmap::zeros(nb);
    if nb == 0 || imin > imax {
        return bitmap;
    }
    let lo = (imin as usize).min(nb - 1);
    let hi = (imax as usize).min(nb - 1);
    for i in lo..=hi {
        bitmap.set(i);
    }
    bitmap
}

mod bitmap_props {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn range_bitmap_matches_naive_reference(
            nb in 1usize..2048,
            imin in 0u32..3000,
            imax in 0u32..3000,
        ) {
            let labels = BaseLabels::new();
            let fast = compile_bitmap(&Predicate::range(imin, imax), &labels, nb).unwrap();
            let slow = naive_range_bitmap(imin, imax, nb);
            prop_assert_eq!(fast, slow);
        }

        #[test]
        fn range_bitmap_bits_follow_the_interval(
            nb in 1usize..512,
            imin in 0u32..512,
            width in 0u32..512,
        ) {
            let imax = imin.saturating_add(width);
            let labels = BaseLabels::new();
            let bitmap = compile_bitmap(&Predicate::range(imin, imax), &labels, nb).unwrap();

            let lo = (imin as usize).min(nb - 1);
            let hi = (imax as usize).min(nb - 1);
            for i in 0..nb {
                prop_assert_eq!(bitmap.get(i), lo <= i && i <= hi, "bit {}", i);
            }
        }

        #[test]
        fn inverted_range_is_all_clear(
            nb in 1usize..512,
            imax in 0u32..500,
            gap in 1u32..100,
        ) {
            let imin = imax + gap;
            let labels = BaseLabels::new();
            let bitmap = compile_bitmap(&Predicate::range(imin, imax), &labels, nb).unwrap();
            prop_assert_eq!(bitmap.count_ones(), 0);
        }
    }
}

mod grouping_props {
    use super::*;

    fn arb_predicate() -> impl Strategy<Value = Predicate> {
        prop_oneof![
            (0u32..100, 0u32..100).prop_map(|(a, b)| Predicate::range(a, b)),
            prop::collection::vec(0u16..8, 1..3).prop_map(|v| Predicate::attrs(&v)),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn groups_partition_the_query_set(
            predicates in prop::collection::vec(arb_predicate(), 0..64),
        ) {
            let queries: Vec<Query> = predicates
                .iter()
                .map(|p| Query::new(p.clone(), vec![0.0; 2]))
                .collect();
            let groups = group_by_predicate(&queries);

            let mut seen: Vec<usize> = groups.iter().flat_map(|(_, g)| g.clone()).collect();
            seen.sort_unstable();
            let expected: Vec<usize> = (0..queries.len()).collect();
            prop_assert_eq!(seen, expected, "groups must cover each query exactly once");

            // Same group iff value-equal predicates.
            for (_, members) in &groups {
                for window in members.windows(2) {
                    prop_assert_eq!(
                        &queries[window[0]].predicate,
                        &queries[window[1]].predicate
                    );
                }
            }
            for pair in groups.windows(2) {
                prop_assert_ne!(
                    &queries[pair[0].1[0]].predicate,
                    &queries[pair[1].1[0]].predicate
                );
            }
        }
    }
}

mod recall_props {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn recall_stays_in_unit_interval(
            results in prop::collection::vec(
                prop::collection::vec(-1i64..50, 0..10), 1..20),
            truth in prop::collection::vec(
                prop::collection::vec(-1i32..50, 0..10), 1..20),
            k in 1usize..10,
        ) {
            let n = results.len().min(truth.len());
            let recall = micro_recall(&results[..n], &truth[..n], k);
            prop_assert!((0.0..=1.0).contains(&recall), "recall {}", recall);
        }

        #[test]
        fn recall_against_own_results_is_one(
            rows in prop::collection::vec(
                prop::collection::vec(0i64..1000, 1..10), 1..20),
        ) {
            // Deduplicate within rows so counted hits cannot exceed set size.
            let results: Vec<Vec<i64>> = rows
                .iter()
                .map(|r| {
                    let mut r = r.clone();
                    r.sort_unstable();
                    r.dedup();
                    r
                })
                .collect();
            let truth: Vec<Vec<i32>> = results
                .iter()
                .map(|r| r.iter().map(|&id| id as i32).collect())
                .collect();
            let k = results.iter().map(Vec::len).max().unwrap_or(1);
            let recall = micro_recall(&results, &truth, k);
            prop_assert!((recall - 1.0).abs() < 1e-6, "self recall {}", recall);
        }
    }
}
