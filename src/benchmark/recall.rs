//! Recall scoring against ground truth.

use std::collections::HashSet;

/// Micro-averaged recall@k over a result set.
///
/// For each query the true-positive set is the ground-truth prefix up to the
/// first `-1` sentinel or `k` entries, whichever comes first. Every non-`-1`
/// result id found in that set counts as correct, each truth id at most once
/// per query, so per-query hits never exceed the set size. The score is
/// `sum(correct) / sum(|true-positive set|)` across all queries; a dataset
/// with zero total true positives scores 0.0 by convention.
pub fn micro_recall(results: &[Vec<i64>], ground_truth: &[Vec<i32>], k: usize) -> f32 {
    let mut correct = 0usize;
    let mut total = 0usize;

    for (result, truth) in results.iter().zip(ground_truth) {
        let mut truth_set: HashSet<i64> = truth
            .iter()
            .take(k)
            .take_while(|&&id| id != -1)
            .map(|&id| i64::from(id))
            .collect();
        total += truth_set.len();

        correct += result
            .iter()
            .filter(|&&id| id != -1 && truth_set.remove(&id))
            .count();
    }

    if total == 0 {
        0.0
    } else {
        correct as f32 / total as f32
    }
}
