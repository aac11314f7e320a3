//! Exact similarity measures and retrieval scoring.
//!
//! Weighted vectors of `(position, weight)` are assumed sorted by
//! position ascending; shingle count maps need no ordering.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Sum of weights.
#[inline]
pub fn total_weight(x: &[(u64, f64)]) -> f64 {
    x.iter().map(|&(_, w)| w).sum()
}

// Intersection mass: sum of min(w_x, w_y) over shared positions.
// Requires both x and y sorted by position.
pub fn intersection(x: &[(u64, f64)], y: &[(u64, f64)]) -> f64 {
    let (mut i, mut j, mut mass) = (0usize, 0usize, 0.0);
    while i < x.len() && j < y.len() {
        match x[i].0.cmp(&y[j].0) {
            Ordering::Equal => {
                mass += x[i].1.min(y[j].1);
                i += 1;
                j += 1;
            }
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
        }
    }
    mass
}

/// Generalized Jaccard over sorted weighted vectors:
/// `sum min / sum max` over the union of positions. Two empty vectors
/// score 1.0 by convention.
#[inline]
pub fn generalized_jaccard(x: &[(u64, f64)], y: &[(u64, f64)]) -> f64 {
    let shared = intersection(x, y);
    let union = total_weight(x) + total_weight(y) - shared;
    if union == 0.0 { 1.0 } else { shared / union }
}

/// Generalized Jaccard over shingle count maps.
pub fn generalized_jaccard_counts<K: Eq + Hash>(
    a: &HashMap<K, u32>,
    b: &HashMap<K, u32>,
) -> f64 {
    let mut min_sum = 0u64;
    let mut max_sum = 0u64;
    for (key, &wa) in a {
        match b.get(key) {
            Some(&wb) => {
                min_sum += u64::from(wa.min(wb));
                max_sum += u64::from(wa.max(wb));
            }
            None => max_sum += u64::from(wa),
        }
    }
    for (key, &wb) in b {
        if !a.contains_key(key) {
            max_sum += u64::from(wb);
        }
    }
    if max_sum == 0 {
        1.0
    } else {
        min_sum as f64 / max_sum as f64
    }
}

/// Unweighted Jaccard over finite sets; 1.0 when both are empty.
pub fn jaccard<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let shared = a.intersection(b).count();
    shared as f64 / (a.len() + b.len() - shared) as f64
}

/// Precision and recall of a candidate set against ground truth.
///
/// Conventions: empty truth means perfect recall, two empty sets score
/// (1, 1), and an empty candidate set against non-empty truth has zero
/// precision.
pub fn precision_recall<T: Eq + Hash>(found: &HashSet<T>, truth: &HashSet<T>) -> (f64, f64) {
    if found.is_empty() && truth.is_empty() {
        return (1.0, 1.0);
    }
    let shared = found.intersection(truth).count() as f64;
    let precision = if found.is_empty() {
        0.0
    } else {
        shared / found.len() as f64
    };
    let recall = if truth.is_empty() {
        1.0
    } else {
        shared / truth.len() as f64
    };
    (precision, recall)
}

/// Harmonic mean of precision and recall; 0.0 when both are zero.
pub fn f_score(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}
