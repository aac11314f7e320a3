//! Banded LSH over MinHash sketches.
//!
//! A sketch of `n` rows splits into `b` bands of `r` rows each
//! (`b * r <= n`). Each band hashes its rows to a 64-bit key; sketches
//! colliding in at least one band become candidates. With row agreement
//! `s`, the collision probability is `1 - (1 - s^r)^b`, and `(b, r)`
//! are chosen to minimize the weighted area between that curve and the
//! ideal step at the threshold.
//!
//! The index deliberately over-returns: callers filter candidates by
//! re-estimating similarity against the threshold.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::error::SketchError;
use crate::family::FamilyDescriptor;
use crate::hashing::band_digest;
use crate::integrate::integrate;
use crate::minhash::MinHash;

const INTEGRATION_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LshParams {
    pub bands: usize,
    pub rows: usize,
}

fn check_threshold_and_weights(
    threshold: f64,
    weights: (f64, f64),
) -> Result<(), SketchError> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(SketchError::invalid(format!(
            "threshold {threshold} outside [0, 1]"
        )));
    }
    let (w_fp, w_fn) = weights;
    if w_fp < 0.0 || w_fn < 0.0 || (w_fp + w_fn - 1.0).abs() > 1e-9 {
        return Err(SketchError::invalid(format!(
            "weights ({w_fp}, {w_fn}) must be non-negative and sum to 1"
        )));
    }
    Ok(())
}

/// Probability mass of false positives below the threshold.
fn false_positive_area(threshold: f64, bands: i32, rows: i32) -> f64 {
    integrate(
        |s: f64| 1.0 - (1.0 - s.powi(rows)).powi(bands),
        0.0,
        threshold,
        INTEGRATION_TOLERANCE,
    )
}

/// Probability mass of false negatives above the threshold.
fn false_negative_area(threshold: f64, bands: i32, rows: i32) -> f64 {
    integrate(
        |s: f64| (1.0 - s.powi(rows)).powi(bands),
        threshold,
        1.0,
        INTEGRATION_TOLERANCE,
    )
}

/// Enumerate the feasible `(b, r)` grid and keep the minimizer of the
/// weighted error. Ties break toward fewer bands, so equal-error
/// configurations prefer the cheaper index.
pub fn optimal_params(
    threshold: f64,
    n_samples: usize,
    weights: (f64, f64),
) -> Result<LshParams, SketchError> {
    check_threshold_and_weights(threshold, weights)?;
    if n_samples == 0 {
        return Err(SketchError::invalid("n_samples must be at least 1"));
    }
    let (w_fp, w_fn) = weights;
    let mut best = LshParams { bands: 1, rows: 1 };
    let mut best_error = f64::INFINITY;
    for bands in 1..=n_samples {
        for rows in 1..=(n_samples / bands) {
            let error = w_fp * false_positive_area(threshold, bands as i32, rows as i32)
                + w_fn * false_negative_area(threshold, bands as i32, rows as i32);
            if error < best_error {
                best_error = error;
                best = LshParams { bands, rows };
            }
        }
    }
    Ok(best)
}

/// Band-keyed candidate index over MinHash sketches.
///
/// Labels are whatever the caller uses to identify items; repeated
/// inserts of the same label are no-ops.
pub struct LshIndex<L> {
    params: LshParams,
    family: FamilyDescriptor,
    tables: Vec<HashMap<u64, Vec<L>>>,
    inserted: HashSet<L>,
}

impl<L: Eq + Hash + Clone> LshIndex<L> {
    /// Build with optimizer-chosen `(b, r)`.
    pub fn new(
        threshold: f64,
        weights: (f64, f64),
        family: FamilyDescriptor,
    ) -> Result<Self, SketchError> {
        let params = optimal_params(threshold, family.n_samples, weights)?;
        Ok(Self::assemble(params, family))
    }

    /// Build with explicit `(b, r)`, validated against the sketch
    /// length.
    pub fn with_params(
        params: LshParams,
        family: FamilyDescriptor,
    ) -> Result<Self, SketchError> {
        if params.bands == 0 || params.rows == 0 {
            return Err(SketchError::invalid(
                "bands and rows must both be at least 1",
            ));
        }
        if params.bands * params.rows > family.n_samples {
            return Err(SketchError::invalid(format!(
                "bands {} * rows {} exceeds sketch length {}",
                params.bands, params.rows, family.n_samples
            )));
        }
        Ok(Self::assemble(params, family))
    }

    fn assemble(params: LshParams, family: FamilyDescriptor) -> Self {
        LshIndex {
            params,
            family,
            tables: (0..params.bands).map(|_| HashMap::new()).collect(),
            inserted: HashSet::new(),
        }
    }

    pub fn params(&self) -> LshParams {
        self.params
    }

    pub fn family(&self) -> FamilyDescriptor {
        self.family
    }

    pub fn len(&self) -> usize {
        self.inserted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty()
    }

    pub fn contains(&self, label: &L) -> bool {
        self.inserted.contains(label)
    }

    /// Band keys of a sketch, or a family error before anything is
    /// touched. Computing all keys up front is what makes inserts
    /// all-or-nothing.
    fn band_keys(&self, sketch: &MinHash) -> Result<Vec<u64>, SketchError> {
        if sketch.family() != self.family {
            return Err(SketchError::mismatch(format!(
                "index built for {:?} queried with a sketch from {:?}",
                self.family,
                sketch.family()
            )));
        }
        let values = sketch.values();
        let rows = self.params.rows;
        Ok((0..self.params.bands)
            .map(|band| band_digest(&values[band * rows..(band + 1) * rows]))
            .collect())
    }

    fn append(&mut self, keys: &[u64], label: &L) {
        for (table, &key) in self.tables.iter_mut().zip(keys) {
            table.entry(key).or_default().push(label.clone());
        }
    }

    fn collect(&self, keys: &[u64]) -> HashSet<L> {
        let mut candidates = HashSet::new();
        for (table, key) in self.tables.iter().zip(keys) {
            if let Some(bucket) = table.get(key) {
                candidates.extend(bucket.iter().cloned());
            }
        }
        candidates
    }

    pub fn insert(&mut self, sketch: &MinHash, label: L) -> Result<(), SketchError> {
        let keys = self.band_keys(sketch)?;
        if !self.inserted.insert(label.clone()) {
            return Ok(());
        }
        self.append(&keys, &label);
        Ok(())
    }

    /// Every label sharing at least one band key with the query.
    pub fn query(&self, sketch: &MinHash) -> Result<HashSet<L>, SketchError> {
        let keys = self.band_keys(sketch)?;
        Ok(self.collect(&keys))
    }

    /// Query first, then insert, in one pass over the band keys. The
    /// result never contains `label` itself.
    pub fn query_then_insert(
        &mut self,
        sketch: &MinHash,
        label: L,
    ) -> Result<HashSet<L>, SketchError> {
        let keys = self.band_keys(sketch)?;
        let candidates = self.collect(&keys);
        if self.inserted.insert(label.clone()) {
            self.append(&keys, &label);
        }
        Ok(candidates)
    }
}
