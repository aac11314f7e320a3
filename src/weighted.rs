//! Weighted MinHash by improved consistent weighted sampling.
//!
//! Each sample draws, for every universe position, a parameter triple
//! `(r, ln_c, beta)` with `r, c ~ Gamma(2,1)` and `beta ~ Uniform(0,1)`.
//! A sketch keeps, per sample, the position minimizing `ln_a` together
//! with the integer quantization `t` at that position. Two sketches
//! agree at a sample with probability equal to the generalized Jaccard
//! of their weight vectors, so the fraction of matching `(k*, t*)`
//! pairs is the estimator.
//!
//! Parameter rows materialize lazily: a row exists only for positions
//! some input has actually contained, which keeps memory proportional
//! to observed positions instead of the universe size. Row content is a
//! pure function of `(family seed, position)`, so sketches agree no
//! matter in which order positions were first seen.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::SketchError;
use crate::rng::{MtRng, gamma_2_1, mt_from_seed_pair};

struct ParamRow {
    r: Box<[f64]>,
    ln_c: Box<[f64]>,
    beta: Box<[f64]>,
}

fn materialize_row(seed: u64, position: u64, n_samples: usize) -> ParamRow {
    let mut rng: MtRng = mt_from_seed_pair(seed, position);
    let mut r = Vec::with_capacity(n_samples);
    let mut ln_c = Vec::with_capacity(n_samples);
    let mut beta = Vec::with_capacity(n_samples);
    for _ in 0..n_samples {
        r.push(gamma_2_1(&mut rng));
        ln_c.push(gamma_2_1(&mut rng).ln());
        beta.push(mt19937::gen_res53(&mut rng));
    }
    ParamRow {
        r: r.into_boxed_slice(),
        ln_c: ln_c.into_boxed_slice(),
        beta: beta.into_boxed_slice(),
    }
}

struct RowStore {
    index: HashMap<u64, usize>,
    rows: Vec<Arc<ParamRow>>,
}

/// Shared identity of comparable weighted sketches. Owns the lazily
/// grown parameter rows; append-only, first write wins per position.
pub struct WeightedFamily {
    seed: u64,
    n_samples: usize,
    max_rows: Option<usize>,
    store: Mutex<RowStore>,
}

impl WeightedFamily {
    pub fn new(seed: u64, n_samples: usize) -> Result<Arc<Self>, SketchError> {
        Self::build(seed, n_samples, None)
    }

    /// Like [`WeightedFamily::new`] with a hard cap on materialized
    /// rows; exceeding it fails the offending update with
    /// `ResourceExhausted`.
    pub fn with_row_cap(
        seed: u64,
        n_samples: usize,
        max_rows: usize,
    ) -> Result<Arc<Self>, SketchError> {
        Self::build(seed, n_samples, Some(max_rows))
    }

    fn build(
        seed: u64,
        n_samples: usize,
        max_rows: Option<usize>,
    ) -> Result<Arc<Self>, SketchError> {
        if n_samples == 0 {
            return Err(SketchError::invalid("n_samples must be at least 1"));
        }
        if max_rows == Some(0) {
            return Err(SketchError::invalid("row cap must be at least 1"));
        }
        Ok(Arc::new(WeightedFamily {
            seed,
            n_samples,
            max_rows,
            store: Mutex::new(RowStore {
                index: HashMap::new(),
                rows: Vec::new(),
            }),
        }))
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Number of universe positions seen so far.
    pub fn materialized_rows(&self) -> usize {
        self.lock_store().rows.len()
    }

    /// Rows for the given active positions, materializing unseen ones.
    fn gather(&self, active: &[(u64, f64)]) -> Result<Vec<Arc<ParamRow>>, SketchError> {
        let mut store = self.lock_store();
        let mut gathered = Vec::with_capacity(active.len());
        for &(position, _) in active {
            let row = match store.index.get(&position).copied() {
                Some(slot) => store.rows[slot].clone(),
                None => {
                    if let Some(cap) = self.max_rows {
                        if store.rows.len() == cap {
                            return Err(SketchError::ResourceExhausted {
                                reason: format!(
                                    "parameter matrix capped at {cap} rows; \
                                     position {position} would exceed it"
                                ),
                            });
                        }
                    }
                    let row = Arc::new(materialize_row(self.seed, position, self.n_samples));
                    let slot = store.rows.len();
                    store.index.insert(position, slot);
                    store.rows.push(row.clone());
                    row
                }
            };
            gathered.push(row);
        }
        Ok(gathered)
    }

    fn lock_store(&self) -> std::sync::MutexGuard<'_, RowStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct WeightedMinHash {
    family: Arc<WeightedFamily>,
    samples: Vec<(u64, i32)>,
    initialized: bool,
}

impl WeightedMinHash {
    pub fn new(family: Arc<WeightedFamily>) -> Self {
        let samples = vec![(0, 0); family.n_samples()];
        WeightedMinHash {
            family,
            samples,
            initialized: false,
        }
    }

    /// Sketch one weighted vector of `(position, weight)` entries.
    ///
    /// Positions must be distinct; zero and negative weights are
    /// dropped. A vector with no positive weight is rejected and the
    /// sketch keeps its previous content.
    pub fn update(&mut self, weighted: &[(u64, f64)]) -> Result<(), SketchError> {
        let active: Vec<(u64, f64)> = weighted
            .iter()
            .copied()
            .filter(|&(_, weight)| weight > 0.0)
            .collect();
        if active.is_empty() {
            return Err(SketchError::EmptyInput);
        }
        let rows = self.family.gather(&active)?;
        for i in 0..self.family.n_samples() {
            let mut best_ln_a = f64::INFINITY;
            let mut best = (0u64, 0i32);
            for (&(position, weight), row) in active.iter().zip(&rows) {
                let t = (weight.ln() / row.r[i] + row.beta[i]).floor();
                let ln_y = (t - row.beta[i]) * row.r[i];
                let ln_a = row.ln_c[i] - ln_y - row.r[i];
                if ln_a < best_ln_a {
                    best_ln_a = ln_a;
                    best = (position, t as i32);
                }
            }
            self.samples[i] = best;
        }
        self.initialized = true;
        Ok(())
    }

    /// Sketch an integer-weighted shingle map.
    pub fn update_counts(&mut self, counts: &HashMap<u64, u32>) -> Result<(), SketchError> {
        let weighted: Vec<(u64, f64)> = counts
            .iter()
            .map(|(&position, &count)| (position, f64::from(count)))
            .collect();
        self.update(&weighted)
    }

    /// The `(k*, t*)` pairs, one per sample.
    pub fn samples(&self) -> &[(u64, i32)] {
        &self.samples
    }

    /// Fraction of samples where both `(k*, t*)` pairs match.
    pub fn estimate_jaccard(&self, other: &WeightedMinHash) -> Result<f64, SketchError> {
        if self.family.seed() != other.family.seed()
            || self.family.n_samples() != other.family.n_samples()
        {
            return Err(SketchError::mismatch(format!(
                "cannot compare weighted sketches from (seed {}, n {}) and (seed {}, n {})",
                self.family.seed(),
                self.family.n_samples(),
                other.family.seed(),
                other.family.n_samples()
            )));
        }
        if !self.initialized || !other.initialized {
            return Err(SketchError::EmptyInput);
        }
        let matching = self
            .samples
            .iter()
            .zip(&other.samples)
            .filter(|(a, b)| a == b)
            .count();
        Ok(matching as f64 / self.samples.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::mt_from_seed;
    use crate::similarity::generalized_jaccard;
    use rand_core::RngCore;

    fn sketch(family: &Arc<WeightedFamily>, weighted: &[(u64, f64)]) -> WeightedMinHash {
        let mut wmh = WeightedMinHash::new(family.clone());
        wmh.update(weighted).unwrap();
        wmh
    }

    #[test]
    fn identical_vectors_match_everywhere() {
        let family = WeightedFamily::new(1, 128).unwrap();
        let x = [(0u64, 3.0), (1, 2.0), (2, 1.0), (7, 4.5)];
        let a = sketch(&family, &x);
        let b = sketch(&family, &x);
        assert_eq!(a.samples(), b.samples());
        assert_eq!(a.estimate_jaccard(&b).unwrap(), 1.0);
    }

    #[test]
    fn estimate_tracks_generalized_jaccard() {
        let family = WeightedFamily::new(1, 256).unwrap();
        let x = [
            (0u64, 3.0),
            (1, 2.0),
            (2, 1.0),
            (4, 4.0),
            (10, 3.0),
            (15, 5.0),
            (6, 4.0),
        ];
        let y = [
            (0u64, 2.0),
            (1, 3.0),
            (3, 1.0),
            (10, 5.0),
            (5, 3.0),
            (15, 2.0),
            (12, 9.0),
        ];
        let mut xs = x.to_vec();
        let mut ys = y.to_vec();
        xs.sort_by_key(|p| p.0);
        ys.sort_by_key(|p| p.0);
        let exact = generalized_jaccard(&xs, &ys);
        let estimate = sketch(&family, &x).estimate_jaccard(&sketch(&family, &y)).unwrap();
        assert!(
            (estimate - exact).abs() < 0.15,
            "estimate {estimate} strays from exact {exact}"
        );
    }

    #[test]
    fn estimate_tracks_jaccard_on_random_vectors() {
        let mut rng = mt_from_seed(1337);
        let family = WeightedFamily::new(7, 256).unwrap();
        // Overlapping weights over a small universe.
        let x: Vec<(u64, f64)> = (0..40)
            .map(|p| (p, 1.0 + (rng.next_u64() % 8) as f64))
            .collect();
        let y: Vec<(u64, f64)> = (20..60)
            .map(|p| (p, 1.0 + (rng.next_u64() % 8) as f64))
            .collect();
        let exact = generalized_jaccard(&x, &y);
        let estimate = sketch(&family, &x).estimate_jaccard(&sketch(&family, &y)).unwrap();
        assert!(
            (estimate - exact).abs() < 0.15,
            "estimate {estimate} strays from exact {exact}"
        );
    }

    #[test]
    fn observation_order_does_not_change_sketches() {
        let x = [(3u64, 2.0), (100, 1.5), (7, 4.0)];
        let y = [(100u64, 1.5), (9, 2.5), (3, 2.0)];

        let forward = WeightedFamily::new(5, 64).unwrap();
        let a_fwd = sketch(&forward, &x);
        let b_fwd = sketch(&forward, &y);

        // A second family sees the vectors in the opposite order.
        let backward = WeightedFamily::new(5, 64).unwrap();
        let b_bwd = sketch(&backward, &y);
        let a_bwd = sketch(&backward, &x);

        assert_eq!(a_fwd.samples(), a_bwd.samples());
        assert_eq!(b_fwd.samples(), b_bwd.samples());
        assert_eq!(
            a_fwd.estimate_jaccard(&b_fwd).unwrap(),
            a_bwd.estimate_jaccard(&b_bwd).unwrap()
        );
    }

    #[test]
    fn zero_weights_are_dropped_and_all_zero_fails() {
        let family = WeightedFamily::new(2, 64).unwrap();
        let mixed = sketch(&family, &[(0u64, 2.0), (1, 0.0), (2, 3.0)]);
        let trimmed = sketch(&family, &[(0u64, 2.0), (2, 3.0)]);
        assert_eq!(mixed.samples(), trimmed.samples());

        let mut wmh = WeightedMinHash::new(family.clone());
        assert!(matches!(
            wmh.update(&[(0u64, 0.0), (1, 0.0)]),
            Err(SketchError::EmptyInput)
        ));
        assert!(matches!(wmh.update(&[]), Err(SketchError::EmptyInput)));
        // The failed updates must not make the sketch comparable.
        assert!(matches!(
            wmh.estimate_jaccard(&mixed),
            Err(SketchError::EmptyInput)
        ));
    }

    #[test]
    fn failed_update_keeps_previous_samples() {
        let family = WeightedFamily::new(2, 64).unwrap();
        let mut wmh = sketch(&family, &[(0u64, 1.0), (1, 2.0)]);
        let before = wmh.samples().to_vec();
        assert!(wmh.update(&[(5u64, 0.0)]).is_err());
        assert_eq!(wmh.samples(), &before[..]);
    }

    #[test]
    fn row_cap_is_enforced() {
        let family = WeightedFamily::with_row_cap(1, 32, 2).unwrap();
        let mut wmh = WeightedMinHash::new(family.clone());
        wmh.update(&[(0u64, 1.0), (1, 1.0)]).unwrap();
        assert_eq!(family.materialized_rows(), 2);
        // Known positions keep working at the cap.
        wmh.update(&[(0u64, 2.0)]).unwrap();
        let err = wmh.update(&[(0u64, 1.0), (9, 1.0)]);
        assert!(matches!(err, Err(SketchError::ResourceExhausted { .. })));
        assert_eq!(family.materialized_rows(), 2);
    }

    #[test]
    fn update_counts_matches_plain_update() {
        let family = WeightedFamily::new(3, 64).unwrap();
        let mut counts = HashMap::new();
        counts.insert(4u64, 3u32);
        counts.insert(9, 1);
        let mut from_counts = WeightedMinHash::new(family.clone());
        from_counts.update_counts(&counts).unwrap();
        let direct = sketch(&family, &[(4u64, 3.0), (9, 1.0)]);
        assert_eq!(from_counts.samples(), direct.samples());
    }

    #[test]
    fn cross_family_comparison_fails_fast() {
        let a = sketch(&WeightedFamily::new(1, 64).unwrap(), &[(0u64, 1.0)]);
        let b = sketch(&WeightedFamily::new(2, 64).unwrap(), &[(0u64, 1.0)]);
        let c = sketch(&WeightedFamily::new(1, 32).unwrap(), &[(0u64, 1.0)]);
        assert!(matches!(
            a.estimate_jaccard(&b),
            Err(SketchError::FamilyMismatch { .. })
        ));
        assert!(matches!(
            a.estimate_jaccard(&c),
            Err(SketchError::FamilyMismatch { .. })
        ));
    }
}
