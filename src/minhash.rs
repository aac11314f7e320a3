//! MinHash sketches over a shared family.
//!
//! A sketch is a vector of `n_samples` minima, one per hash of the
//! family. Updates only ever lower slots, so feeding the same token
//! twice or permuting the token order cannot change the result. The
//! fraction of equal slots between two sketches estimates the Jaccard
//! similarity of the underlying sets.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::SketchError;
use crate::family::{FamilyDescriptor, SketchFamily};
use crate::hashing;

#[derive(Clone)]
pub struct MinHash {
    family: Arc<SketchFamily>,
    values: Vec<u64>,
}

impl MinHash {
    /// An empty sketch; every slot starts at the family's width mask.
    pub fn new(family: Arc<SketchFamily>) -> Self {
        let values = vec![family.descriptor().width.mask(); family.n_samples()];
        MinHash { family, values }
    }

    pub fn family(&self) -> FamilyDescriptor {
        self.family.descriptor()
    }

    pub fn values(&self) -> &[u64] {
        &self.values
    }

    /// Fold one pre-hashed element into the minima.
    pub fn update_digest(&mut self, digest: u64) {
        let permuted = self.family.permuted(digest);
        for (slot, &candidate) in self.values.iter_mut().zip(permuted.iter()) {
            if candidate < *slot {
                *slot = candidate;
            }
        }
    }

    /// Fold one raw token.
    pub fn update_bytes(&mut self, token: &[u8]) {
        self.update_digest(hashing::digest64(token));
    }

    /// Fold a text shingle map. Multiplicities do not move minima, so
    /// each distinct shingle is hashed once.
    pub fn update_text_shingles(&mut self, shingles: &HashMap<&[u8], u32>) {
        for token in shingles.keys() {
            self.update_bytes(token);
        }
    }

    /// Fold a weighted DNA shingle map. Packed shingles are their own
    /// digests, so they skip byte hashing entirely.
    pub fn update_dna_shingles(&mut self, shingles: &HashMap<u64, u32>) {
        for &packed in shingles.keys() {
            self.update_digest(packed);
        }
    }

    /// Fold an unweighted DNA shingle set.
    pub fn update_dna_set(&mut self, shingles: &HashSet<u64>) {
        for &packed in shingles {
            self.update_digest(packed);
        }
    }

    /// Fraction of slots where both sketches hold the same minimum.
    pub fn estimate_jaccard(&self, other: &MinHash) -> Result<f64, SketchError> {
        if self.family() != other.family() {
            return Err(SketchError::mismatch(format!(
                "cannot compare sketches from {:?} and {:?}",
                self.family(),
                other.family()
            )));
        }
        let matching = self
            .values
            .iter()
            .zip(&other.values)
            .filter(|(a, b)| a == b)
            .count();
        Ok(matching as f64 / self.values.len() as f64)
    }
}
