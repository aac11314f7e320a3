//! Sketch families: the shared identity behind comparable MinHash
//! sketches.
//!
//! A family owns the permutation table for its `(seed, n_samples)` pair
//! and the element cache that memoizes permuted vectors. Sketches hold
//! an `Arc` back to their family; any cross-sketch operation first
//! compares family descriptors and fails fast on a mismatch.

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::SketchError;
use crate::lru::LruCache;
use crate::permutation::{MAX_SAMPLES, PermutationTable};

/// Default capacity of the per-family element cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Output width of the minima stored in a sketch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashWidth {
    B32,
    B64,
}

impl HashWidth {
    /// `2^B - 1`, the initial value of every sketch slot and the
    /// truncation mask applied after the Mersenne reduction.
    #[inline]
    pub fn mask(self) -> u64 {
        match self {
            HashWidth::B32 => u32::MAX as u64,
            HashWidth::B64 => u64::MAX,
        }
    }
}

/// The value identity of a family. Two separately constructed families
/// with equal descriptors produce interchangeable sketches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilyDescriptor {
    pub seed: u64,
    pub n_samples: usize,
    pub width: HashWidth,
}

pub struct SketchFamily {
    descriptor: FamilyDescriptor,
    permutation: PermutationTable,
    cache: Mutex<LruCache<u64, Arc<[u64]>>>,
}

impl SketchFamily {
    pub fn new(
        seed: u64,
        n_samples: usize,
        width: HashWidth,
    ) -> Result<Arc<Self>, SketchError> {
        Self::with_cache_capacity(seed, n_samples, width, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_cache_capacity(
        seed: u64,
        n_samples: usize,
        width: HashWidth,
        cache_capacity: usize,
    ) -> Result<Arc<Self>, SketchError> {
        if n_samples == 0 || n_samples > MAX_SAMPLES {
            return Err(SketchError::invalid(format!(
                "n_samples {n_samples} outside 1..={MAX_SAMPLES}"
            )));
        }
        if cache_capacity == 0 {
            return Err(SketchError::invalid("cache capacity must be at least 1"));
        }
        Ok(Arc::new(SketchFamily {
            descriptor: FamilyDescriptor {
                seed,
                n_samples,
                width,
            },
            permutation: PermutationTable::generate(seed, n_samples),
            cache: Mutex::new(LruCache::new(cache_capacity)),
        }))
    }

    pub fn descriptor(&self) -> FamilyDescriptor {
        self.descriptor
    }

    pub fn n_samples(&self) -> usize {
        self.descriptor.n_samples
    }

    pub fn permutation(&self) -> &PermutationTable {
        &self.permutation
    }

    pub fn cached_elements(&self) -> usize {
        self.lock_cache().len()
    }

    /// The permuted vector for one element digest, through the cache.
    ///
    /// On a miss the vector is computed outside the lock; two racing
    /// misses both compute the same values and the later put wins,
    /// which is harmless because the vectors are equal.
    pub(crate) fn permuted(&self, digest: u64) -> Arc<[u64]> {
        if let Some(hit) = self.lock_cache().get(&digest) {
            return hit;
        }
        let mut values = vec![0u64; self.descriptor.n_samples];
        self.permutation
            .apply(digest, self.descriptor.width.mask(), &mut values);
        let vector: Arc<[u64]> = values.into();
        self.lock_cache().put(digest, vector.clone());
        vector
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, LruCache<u64, Arc<[u64]>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
