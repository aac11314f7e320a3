//! lshsketch: approximate set-similarity search over short sequences
//! (DNA reads, text documents) with probabilistic sketches and a banded
//! LSH candidate index.
//!
//! Main items:
//! - [`family::SketchFamily`] + [`minhash::MinHash`] : n-permutation
//!   MinHash over the 2^61 - 1 Mersenne field, with a per-family LRU
//!   cache of permuted element vectors
//! - [`weighted::WeightedFamily`] + [`weighted::WeightedMinHash`] :
//!   consistent weighted sampling for multisets, with lazily
//!   materialized parameter rows
//! - [`lsh::LshIndex`] : banded candidate index with error-weighted
//!   `(b, r)` optimization
//! - [`pipeline`] : all-pairs near-duplicate detection over reads or
//!   documents
//!
//! Tokens come from [`shingle`] (borrowed text k-shingles) or [`dna`]
//! (2-bit packed k-mers that double as their own hashes).

pub mod config;
pub mod dna;
pub mod error;
pub mod family;
pub mod hashing;
pub mod integrate;
pub mod io;
pub mod lru;
pub mod lsh;
pub mod minhash;
pub mod permutation;
pub mod pipeline;
pub mod rng;
pub mod shingle;
pub mod similarity;
pub mod stats;
pub mod weighted;

pub use crate::config::PipelineConfig;
pub use crate::dna::{
    NonAcgtPolicy, decode_shingle, dna_shingles, dna_shingles_weighted, encode_shingle,
};
pub use crate::error::SketchError;
pub use crate::family::{DEFAULT_CACHE_CAPACITY, FamilyDescriptor, HashWidth, SketchFamily};
pub use crate::io::NeighborRecord;
pub use crate::lsh::{LshIndex, LshParams, optimal_params};
pub use crate::minhash::MinHash;
pub use crate::pipeline::{
    dna_near_duplicates, near_duplicates, near_duplicates_linear_scan, text_near_duplicates,
};
pub use crate::shingle::shingle_text;
pub use crate::similarity::{
    f_score, generalized_jaccard, generalized_jaccard_counts, jaccard, precision_recall,
};
pub use crate::weighted::{WeightedFamily, WeightedMinHash};
