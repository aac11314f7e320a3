//! End-to-end near-duplicate detection: shingle, sketch, index, filter.
//!
//! The all-pairs flow feeds every sketch through `query_then_insert`,
//! so each item is compared only against the items before it and the
//! result for label `i` lists neighbors with labels below `i`. LSH
//! candidates are then filtered by re-estimated similarity against the
//! threshold, which removes band-collision false positives.

use std::sync::Arc;

use log::{debug, info};

use crate::config::PipelineConfig;
use crate::dna::dna_shingles_weighted;
use crate::error::SketchError;
use crate::family::SketchFamily;
use crate::io::NeighborRecord;
use crate::lsh::{LshIndex, LshParams};
use crate::minhash::MinHash;
use crate::shingle::shingle_text;
use crate::stats::{mean, quantile};
use crate::weighted::{WeightedFamily, WeightedMinHash};

fn family_for(config: &PipelineConfig) -> Result<Arc<SketchFamily>, SketchError> {
    SketchFamily::with_cache_capacity(
        config.seed,
        config.n_samples,
        config.width,
        config.cache_capacity,
    )
}

/// Sketch one text document per input string.
pub fn sketch_text_documents(
    documents: &[String],
    config: &PipelineConfig,
) -> Result<Vec<MinHash>, SketchError> {
    config.validate()?;
    let family = family_for(config)?;
    let mut sketches = Vec::with_capacity(documents.len());
    for document in documents {
        let shingles = shingle_text(document.as_bytes(), config.shingle_len)?;
        let mut sketch = MinHash::new(family.clone());
        sketch.update_text_shingles(&shingles);
        sketches.push(sketch);
    }
    info!(
        "sketched {} text documents at k={} n={}",
        documents.len(),
        config.shingle_len,
        config.n_samples
    );
    Ok(sketches)
}

/// Sketch one DNA read per input string.
pub fn sketch_dna_reads(
    reads: &[String],
    config: &PipelineConfig,
) -> Result<Vec<MinHash>, SketchError> {
    config.validate_for_dna()?;
    let family = family_for(config)?;
    let mut sketches = Vec::with_capacity(reads.len());
    for read in reads {
        let shingles = dna_shingles_weighted(read.as_bytes(), config.shingle_len, config.non_acgt)?;
        let mut sketch = MinHash::new(family.clone());
        sketch.update_dna_shingles(&shingles);
        sketches.push(sketch);
    }
    info!(
        "sketched {} dna reads at k={} n={}",
        reads.len(),
        config.shingle_len,
        config.n_samples
    );
    Ok(sketches)
}

/// All-pairs candidate search plus similarity filtering over prepared
/// sketches. Labels are input positions.
pub fn near_duplicates(
    sketches: &[MinHash],
    config: &PipelineConfig,
) -> Result<Vec<NeighborRecord>, SketchError> {
    config.validate()?;
    let Some(first) = sketches.first() else {
        return Ok(Vec::new());
    };
    let family = first.family();
    let mut index = match config.band_params {
        Some((bands, rows)) => LshIndex::with_params(LshParams { bands, rows }, family)?,
        None => LshIndex::new(
            config.threshold,
            (config.false_positive_weight, config.false_negative_weight),
            family,
        )?,
    };
    let params = index.params();
    info!(
        "indexing {} sketches with bands={} rows={}",
        sketches.len(),
        params.bands,
        params.rows
    );

    let mut records = Vec::with_capacity(sketches.len());
    index.insert(first, 0)?;
    records.push(NeighborRecord {
        label: 0,
        neighbors: Vec::new(),
    });
    for (label, sketch) in sketches.iter().enumerate().skip(1) {
        let candidates = index.query_then_insert(sketch, label as u64)?;
        let candidate_count = candidates.len();
        let mut neighbors = Vec::new();
        for candidate in candidates {
            let similarity = sketch.estimate_jaccard(&sketches[candidate as usize])?;
            if similarity >= config.threshold {
                neighbors.push(candidate);
            }
        }
        neighbors.sort_unstable();
        debug!(
            "label {label}: kept {} of {} candidates",
            neighbors.len(),
            candidate_count
        );
        records.push(NeighborRecord {
            label: label as u64,
            neighbors,
        });
    }
    let neighbor_counts: Vec<f64> = records
        .iter()
        .map(|record| record.neighbors.len() as f64)
        .collect();
    info!(
        "found neighbors for {} items; mean {:.2}, p90 {:.1}",
        records.iter().filter(|r| !r.neighbors.is_empty()).count(),
        mean(&neighbor_counts),
        quantile(&neighbor_counts, 0.9)
    );
    Ok(records)
}

/// Baseline all-pairs scan without the index, for the same records the
/// banded search approximates. Quadratic; useful for small inputs and
/// for measuring what the index loses.
pub fn near_duplicates_linear_scan(
    sketches: &[MinHash],
    config: &PipelineConfig,
) -> Result<Vec<NeighborRecord>, SketchError> {
    config.validate()?;
    let mut records = Vec::with_capacity(sketches.len());
    for (label, sketch) in sketches.iter().enumerate() {
        let mut neighbors = Vec::new();
        for (earlier, candidate) in sketches[..label].iter().enumerate() {
            if sketch.estimate_jaccard(candidate)? >= config.threshold {
                neighbors.push(earlier as u64);
            }
        }
        records.push(NeighborRecord {
            label: label as u64,
            neighbors,
        });
    }
    Ok(records)
}

/// Weighted sketch per DNA read, for generalized-Jaccard comparisons
/// where shingle multiplicities matter.
pub fn sketch_dna_reads_weighted(
    reads: &[String],
    config: &PipelineConfig,
) -> Result<Vec<WeightedMinHash>, SketchError> {
    config.validate_for_dna()?;
    let family = WeightedFamily::new(config.seed, config.n_samples)?;
    let mut sketches = Vec::with_capacity(reads.len());
    for read in reads {
        let shingles = dna_shingles_weighted(read.as_bytes(), config.shingle_len, config.non_acgt)?;
        let mut sketch = WeightedMinHash::new(family.clone());
        if !shingles.is_empty() {
            sketch.update_counts(&shingles)?;
        }
        sketches.push(sketch);
    }
    info!(
        "weighted-sketched {} dna reads at k={} n={}",
        reads.len(),
        config.shingle_len,
        config.n_samples
    );
    Ok(sketches)
}

/// Near-duplicate records for a set of text documents.
pub fn text_near_duplicates(
    documents: &[String],
    config: &PipelineConfig,
) -> Result<Vec<NeighborRecord>, SketchError> {
    let sketches = sketch_text_documents(documents, config)?;
    near_duplicates(&sketches, config)
}

/// Near-duplicate records for a set of DNA reads.
pub fn dna_near_duplicates(
    reads: &[String],
    config: &PipelineConfig,
) -> Result<Vec<NeighborRecord>, SketchError> {
    let sketches = sketch_dna_reads(reads, config)?;
    near_duplicates(&sketches, config)
}
