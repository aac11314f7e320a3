//! 2-bit packed DNA k-shingles.
//!
//! `A`, `T`, `C`, `G` pack to `00`, `01`, `10`, `11` reading from the
//! high bits, so a shingle of length `k <= 32` occupies the low `2k`
//! bits of a `u64`. Distinct shingles pack to distinct values, which
//! lets the packed integer double as the token's hash with no byte
//! hashing in between.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::SketchError;

/// Longest shingle whose packing fits a u64.
pub const MAX_DNA_SHINGLE_LEN: usize = 32;

/// What to do with symbols outside `{A, T, C, G}`.
///
/// Real read data carries `N` bases; whether they should be tolerated
/// depends on the caller, so both behaviors are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NonAcgtPolicy {
    /// Drop the symbol; the window continues across it.
    Skip,
    /// Fail with `MalformedInput` on the first such symbol.
    Fail,
}

#[inline]
fn base_code(symbol: u8) -> Option<u64> {
    match symbol {
        b'A' => Some(0b00),
        b'T' => Some(0b01),
        b'C' => Some(0b10),
        b'G' => Some(0b11),
        _ => None,
    }
}

fn check_shingle_len(k: usize) -> Result<(), SketchError> {
    if k == 0 || k > MAX_DNA_SHINGLE_LEN {
        return Err(SketchError::invalid(format!(
            "dna shingle length {k} outside 1..={MAX_DNA_SHINGLE_LEN}"
        )));
    }
    Ok(())
}

#[inline]
fn shingle_mask(k: usize) -> u64 {
    if k == MAX_DNA_SHINGLE_LEN {
        u64::MAX
    } else {
        (1u64 << (2 * k)) - 1
    }
}

/// Pack a sequence of at most `k` bases. Strict: any non-ACGT symbol is
/// an error.
pub fn encode_shingle(seq: &[u8], k: usize) -> Result<u64, SketchError> {
    check_shingle_len(k)?;
    if seq.len() > k {
        return Err(SketchError::malformed(format!(
            "sequence of {} bases cannot pack into a {k}-shingle",
            seq.len()
        )));
    }
    let mut packed = 0u64;
    for &symbol in seq {
        match base_code(symbol) {
            Some(code) => packed = (packed << 2) | code,
            None => {
                return Err(SketchError::malformed(format!(
                    "unexpected symbol {:?} in dna sequence",
                    symbol as char
                )));
            }
        }
    }
    Ok(packed)
}

/// Unpack a `k`-shingle back into its bases.
///
/// Inverse of [`encode_shingle`] for sequences of length exactly `k`;
/// shorter sequences come back left-padded with `A`.
pub fn decode_shingle(packed: u64, k: usize) -> Result<String, SketchError> {
    check_shingle_len(k)?;
    let mut out = String::with_capacity(k);
    for i in (0..k).rev() {
        out.push(match (packed >> (2 * i)) & 0b11 {
            0b00 => 'A',
            0b01 => 'T',
            0b10 => 'C',
            _ => 'G',
        });
    }
    Ok(out)
}

/// Packed `k`-shingles of a read with multiplicities.
///
/// A read whose usable length is below `k` yields its single packed
/// prefix; a read with no usable bases yields an empty map.
pub fn dna_shingles_weighted(
    seq: &[u8],
    k: usize,
    policy: NonAcgtPolicy,
) -> Result<HashMap<u64, u32>, SketchError> {
    check_shingle_len(k)?;
    let mask = shingle_mask(k);
    let mut shingles: HashMap<u64, u32> = HashMap::new();
    let mut packed = 0u64;
    let mut filled = 0usize;
    for &symbol in seq {
        let Some(code) = base_code(symbol) else {
            match policy {
                NonAcgtPolicy::Skip => continue,
                NonAcgtPolicy::Fail => {
                    return Err(SketchError::malformed(format!(
                        "unexpected symbol {:?} in dna sequence",
                        symbol as char
                    )));
                }
            }
        };
        packed = ((packed << 2) | code) & mask;
        filled += 1;
        if filled >= k {
            *shingles.entry(packed).or_insert(0) += 1;
        }
    }
    if filled > 0 && filled < k {
        shingles.insert(packed, 1);
    }
    Ok(shingles)
}

/// Packed `k`-shingles of a read, presence only.
pub fn dna_shingles(
    seq: &[u8],
    k: usize,
    policy: NonAcgtPolicy,
) -> Result<HashSet<u64>, SketchError> {
    check_shingle_len(k)?;
    let mask = shingle_mask(k);
    let mut shingles: HashSet<u64> = HashSet::new();
    let mut packed = 0u64;
    let mut filled = 0usize;
    for &symbol in seq {
        let Some(code) = base_code(symbol) else {
            match policy {
                NonAcgtPolicy::Skip => continue,
                NonAcgtPolicy::Fail => {
                    return Err(SketchError::malformed(format!(
                        "unexpected symbol {:?} in dna sequence",
                        symbol as char
                    )));
                }
            }
        };
        packed = ((packed << 2) | code) & mask;
        filled += 1;
        if filled >= k {
            shingles.insert(packed);
        }
    }
    if filled > 0 && filled < k {
        shingles.insert(packed);
    }
    Ok(shingles)
}
