//! Stable 64-bit digests for byte slices, integers and sketch rows.
//!
//! Every digest here is unsalted xxh3, so the same bytes map to the same
//! value in every process and on every run. Band keys in the LSH index
//! rely on that stability: an index rebuilt elsewhere must place equal
//! sketches into equal buckets.

use xxhash_rust::xxh3::{Xxh3, xxh3_64};

/// Largest Mersenne prime below 2^32, the modulus of the 32-bit form.
const MERSENNE_PRIME_31: u64 = (1u64 << 31) - 1;

/// 64-bit digest of a byte slice.
#[inline]
pub fn digest64(bytes: &[u8]) -> u64 {
    xxh3_64(bytes)
}

/// 64-bit digest of an integer, hashed as its little-endian bytes.
#[inline]
pub fn digest64_u64(value: u64) -> u64 {
    xxh3_64(&value.to_le_bytes())
}

/// 32-bit digest form, the 64-bit digest folded into the Mersenne field.
#[inline]
pub fn digest32(bytes: &[u8]) -> u32 {
    (xxh3_64(bytes) % MERSENNE_PRIME_31) as u32
}

/// Digest of one band's rows. Rows are streamed as little-endian bytes
/// so the key does not depend on in-memory representation.
pub fn band_digest(rows: &[u64]) -> u64 {
    let mut hasher = Xxh3::new();
    for &row in rows {
        hasher.update(&row.to_le_bytes());
    }
    hasher.digest()
}
