//! MT19937 seeding helpers and the distribution draws used by the
//! permutation table and the weighted parameter rows.

use mt19937::{MT19937, Seed};
use rand_core::SeedableRng;

pub type MtRng = MT19937;

/// Build MT19937 from a single u64 seed.
///
/// The u64 is spread over the first two words of the 624-word seed
/// array; the rest stay zero. Deterministic by construction.
pub fn mt_from_seed(seed64: u64) -> MT19937 {
    let mut seed_arr = [0u32; mt19937::N];
    seed_arr[0] = (seed64 & 0xFFFF_FFFF) as u32;
    seed_arr[1] = (seed64 >> 32) as u32;
    MT19937::from_seed(Seed(seed_arr))
}

/// Build MT19937 from a (seed, universe position) pair.
///
/// Weighted parameter rows must not depend on the order positions were
/// first observed, so every position gets its own stream derived only
/// from the family seed and the position value.
pub fn mt_from_seed_pair(seed64: u64, position: u64) -> MT19937 {
    let mut seed_arr = [0u32; mt19937::N];
    seed_arr[0] = (seed64 & 0xFFFF_FFFF) as u32;
    seed_arr[1] = (seed64 >> 32) as u32;
    seed_arr[2] = (position & 0xFFFF_FFFF) as u32;
    seed_arr[3] = (position >> 32) as u32;
    MT19937::from_seed(Seed(seed_arr))
}

/// Uniform(0,1) excluding zero, so taking a logarithm stays finite.
pub fn unit_open(rng: &mut MtRng) -> f64 {
    loop {
        let u = mt19937::gen_res53(rng);
        if u > 0.0 {
            return u;
        }
    }
}

/// Gamma(2,1) draw as the sum of two unit exponentials.
pub fn gamma_2_1(rng: &mut MtRng) -> f64 {
    -(unit_open(rng).ln() + unit_open(rng).ln())
}
