//! Hash helpers shared by the tables.
//!
//! Every hashed structure is generic over a [`BuildHasher`], which acts as
//! the hash-function factory. Hashes are folded to 32 bits because slot
//! indices and probe starts are derived from `u32` values.

use std::hash::{BuildHasher, Hash};

/// Default hash-function factory. FNV is deterministic across runs,
/// which keeps probe layouts reproducible.
pub type DefaultHashBuilder = fnv::FnvBuildHasher;

/// Largest prime below 2^32. It is congruent to 3 mod 4, which makes
/// the quadratic-residue map a bijection on `0..PRIME`.
const PRIME: u32 = 4_294_967_291;
const OFFSET: u32 = 0x682f_0161;
const SCRAMBLE: u32 = 0x5bf0_3635;

/// Hashes `value` with `builder` and folds the result to 32 bits.
pub fn hash32<S: BuildHasher, T: Hash + ?Sized>(builder: &S, value: &T) -> u32 {
    let full = builder.hash_one(value);
    (full ^ (full >> 32)) as u32
}

/// Bijective, non-repeating scramble of a 32-bit value.
///
/// Used to derive the secondary probe start from a hash, so the two probe
/// chains of a key start far apart and collisions on the primary slot do
/// not imply collisions on the secondary one.
pub fn permute(x: u32) -> u32 {
    permute_qpr(permute_qpr(x).wrapping_add(OFFSET) ^ SCRAMBLE)
}

fn permute_qpr(x: u32) -> u32 {
    // The five values at or above PRIME map to themselves.
    if x >= PRIME {
        return x;
    }
    let residue = ((x as u64 * x as u64) % PRIME as u64) as u32;
    if x <= PRIME / 2 {
        residue
    } else {
        PRIME - residue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_permute_is_injective_on_sample() {
        let mut seen = HashSet::new();
        for x in (0..200_000u32).chain(u32::MAX - 1000..=u32::MAX) {
            assert!(seen.insert(permute(x)), "collision at {x}");
        }
    }

    #[test]
    fn test_permute_qpr_fixed_points_above_prime() {
        for x in PRIME..=u32::MAX {
            assert_eq!(permute_qpr(x), x);
        }
    }

    #[test]
    fn test_permute_decorrelates_neighbours() {
        let a = permute(1000);
        let b = permute(1001);
        assert_ne!(a.wrapping_sub(b), 1);
        assert_ne!(b.wrapping_sub(a), 1);
    }

    #[test]
    fn test_hash32_is_deterministic() {
        let builder = DefaultHashBuilder::default();
        assert_eq!(hash32(&builder, "a/b/c"), hash32(&builder, "a/b/c"));
        assert_ne!(hash32(&builder, "a/b/c"), hash32(&builder, "a/b/d"));
    }
}
