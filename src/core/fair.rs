//! Provably-Fair Crash-Point Derivation
//!
//! The crash point for a round is a pure function of the round seed:
//!
//! ```text
//! h = first 4 bytes of SHA-256(seed), big-endian
//! h % 33 == 0           -> 1.00x  (instant crash, house edge 1/33)
//! otherwise             -> floor(100 * 2^32 / (2^32 - h)) / 100
//! ```
//!
//! The divisor construction keeps the result >= 1.00x with a Pareto-like
//! tail: low multipliers are common, the upper tail is unbounded. The seed
//! is generated before any bet is accepted and revealed after the crash, so
//! anyone can re-run the derivation and audit the outcome.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use super::fixed::CENTS_ONE;

/// Opaque per-round seed, revealed post-crash for auditing.
pub type RoundSeed = [u8; 16];

/// Instant-crash modulus: one round in 33 crashes at exactly 1.00x.
pub const HOUSE_EDGE_MOD: u32 = 33;

/// Derive a round's crash point, in cents, from its seed.
///
/// Deterministic and total: the same seed always yields the same value and
/// every seed yields a value >= 100 (1.00x). The instant-crash branch is
/// checked before the general formula.
///
/// Safe to call concurrently; no state, no side effects.
pub fn derive_crash_cents(seed: &[u8]) -> u64 {
    let digest = Sha256::digest(seed);
    let h = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);

    if h % HOUSE_EDGE_MOD == 0 {
        return CENTS_ONE;
    }

    let e: u64 = 1 << 32;
    // h < 2^32 - 1 here (h == 2^32 - 1 would need h % 33 != 0, which holds),
    // so the divisor is >= 1 and 100 * 2^32 fits comfortably in u64.
    (CENTS_ONE * e) / (e - h as u64)
}

/// Source of per-round seeds.
///
/// The engine owns one of these; production uses [`EntropySeedSource`],
/// tests script the sequence to pin round outcomes.
pub trait SeedSource: Send + Sync {
    /// Produce the seed for the next round.
    fn next_seed(&mut self) -> RoundSeed;
}

/// OS-entropy seed source used in production.
#[derive(Debug, Default)]
pub struct EntropySeedSource;

impl SeedSource for EntropySeedSource {
    fn next_seed(&mut self) -> RoundSeed {
        let mut seed = RoundSeed::default();
        OsRng.fill_bytes(&mut seed);
        seed
    }
}

/// Fixed seed script for tests: yields the given seeds in order, then
/// repeats the last one.
#[derive(Debug, Clone)]
pub struct ScriptedSeedSource {
    seeds: Vec<RoundSeed>,
    next: usize,
}

impl ScriptedSeedSource {
    /// Create a scripted source from a non-empty seed list.
    pub fn new(seeds: Vec<RoundSeed>) -> Self {
        assert!(!seeds.is_empty(), "seed script must not be empty");
        Self { seeds, next: 0 }
    }
}

impl SeedSource for ScriptedSeedSource {
    fn next_seed(&mut self) -> RoundSeed {
        let seed = self.seeds[self.next.min(self.seeds.len() - 1)];
        self.next += 1;
        seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_crash_points() {
        // Fixed vectors, recomputable with any SHA-256 implementation.
        assert_eq!(derive_crash_cents(b"0123456789abcdef"), 265);
        assert_eq!(derive_crash_cents(b"aaaaaaaaaaaaaaaa"), 104);
        assert_eq!(derive_crash_cents(b"provably-fair-ok"), 120);
        // h % 33 == 0 for these: instant crash.
        assert_eq!(derive_crash_cents(b"round-seed-00021"), 100);
        assert_eq!(derive_crash_cents(b"round-seed-00032"), 100);
        // A 2.50x round used by the engine tests.
        assert_eq!(derive_crash_cents(b"round-seed-00113"), 250);
    }

    #[test]
    fn test_instant_crash_fraction() {
        // 1/33 of rounds crash instantly via the house-edge branch; the
        // general formula also floors to 1.00 for h < 2^32/101, so the
        // overall fraction of 1.00x rounds sits near 4%.
        let n = 10_000u128;
        let ones = (0..n)
            .filter(|i| {
                let seed: RoundSeed = i.to_le_bytes();
                derive_crash_cents(&seed) == 100
            })
            .count() as f64;
        let fraction = ones / n as f64;
        assert!(fraction > 1.0 / 33.0, "fraction {fraction} below house edge");
        assert!(fraction < 0.06, "fraction {fraction} implausibly high");
    }

    #[test]
    fn test_scripted_seed_source_repeats_last() {
        let mut src = ScriptedSeedSource::new(vec![*b"round-seed-00021", *b"round-seed-00113"]);
        assert_eq!(src.next_seed(), *b"round-seed-00021");
        assert_eq!(src.next_seed(), *b"round-seed-00113");
        assert_eq!(src.next_seed(), *b"round-seed-00113");
    }

    proptest! {
        #[test]
        fn prop_deterministic(seed in prop::array::uniform16(any::<u8>())) {
            prop_assert_eq!(derive_crash_cents(&seed), derive_crash_cents(&seed));
        }

        #[test]
        fn prop_at_least_one(seed in prop::array::uniform16(any::<u8>())) {
            prop_assert!(derive_crash_cents(&seed) >= 100);
        }
    }
}
