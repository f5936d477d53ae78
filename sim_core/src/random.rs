//! Seeded random stream, one per trial

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Reproducible random stream for a single trial.
///
/// Every draw in a trial comes from this stream, so a trial is a pure
/// function of its seed and configuration.
#[derive(Debug, Clone)]
pub struct RandomStream {
    rng: ChaCha8Rng,
    seed: u64,
    draws: u64,
}

impl RandomStream {
    pub fn from_seed(seed: u64) -> Self {
        RandomStream {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            draws: 0,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of values drawn so far
    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// Uniform value in [0, 1)
    pub fn roll(&mut self) -> f64 {
        self.draws += 1;
        self.rng.gen::<f64>()
    }

    /// Uniform value in [min, max]; no draw is consumed for a degenerate range
    pub fn range(&mut self, min: f64, max: f64) -> f64 {
        if min >= max {
            return max;
        }
        self.draws += 1;
        self.rng.gen_range(min..=max)
    }

    /// True with the given probability (0.0 to 1.0)
    pub fn chance(&mut self, probability: f64) -> bool {
        if probability >= 1.0 {
            return true;
        }
        if probability <= 0.0 {
            return false;
        }
        self.roll() < probability
    }
}

/// Derive the seed of trial `index` from the run's base seed.
///
/// Seeds depend only on the index, so results do not depend on how trials
/// are spread over worker threads.
pub fn trial_seed(base: u64, index: u64) -> u64 {
    // splitmix64 finalizer
    let mut z = base.wrapping_add(index.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
