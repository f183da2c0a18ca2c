//! Deterministic fixtures shared by unit tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seeded noise source, reproducible across runs.
pub struct Noise(StdRng);

impl Noise {
    pub fn new(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    /// Uniform in [0, 1).
    pub fn next_unit(&mut self) -> f32 {
        self.0.gen()
    }

    /// Uniform in [-1, 1).
    pub fn next_signed(&mut self) -> f32 {
        self.0.gen_range(-1.0..1.0)
    }
}
