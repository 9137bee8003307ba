//! Randomness source.
//!
//! Everything random in the pipeline (early stop, weather, scenes, fallback
//! species) draws from a `Chance` so tests can pin the outcome.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

pub trait Chance: Send + Sync {
    /// Uniform sample in `[0, 1)`.
    fn sample(&self) -> f64;

    /// Uniform index in `0..len`. `len` must be non-zero.
    fn index(&self, len: usize) -> usize {
        let i = (self.sample() * len as f64) as usize;
        i.min(len.saturating_sub(1))
    }
}

/// Pick one element, `None` for an empty slice.
pub fn pick<'a, T>(chance: &dyn Chance, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        None
    } else {
        items.get(chance.index(items.len()))
    }
}

/// Thread-local RNG; the production source.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadChance;

impl Chance for ThreadChance {
    fn sample(&self) -> f64 {
        rand::rng().random::<f64>()
    }
}

/// Reproducible sequence from a seed.
#[derive(Debug)]
pub struct SeededChance {
    rng: Mutex<StdRng>,
}

impl SeededChance {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Chance for SeededChance {
    fn sample(&self) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(|p| p.into_inner());
        rng.random::<f64>()
    }
}

/// Always returns the same value.
#[derive(Debug, Clone, Copy)]
pub struct FixedChance(pub f64);

impl FixedChance {
    /// A source under which every probabilistic event fires.
    pub fn always() -> Self {
        Self(0.0)
    }

    /// A source under which no probabilistic event fires.
    pub fn never() -> Self {
        Self(0.999_999)
    }
}

impl Chance for FixedChance {
    fn sample(&self) -> f64 {
        self.0
    }
}
