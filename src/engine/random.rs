//! Injectable randomness
//!
//! Branch selection and idle/gesture picks draw from a [`RandomSource`] so
//! hosts and tests can make playback deterministic.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of random draws for the engine
pub trait RandomSource {
    /// A draw in `[0, 100]`
    fn percent(&mut self) -> f64;

    /// A uniform index in `0..len`; `len` is never zero
    fn index(&mut self, len: usize) -> usize;
}

/// `rand`-backed source
#[derive(Debug, Clone)]
pub struct StdRandom {
    rng: StdRng,
}

impl StdRandom {
    /// Seed from the operating system
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sequence
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for StdRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for StdRandom {
    fn percent(&mut self) -> f64 {
        self.rng.gen_range(0.0..=100.0)
    }

    fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

/// Scripted source that replays fixed draws
///
/// When a script runs dry the source returns `0.0` / `0`.
#[derive(Debug, Clone, Default)]
pub struct SequenceRandom {
    percents: VecDeque<f64>,
    indices: VecDeque<usize>,
}

impl SequenceRandom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_percents(mut self, draws: impl IntoIterator<Item = f64>) -> Self {
        self.percents.extend(draws);
        self
    }

    pub fn with_indices(mut self, draws: impl IntoIterator<Item = usize>) -> Self {
        self.indices.extend(draws);
        self
    }

    pub fn push_percent(&mut self, draw: f64) {
        self.percents.push_back(draw);
    }

    pub fn push_index(&mut self, draw: usize) {
        self.indices.push_back(draw);
    }
}

impl RandomSource for SequenceRandom {
    fn percent(&mut self) -> f64 {
        self.percents.pop_front().unwrap_or(0.0)
    }

    fn index(&mut self, len: usize) -> usize {
        self.indices.pop_front().unwrap_or(0).min(len.saturating_sub(1))
    }
}
