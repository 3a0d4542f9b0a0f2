//! Deterministic utilities for reproducible training
//!
//! Provides an LCG-based RNG for the train/test split and the tie-breaking
//! key for split selection, so the same data and parameters always produce
//! the same model bytes.

use std::num::Wrapping;

/// Linear Congruential Generator for deterministic pseudo-randomness
/// Uses constants from Numerical Recipes (glibc)
#[derive(Clone, Debug)]
pub struct LcgRng {
    state: Wrapping<i64>,
}

impl LcgRng {
    // LCG constants (compatible with glibc)
    const MULTIPLIER: i64 = 1103515245;
    const INCREMENT: i64 = 12345;
    const MODULUS: i64 = 1 << 31;

    pub fn new(seed: u64) -> Self {
        Self {
            state: Wrapping((seed % Self::MODULUS as u64) as i64),
        }
    }

    /// Generate next random value in range [0, MODULUS)
    pub fn next_u31(&mut self) -> i64 {
        self.state = self.state * Wrapping(Self::MULTIPLIER) + Wrapping(Self::INCREMENT);
        self.state.0 & (Self::MODULUS - 1)
    }

    /// Generate random index in range [0, max)
    ///
    /// Scales by multiply-shift so the index comes from the high bits; the
    /// low bits of a power-of-two LCG cycle with short periods.
    pub fn next_index(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        ((self.next_u31() as u64 * max as u64) >> 31) as usize
    }

    /// Fisher-Yates shuffle
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_index(i + 1);
            items.swap(i, j);
        }
    }
}

/// Deterministic tie-breaker for split selection
///
/// Among splits with exactly equal gain the smallest key wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SplitTieBreaker {
    pub feature_idx: usize,
    pub bin: usize,
}

impl SplitTieBreaker {
    pub fn new(feature_idx: usize, bin: usize) -> Self {
        Self { feature_idx, bin }
    }
}
