//! Bounded-probability coin flips over an injectable random source.
//!
//! Every stochastic outcome in the engine goes through [`roll_success`] or
//! [`roll_index`], so a test can swap in a [`FixedOracle`] or a
//! [`ScriptedOracle`] and assert exact results.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::idle::errors::IdleError;

/// Source of uniform draws in `[0, 1)`.
pub trait ChanceOracle {
    fn next_unit(&mut self) -> f64;
}

impl<T: ChanceOracle + ?Sized> ChanceOracle for &mut T {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

impl<T: ChanceOracle + ?Sized> ChanceOracle for Box<T> {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

/// Production oracle backed by `StdRng`.
pub struct RngOracle {
    rng: StdRng,
}

impl RngOracle {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl ChanceOracle for RngOracle {
    fn next_unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Returns the same draw forever.
#[derive(Debug, Clone, Copy)]
pub struct FixedOracle(pub f64);

impl ChanceOracle for FixedOracle {
    fn next_unit(&mut self) -> f64 {
        self.0
    }
}

/// Cycles through a fixed sequence of draws and counts how many were taken.
#[derive(Debug, Clone)]
pub struct ScriptedOracle {
    draws: Vec<f64>,
    calls: usize,
}

impl ScriptedOracle {
    pub fn new(draws: Vec<f64>) -> Self {
        Self { draws, calls: 0 }
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl ChanceOracle for ScriptedOracle {
    fn next_unit(&mut self) -> f64 {
        if self.draws.is_empty() {
            return 0.0;
        }
        let draw = self.draws[self.calls % self.draws.len()];
        self.calls += 1;
        draw
    }
}

/// True iff one draw lands below `percent_chance / 100`.
///
/// Fails with [`IdleError::InvalidArgument`] when the chance is outside
/// `0..=100` or NaN.
pub fn roll_success(oracle: &mut dyn ChanceOracle, percent_chance: f64) -> Result<bool, IdleError> {
    if !(0.0..=100.0).contains(&percent_chance) {
        return Err(IdleError::invalid(format!(
            "chance must be between 0 and 100 (inclusive), got {}",
            percent_chance
        )));
    }
    let threshold = percent_chance / 100.0;
    Ok(oracle.next_unit() < threshold)
}

/// Uniform index into a pool of `len` entries; `None` for an empty pool.
pub fn roll_index(oracle: &mut dyn ChanceOracle, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let draw = oracle.next_unit().clamp(0.0, 1.0);
    Some(((draw * len as f64) as usize).min(len - 1))
}
