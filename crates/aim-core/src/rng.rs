//! Deterministic simulation RNG.
//!
//! # Determinism strategy
//!
//! Each simulator instance owns exactly one `SimRng`, seeded at construction.
//! Every stochastic decision in a run — spawn schedules, user callbacks that
//! want randomness — draws from it, in phase order.  No component may consult
//! a wall-clock or an independent RNG, so two runs with the same seed and the
//! same scenario replay identically.  Multiple simulators in one process are
//! fully independent.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// The single per-simulator RNG.
///
/// Wraps `SmallRng` so callers get a stable, minimal surface and the engine
/// can swap the underlying generator without touching call sites.
pub struct SimRng(SmallRng);

impl SimRng {
    pub fn new(seed: u64) -> Self {
        SimRng(SmallRng::seed_from_u64(seed))
    }

    /// Expose the inner `SmallRng` for use with `rand` distribution types.
    #[inline]
    pub fn inner(&mut self) -> &mut SmallRng {
        &mut self.0
    }

    /// Sample a uniformly distributed value of any `Standard`-distributed type.
    #[inline]
    pub fn random<T>(&mut self) -> T
    where
        rand::distributions::Standard: rand::distributions::Distribution<T>,
    {
        self.0.gen()
    }

    /// Generate a value uniformly in `range`.
    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }

    /// `true` with probability `p` (clamped to [0, 1]).
    #[inline]
    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.0.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Choose a random element from a slice.  Returns `None` if it is empty.
    #[inline]
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        use rand::seq::SliceRandom;
        slice.choose(&mut self.0)
    }
}
