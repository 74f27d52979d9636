//! Seeded randomness used by every stochastic component of the scheduling
//! core (LNS destroy/repair, simulated annealing acceptance, QUBO
//! neighborhood moves). Every caller goes through [`DefaultRandom`] rather
//! than touching `rand` directly, so that a fixed seed reproduces a byte
//! identical schedule end to end.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt::{Debug, Formatter};
use std::sync::Mutex;

/// A seeded, shareable random source.
///
/// Wrapped in a [`Mutex`] so it can be threaded through `Arc`-shared
/// components without every call site needing `&mut`.
pub struct DefaultRandom {
    rng: Mutex<StdRng>,
}

impl DefaultRandom {
    /// Creates a new random source seeded deterministically.
    pub fn new_with_seed(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }

    /// Creates a new random source seeded from entropy (non-reproducible).
    pub fn new_unseeded() -> Self {
        Self { rng: Mutex::new(StdRng::from_entropy()) }
    }

    /// Returns a uniform float in `[0, 1)`.
    pub fn uniform_real(&self) -> f64 {
        self.rng.lock().unwrap().gen::<f64>()
    }

    /// Returns a uniform integer in `[min, max]` (inclusive).
    pub fn uniform_int(&self, min: i64, max: i64) -> i64 {
        if min >= max {
            return min;
        }
        self.rng.lock().unwrap().gen_range(min..=max)
    }

    /// Returns `true` with the given probability (clamped to `[0, 1]`).
    pub fn is_hit(&self, probability: f64) -> bool {
        self.uniform_real() < probability.clamp(0.0, 1.0)
    }

    /// Picks an index in `[0, weights.len())`, proportional to weight.
    /// Returns `0` when `weights` is empty or all-zero.
    pub fn weighted(&self, weights: &[usize]) -> usize {
        let total: usize = weights.iter().sum();
        if total == 0 || weights.is_empty() {
            return 0;
        }
        let mut pick = self.uniform_int(0, total as i64 - 1) as usize;
        for (idx, &weight) in weights.iter().enumerate() {
            if pick < weight {
                return idx;
            }
            pick -= weight;
        }
        weights.len() - 1
    }

    /// Picks a random element from a non-empty slice.
    pub fn choice<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.uniform_int(0, items.len() as i64 - 1) as usize;
        items.get(idx)
    }

    /// Picks `count` distinct indexes in `[0, len)` without replacement.
    pub fn sample_indexes(&self, len: usize, count: usize) -> Vec<usize> {
        let count = count.min(len);
        let mut pool: Vec<usize> = (0..len).collect();
        let mut picked = Vec::with_capacity(count);
        let mut rng = self.rng.lock().unwrap();
        for _ in 0..count {
            let idx = rng.gen_range(0..pool.len());
            picked.push(pool.swap_remove(idx));
        }
        picked
    }
}

impl Default for DefaultRandom {
    fn default() -> Self {
        Self::new_unseeded()
    }
}

impl Debug for DefaultRandom {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultRandom").finish_non_exhaustive()
    }
}
