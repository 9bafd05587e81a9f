//! Determinism testing utilities.
//!
//! The engine must make identical decisions given identical worlds. Sources
//! of divergence it guards against:
//!
//! - **Floating-point math**: scores use [`warband_core::math::Fixed`].
//! - **Hash iteration order**: units are visited in ascending id order and
//!   every map in the decision path is a `BTreeMap`.
//! - **Randomness**: there is none; squad ids and unit names derive from the
//!   tick.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use warband_core::engine::Engine;

use crate::arena::Arena;
use crate::fixtures::run_ticks;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// All distinct hashes (one for a deterministic engine).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            panic!(
                "Engine is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                self.unique_hashes().len(),
                self.hashes
            );
        }
    }
}

/// Run a stateful process several times and compare final hashes.
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let hashes: Vec<u64> = (0..runs)
        .map(|_| {
            let mut state = setup();
            for _ in 0..ticks {
                step(&mut state);
            }
            hash(&state)
        })
        .collect();

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks,
    }
}

/// Run two engines built by `setup` for `ticks` ticks and compare the chain
/// of tick digests.
pub fn verify_engine_determinism<F>(setup: F, ticks: u64) -> DeterminismResult
where
    F: Fn() -> Engine<Arena>,
{
    let hashes = (0..2)
        .map(|_| {
            let mut engine = setup();
            compute_hash(&run_ticks(&mut engine, ticks))
        })
        .collect::<Vec<_>>();

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks,
    }
}

/// Hash any hashable value.
#[must_use]
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_is_deterministic() {
        let result = verify_determinism(3, 10, || 0u64, |n| *n += 7, |n| compute_hash(n));
        result.assert_deterministic();
        assert_eq!(result.unique_hashes().len(), 1);
    }

    #[test]
    #[should_panic(expected = "non-deterministic")]
    fn test_divergence_is_reported() {
        let result = DeterminismResult {
            is_deterministic: false,
            hashes: vec![1, 2],
            ticks: 1,
        };
        result.assert_deterministic();
    }
}
