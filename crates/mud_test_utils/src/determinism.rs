//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the engine produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! A fight replayed from the same seed must end in the same state, or bug
//! reports and snapshots mean nothing. Sources of non-determinism include:
//!
//! - **Floating-point math**: multipliers use [`mud_core::math::Fixed`].
//! - **`HashMap` iteration order**: global scans walk ids in sorted order.
//! - **System randomness**: every draw comes from the engine's seeded stream.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use mud_core::engine::Engine;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of pulses simulated.
    pub pulses: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic engine).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run ended in the same state.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Engine is non-deterministic!\n\
                 Runs: {}\n\
                 Pulses: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.pulses,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `pulses` - Number of steps per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance by one step
/// * `hash` - Function to compute a state hash
///
/// # Example
///
/// ```ignore
/// use mud_test_utils::determinism::verify_determinism;
/// use mud_test_utils::fixtures::skirmish;
///
/// let result = verify_determinism(
///     3,
///     1_500,
///     || skirmish(7, 2),
///     |engine| { engine.pulse(); },
///     |engine| engine.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    pulses: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..pulses {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        pulses,
    }
}

/// Run two engines from the same setup twice and compare their final hashes.
pub fn verify_engine_determinism<F>(setup_fn: F, pulses: u64) -> bool
where
    F: Fn() -> Engine,
{
    verify_determinism(
        2,
        pulses,
        &setup_fn,
        |engine| {
            engine.pulse();
        },
        Engine::state_hash,
    )
    .is_deterministic
}

/// Compare two runs pulse by pulse and report the first divergence.
///
/// # Returns
///
/// `None` if the runs agree throughout, `Some(pulse)` where they split.
pub fn find_first_divergence<F>(setup_fn: F, pulses: u64) -> Option<u64>
where
    F: Fn() -> Engine,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.state_hash() != b.state_hash() {
        return Some(0);
    }

    for pulse in 1..=pulses {
        a.pulse();
        b.pulse();

        if a.state_hash() != b.state_hash() {
            return Some(pulse);
        }
    }

    None
}

/// Snapshot mid-run, restore into a fresh engine, and check that both
/// continue identically.
pub fn verify_snapshot_determinism<F>(setup_fn: F, before: u64, after: u64) -> bool
where
    F: Fn() -> Engine,
{
    let mut original = setup_fn();
    original.advance(before);

    let Ok(bytes) = original.snapshot() else {
        return false;
    };
    let mut restored = setup_fn();
    if restored.restore(&bytes).is_err() {
        return false;
    }
    if restored.state_hash() != original.state_hash() {
        return false;
    }

    original.advance(after);
    restored.advance(after);
    original.state_hash() == restored.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}
