//! Simulation configuration.

use crate::refine::DEFAULT_ITERATIONS;

/// Iterations handled by one seeded RNG in parallel mode.
pub const CHUNK_SIZE: u32 = 10_000;

/// Configuration for a Monte Carlo estimate.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Number of independent full refines to simulate
    pub iterations: u32,

    /// Random seed for reproducibility (None = random)
    pub seed: Option<u64>,

    /// Attempts per run before it is abandoned as capped
    pub max_attempts_per_run: u32,

    /// Spread chunks of iterations across the rayon pool
    pub parallel: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            seed: None,
            max_attempts_per_run: 100_000,
            parallel: false,
        }
    }
}

impl SimConfig {
    /// Fast estimate for interactive use
    pub fn quick() -> Self {
        Self {
            iterations: 10_000,
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Number of seeded chunks the iterations split into.
    pub fn chunk_count(&self) -> u32 {
        self.iterations.div_ceil(CHUNK_SIZE)
    }
}
