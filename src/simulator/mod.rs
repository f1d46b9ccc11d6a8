//! Monte Carlo estimator for refine outcomes.
//!
//! Refines an item from a start level to a target level thousands of times
//! to estimate:
//! - Success, destruction and cap-hit rates
//! - Attempts needed when the refine succeeds
//! - Durability left over on success
//!
//! Every attempt goes through `refine::resolve_attempt`, the same rule the
//! interactive session and the exact solver use.

mod config;
mod report;
mod runner;

pub use config::{SimConfig, CHUNK_SIZE};
pub use report::{MonteCarloResult, MonteCarloTally};
pub use runner::{run_monte_carlo, run_monte_carlo_with_rng, simulate_full_refine, RunOutcome};
