//! Exact refine odds by forward propagation of probability mass over
//! (level, durability) states. No sampling error; used wherever a headline
//! number must not move between runs.

mod distribution;
mod exact;

pub use distribution::ProbabilityDistribution;
pub use exact::{
    compute_exact_probability, ExactProbability, ExactSolver, SolverConfig, DEFAULT_MAX_ROUNDS,
};
