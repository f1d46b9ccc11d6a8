//! Refine Calculator - odds for refining weapons and armor
//!
//! Single-attempt rule, Monte Carlo estimator and exact solver over the
//! game's refine rate tables.

pub mod build_info;
pub mod calculator;
pub mod error;
pub mod refine;
pub mod simulator;
pub mod solver;

pub use error::{RefineError, Result};
