//! The refine calculator: step table, exact odds and a Monte Carlo estimate
//! for one request, plus the headline success rate shown to the player.

use crate::error::Result;
use crate::refine::{
    first_try_probability, format_level, step_probabilities, RefineInput, RefineRules,
    StepProbability,
};
use crate::simulator::{run_monte_carlo, MonteCarloResult, SimConfig};
use crate::solver::{ExactProbability, ExactSolver, SolverConfig};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RefineReport {
    pub input: RefineInput,
    pub steps: Vec<StepProbability>,
    /// Chance of clearing every step without a single failure
    pub first_try: f64,
    pub exact: ExactProbability,
    pub monte_carlo: MonteCarloResult,
    pub headline_success_rate: f64,
    /// Headline came from the rate table rather than sampling
    pub headline_is_exact: bool,
}

/// Everything the calculator shows for `input`.
///
/// The headline is exact for a one-level refine at 0 durability, where a
/// single attempt settles the outcome; otherwise it is the Monte Carlo rate.
pub fn calculate(
    rules: &RefineRules,
    input: &RefineInput,
    sim: &SimConfig,
    solver: &SolverConfig,
) -> Result<RefineReport> {
    input.validate(rules)?;

    let steps = step_probabilities(rules, input.category, input.current_level, input.target_level);
    let first_try =
        first_try_probability(rules, input.category, input.current_level, input.target_level);
    let exact = ExactSolver::new(rules, solver.clone()).solve(input)?;
    let monte_carlo = run_monte_carlo(rules, input, sim)?;

    let headline_is_exact = input.is_single_step() && input.durability == 0;
    let headline_success_rate = if headline_is_exact {
        exact.success_probability
    } else {
        monte_carlo.success_rate
    };

    Ok(RefineReport {
        input: *input,
        steps,
        first_try,
        exact,
        monte_carlo,
        headline_success_rate,
        headline_is_exact,
    })
}

impl RefineReport {
    pub fn to_text(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!(
            "Success: {:.2}% ({})\n",
            self.headline_success_rate * 100.0,
            if self.headline_is_exact {
                "exact, durability 0".to_string()
            } else {
                format!(
                    "{} / {} runs, ±{:.2}%",
                    self.monte_carlo.success_count,
                    self.monte_carlo.total_simulations,
                    self.monte_carlo.margin_of_error() * 100.0
                )
            }
        ));
        out.push_str(&format!(
            "Avg attempts: {}\n",
            if self.monte_carlo.success_count > 0 {
                format!("{:.1}", self.monte_carlo.average_attempts_on_success)
            } else {
                "∞".to_string()
            }
        ));
        out.push_str(&format!(
            "Exact: {:.4}% success, {:.4}% destroyed",
            self.exact.success_probability * 100.0,
            self.exact.destruction_probability * 100.0
        ));
        if self.exact.single_step && self.exact.unresolved_probability > 0.0 {
            out.push_str(&format!(
                ", {:.4}% failed intact",
                self.exact.unresolved_probability * 100.0
            ));
        }
        out.push('\n');
        out.push_str(&format!(
            "No-fail chain: {:.4}%\n\n",
            self.first_try * 100.0
        ));

        out.push_str(&steps_table(&self.steps));
        out
    }
}

/// Per-step odds as a text table.
pub fn steps_table(steps: &[StepProbability]) -> String {
    let mut out = String::new();
    out.push_str("  Step        Success   Failure   On fail\n");
    out.push_str("  ─────────   ───────   ───────   ───────────────\n");
    for step in steps {
        out.push_str(&format!(
            "  {:>3} -> {:<3}  {:>6.1}%   {:>6.1}%   {}\n",
            format_level(step.from),
            format_level(step.to),
            step.success_rate * 100.0,
            step.failure_rate * 100.0,
            if step.loses_durability_on_fail {
                "-1 durability"
            } else {
                "safe"
            }
        ));
    }
    out
}
