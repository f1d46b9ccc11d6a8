use super::distribution::ProbabilityDistribution;
use crate::error::Result;
use crate::refine::{RefineInput, RefineRules};
use serde::Serialize;

/// Rounds the forward sweep may run before giving up.
pub const DEFAULT_MAX_ROUNDS: u32 = 10_000;

#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub max_rounds: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

/// Exact odds for a refine from start to target.
///
/// `success + destruction + unresolved == 1`. `unresolved` is mass that
/// neither reached the target nor broke: what the sweep left below the target
/// when it ran out of rounds, or a one-level failure the item survives.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExactProbability {
    pub success_probability: f64,
    pub destruction_probability: f64,
    pub unresolved_probability: f64,
    /// Expected number of attempts until the item reaches the target or breaks
    pub expected_attempts: f64,
    pub rounds: u32,
    pub converged: bool,
    /// Answered straight from the rate table
    pub single_step: bool,
}

pub struct ExactSolver<'a> {
    rules: &'a RefineRules,
    config: SolverConfig,
}

impl<'a> ExactSolver<'a> {
    pub fn new(rules: &'a RefineRules, config: SolverConfig) -> Self {
        Self { rules, config }
    }

    /// Exact probability of reaching the target.
    ///
    /// A one-level refine is answered from the rate table: `p` to succeed.
    /// The `1 - p` failure is destruction only at a dangerous level with 0
    /// durability; otherwise the item survives it and the mass is reported
    /// as unresolved. Longer refines run the forward sweep.
    pub fn solve(&self, input: &RefineInput) -> Result<ExactProbability> {
        input.validate(self.rules)?;
        if input.is_single_step() {
            let p = self
                .rules
                .rates
                .success_rate(input.category, input.current_level, input.target_level);
            let failure = 1.0 - p;
            let breaks = !self.rules.is_safe(input.current_level) && input.durability == 0;
            return Ok(ExactProbability {
                success_probability: p,
                destruction_probability: if breaks { failure } else { 0.0 },
                unresolved_probability: if breaks { 0.0 } else { failure },
                expected_attempts: 1.0,
                rounds: 1,
                converged: true,
                single_step: true,
            });
        }
        self.sweep(input)
    }

    /// Forward sweep over (level, durability) with no single-step shortcut:
    /// failed attempts are retried until the item reaches the target or
    /// breaks.
    pub fn sweep(&self, input: &RefineInput) -> Result<ExactProbability> {
        input.validate(self.rules)?;
        let target = input.target_level;

        let mut dist = ProbabilityDistribution::point(input.start_state());
        let mut rounds = 0u32;
        let mut expected_attempts = 0.0;
        let mut converged = true;

        while dist.has_in_flight(target) {
            if rounds >= self.config.max_rounds {
                converged = false;
                tracing::warn!(
                    category = %input.category,
                    from = input.current_level,
                    to = target,
                    rounds,
                    in_flight = dist.in_flight_mass(target),
                    "exact solver hit its round cap with probability still in flight"
                );
                break;
            }
            // every in-flight unit of mass spends one attempt this round
            expected_attempts += dist.in_flight_mass(target);
            dist = dist.advance(self.rules, input.category, target);
            rounds += 1;
        }

        let success_probability = dist.settled_mass(target);
        let unresolved_probability = dist.in_flight_mass(target);
        let destruction_probability = (1.0 - dist.total_mass()).max(0.0);

        tracing::debug!(
            rounds,
            states = dist.len(),
            success = success_probability,
            destroyed = destruction_probability,
            "exact solver finished"
        );

        Ok(ExactProbability {
            success_probability,
            destruction_probability,
            unresolved_probability,
            expected_attempts,
            rounds,
            converged,
            single_step: false,
        })
    }

    /// The distribution after exactly `rounds` sweep rounds.
    pub fn distribution_after(
        &self,
        input: &RefineInput,
        rounds: u32,
    ) -> Result<ProbabilityDistribution> {
        input.validate(self.rules)?;
        let mut dist = ProbabilityDistribution::point(input.start_state());
        for _ in 0..rounds {
            dist = dist.advance(self.rules, input.category, input.target_level);
        }
        Ok(dist)
    }
}

/// Exact probability with the default round cap.
pub fn compute_exact_probability(
    rules: &RefineRules,
    input: &RefineInput,
) -> Result<ExactProbability> {
    ExactSolver::new(rules, SolverConfig::default()).solve(input)
}
