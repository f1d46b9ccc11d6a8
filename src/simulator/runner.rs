//! Monte Carlo runner: drives the single-attempt rule to completion many
//! times and aggregates the outcomes.

use super::config::{SimConfig, CHUNK_SIZE};
use super::report::{MonteCarloResult, MonteCarloTally};
use crate::error::Result;
use crate::refine::{resolve_attempt, RefineInput, RefineLevel, RefineRules};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

/// How one full simulated refine ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Success { attempts: u32, final_durability: u32 },
    Destroyed { attempts: u32 },
    /// Gave up after `max_attempts` without reaching the target or breaking
    Capped {
        attempts: u32,
        level: RefineLevel,
        durability: u32,
    },
}

/// Refine one item from the input's start until it reaches the target, is
/// destroyed, or `max_attempts` attempts have been made.
pub fn simulate_full_refine<R: Rng>(
    rules: &RefineRules,
    input: &RefineInput,
    max_attempts: u32,
    rng: &mut R,
) -> RunOutcome {
    let mut state = input.start_state();
    let mut attempts = 0u32;

    while attempts < max_attempts {
        if state.level >= input.target_level {
            return RunOutcome::Success {
                attempts,
                final_durability: state.durability,
            };
        }

        let result = resolve_attempt(rules, input.category, state, rng.gen::<f64>());
        attempts += 1;
        state.apply(&result);

        if result.destroyed {
            return RunOutcome::Destroyed { attempts };
        }
    }

    if state.level >= input.target_level {
        return RunOutcome::Success {
            attempts,
            final_durability: state.durability,
        };
    }

    RunOutcome::Capped {
        attempts,
        level: state.level,
        durability: state.durability,
    }
}

fn run_batch<R: Rng>(
    rules: &RefineRules,
    input: &RefineInput,
    iterations: u32,
    max_attempts: u32,
    rng: &mut R,
) -> MonteCarloTally {
    let mut tally = MonteCarloTally::default();
    for _ in 0..iterations {
        let outcome = simulate_full_refine(rules, input, max_attempts, rng);
        if let RunOutcome::Capped {
            attempts,
            level,
            durability,
        } = outcome
        {
            tracing::debug!(
                attempts,
                level,
                durability,
                "refine run hit attempt cap"
            );
        }
        tally.record(&outcome);
    }
    tally
}

fn report_caps(input: &RefineInput, result: &MonteCarloResult) {
    if result.capped_count > 0 {
        tracing::warn!(
            category = %input.category,
            from = input.current_level,
            to = input.target_level,
            capped = result.capped_count,
            runs = result.total_simulations,
            "Monte Carlo runs hit the attempt cap; a required step may have a 0% rate"
        );
    }
}

/// Run `iterations` full refines drawing from `rng`.
pub fn run_monte_carlo_with_rng<R: Rng>(
    rules: &RefineRules,
    input: &RefineInput,
    iterations: u32,
    max_attempts: u32,
    rng: &mut R,
) -> Result<MonteCarloResult> {
    input.validate(rules)?;
    let result = run_batch(rules, input, iterations, max_attempts, rng).finish(*input);
    report_caps(input, &result);
    Ok(result)
}

/// Run a Monte Carlo estimate as configured.
///
/// Seeded runs are reproducible: chunk `i` draws from
/// `ChaCha8Rng::seed_from_u64(seed + i)` whether or not `parallel` is set.
pub fn run_monte_carlo(
    rules: &RefineRules,
    input: &RefineInput,
    config: &SimConfig,
) -> Result<MonteCarloResult> {
    input.validate(rules)?;

    let chunk_rng = |chunk: u32| match config.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed.wrapping_add(chunk as u64)),
        None => ChaCha8Rng::from_entropy(),
    };
    let chunk_len = |chunk: u32| CHUNK_SIZE.min(config.iterations - chunk * CHUNK_SIZE);
    let run_chunk = |chunk: u32| {
        let mut rng = chunk_rng(chunk);
        run_batch(
            rules,
            input,
            chunk_len(chunk),
            config.max_attempts_per_run,
            &mut rng,
        )
    };

    let chunks = config.chunk_count();
    let tally = if config.parallel {
        (0..chunks)
            .into_par_iter()
            .map(run_chunk)
            .reduce(MonteCarloTally::default, |mut a, b| {
                a.merge(b);
                a
            })
    } else {
        (0..chunks).map(run_chunk).fold(MonteCarloTally::default(), |mut a, b| {
            a.merge(b);
            a
        })
    };

    let result = tally.finish(*input);
    report_caps(input, &result);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RefineError;
    use crate::refine::ItemCategory;

    fn rules() -> RefineRules {
        RefineRules::default()
    }

    #[test]
    fn test_safe_levels_always_succeed() {
        let input = RefineInput::new(ItemCategory::Armor, 0, 4, 0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let outcome = simulate_full_refine(&rules(), &input, 1000, &mut rng);
        assert_eq!(
            outcome,
            RunOutcome::Success {
                attempts: 4,
                final_durability: 0
            }
        );
    }

    #[test]
    fn test_zero_rate_safe_level_is_capped() {
        let mut custom = rules();
        custom.rates.weapon[3] = 0.0;
        let input = RefineInput::new(ItemCategory::Weapon, 2, 5, 3);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let outcome = simulate_full_refine(&custom, &input, 500, &mut rng);
        assert_eq!(
            outcome,
            RunOutcome::Capped {
                attempts: 500,
                level: 3,
                durability: 3
            }
        );
    }

    #[test]
    fn test_zero_rate_dangerous_level_destroys() {
        let mut custom = rules();
        custom.rates.weapon[4] = 0.0;
        let input = RefineInput::new(ItemCategory::Weapon, 4, 5, 2);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let outcome = simulate_full_refine(&custom, &input, 500, &mut rng);
        // two durability losses, then the break
        assert_eq!(outcome, RunOutcome::Destroyed { attempts: 3 });
    }

    #[test]
    fn test_seeded_runs_reproducible() {
        let input = RefineInput::new(ItemCategory::Weapon, 4, 8, 3);
        let config = SimConfig {
            iterations: 5_000,
            seed: Some(42),
            ..Default::default()
        };
        let a = run_monte_carlo(&rules(), &input, &config).unwrap();
        let b = run_monte_carlo(&rules(), &input, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_parallel_matches_sequential_when_seeded() {
        let input = RefineInput::new(ItemCategory::Armor, 5, 9, 4);
        let sequential = SimConfig {
            iterations: 25_000,
            seed: Some(7),
            parallel: false,
            ..Default::default()
        };
        let parallel = SimConfig {
            parallel: true,
            ..sequential.clone()
        };
        let a = run_monte_carlo(&rules(), &input, &sequential).unwrap();
        let b = run_monte_carlo(&rules(), &input, &parallel).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.total_simulations, 25_000);
    }

    #[test]
    fn test_counts_partition_runs() {
        let input = RefineInput::new(ItemCategory::Weapon, 6, 9, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let r = run_monte_carlo_with_rng(&rules(), &input, 2_000, 10_000, &mut rng).unwrap();
        assert_eq!(r.success_count + r.failure_count, r.total_simulations);
        assert_eq!(r.destruction_count + r.capped_count, r.failure_count);
        assert_eq!(r.capped_count, 0);
        let hist_total: u32 = r.attempt_distribution.values().sum();
        assert_eq!(hist_total, r.success_count);
    }

    #[test]
    fn test_rejects_invalid_input() {
        let input = RefineInput::new(ItemCategory::Weapon, 8, 4, 1);
        let err = run_monte_carlo(&rules(), &input, &SimConfig::quick()).unwrap_err();
        assert!(matches!(err, RefineError::InvalidTarget { .. }));
    }
}
