use super::types::*;
use crate::error::{RefineError, Result};
use rand::Rng;

/// Resolve one attempt from `state` given a uniform roll in `[0, 1)`.
///
/// - Success: level +1, durability kept.
/// - Failure at a safe level: nothing changes.
/// - Failure at a dangerous level: -1 durability, or destroyed if
///   durability was already 0.
///
/// Zero durability does not block an attempt; only the next failure breaks
/// the item.
pub fn resolve_attempt(
    rules: &RefineRules,
    category: ItemCategory,
    state: RefineState,
    roll: f64,
) -> AttemptResult {
    let rate = rules.rates.next_rate(category, state.level);

    if roll < rate {
        return AttemptResult {
            success: true,
            new_level: state.level + 1,
            new_durability: state.durability,
            destroyed: false,
        };
    }

    if rules.is_safe(state.level) {
        return AttemptResult {
            success: false,
            new_level: state.level,
            new_durability: state.durability,
            destroyed: false,
        };
    }

    match state.durability {
        0 => AttemptResult {
            success: false,
            new_level: state.level,
            new_durability: 0,
            destroyed: true,
        },
        durability => AttemptResult {
            success: false,
            new_level: state.level,
            new_durability: durability - 1,
            destroyed: false,
        },
    }
}

/// Roll one refine attempt with the given RNG.
///
/// Returns `LevelAtMaximum` when `level` has no next step in the table.
pub fn simulate_attempt<R: Rng>(
    rules: &RefineRules,
    category: ItemCategory,
    level: RefineLevel,
    durability: u32,
    rng: &mut R,
) -> Result<AttemptResult> {
    if level >= rules.max_level(category) {
        return Err(RefineError::LevelAtMaximum { category, level });
    }
    let roll = rng.gen::<f64>();
    Ok(resolve_attempt(
        rules,
        category,
        RefineState::new(level, durability),
        roll,
    ))
}

pub fn step_probability(
    rules: &RefineRules,
    category: ItemCategory,
    from: RefineLevel,
    to: RefineLevel,
) -> StepProbability {
    let success_rate = rules.rates.success_rate(category, from, to);
    StepProbability {
        from,
        to,
        success_rate,
        failure_rate: 1.0 - success_rate,
        loses_durability_on_fail: !rules.is_safe(from),
    }
}

/// Per-step odds for every transition between `from` and `to`.
pub fn step_probabilities(
    rules: &RefineRules,
    category: ItemCategory,
    from: RefineLevel,
    to: RefineLevel,
) -> Vec<StepProbability> {
    (from..to)
        .map(|level| step_probability(rules, category, level, level + 1))
        .collect()
}

/// Product of the step rates: the chance of clearing every step first try.
pub fn first_try_probability(
    rules: &RefineRules,
    category: ItemCategory,
    from: RefineLevel,
    to: RefineLevel,
) -> f64 {
    step_probabilities(rules, category, from, to)
        .iter()
        .map(|s| s.success_rate)
        .product()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rules() -> RefineRules {
        RefineRules::default()
    }

    #[test]
    fn test_success_keeps_durability() {
        let r = resolve_attempt(&rules(), ItemCategory::Weapon, RefineState::new(4, 0), 0.1);
        assert!(r.success);
        assert!(!r.destroyed);
        assert_eq!(r.new_level, 5);
        assert_eq!(r.new_durability, 0);
    }

    #[test]
    fn test_safe_failure_changes_nothing() {
        let mut custom = rules();
        custom.rates.weapon[2] = 0.0;
        for _ in 0..50 {
            let r = resolve_attempt(&custom, ItemCategory::Weapon, RefineState::new(2, 0), 0.5);
            assert!(!r.success);
            assert!(!r.destroyed);
            assert_eq!(r.state(), RefineState::new(2, 0));
        }
    }

    #[test]
    fn test_dangerous_failure_costs_durability() {
        let r = resolve_attempt(&rules(), ItemCategory::Armor, RefineState::new(6, 3), 0.99);
        assert!(!r.success);
        assert!(!r.destroyed);
        assert_eq!(r.state(), RefineState::new(6, 2));
    }

    #[test]
    fn test_dangerous_failure_at_zero_destroys() {
        let r = resolve_attempt(&rules(), ItemCategory::Armor, RefineState::new(6, 0), 0.99);
        assert!(r.destroyed);
        assert_eq!(r.state(), RefineState::new(6, 0));
    }

    #[test]
    fn test_simulate_attempt_rejects_max_level() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let err = simulate_attempt(&rules(), ItemCategory::Weapon, MAX_REFINE_LEVEL, 5, &mut rng);
        assert!(matches!(err, Err(RefineError::LevelAtMaximum { level: 20, .. })));
    }

    #[test]
    fn test_simulate_attempt_is_seed_deterministic() {
        let mut a = ChaCha8Rng::seed_from_u64(7);
        let mut b = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..20 {
            let ra = simulate_attempt(&rules(), ItemCategory::Weapon, 9, 2, &mut a).unwrap();
            let rb = simulate_attempt(&rules(), ItemCategory::Weapon, 9, 2, &mut b).unwrap();
            assert_eq!(ra, rb);
        }
    }

    #[test]
    fn test_step_probabilities_span() {
        let steps = step_probabilities(&rules(), ItemCategory::Weapon, 2, 6);
        assert_eq!(steps.len(), 4);
        assert_eq!((steps[0].from, steps[0].to), (2, 3));
        assert!(!steps[0].loses_durability_on_fail);
        assert!(!steps[1].loses_durability_on_fail);
        assert!(steps[2].loses_durability_on_fail);
        assert!((steps[2].success_rate - 0.60).abs() < f64::EPSILON);
        assert!((steps[3].failure_rate - 0.50).abs() < f64::EPSILON);
    }

    #[test]
    fn test_first_try_probability() {
        let p = first_try_probability(&rules(), ItemCategory::Weapon, 4, 7);
        assert!((p - 0.6 * 0.5 * 0.4).abs() < 1e-12);
    }
}
