//! Interactive one-item refine session: roll attempts one at a time and keep
//! a short history, the way a player would at the refine NPC.

use super::logic::simulate_attempt;
use super::types::*;
use crate::error::{RefineError, Result};
use rand::Rng;
use std::collections::VecDeque;

/// Attempts kept in the history (newest first).
pub const SESSION_HISTORY_LEN: usize = 10;

#[derive(Debug, Clone)]
pub struct RefineSession {
    input: RefineInput,
    state: RefineState,
    destroyed: bool,
    attempts: u32,
    history: VecDeque<AttemptResult>,
}

impl RefineSession {
    pub fn new(rules: &RefineRules, input: RefineInput) -> Result<Self> {
        input.validate(rules)?;
        Ok(Self {
            input,
            state: input.start_state(),
            destroyed: false,
            attempts: 0,
            history: VecDeque::with_capacity(SESSION_HISTORY_LEN),
        })
    }

    pub fn input(&self) -> &RefineInput {
        &self.input
    }

    pub fn state(&self) -> RefineState {
        self.state
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn reached_target(&self) -> bool {
        !self.destroyed && self.state.level >= self.input.target_level
    }

    pub fn is_finished(&self) -> bool {
        self.destroyed || self.reached_target()
    }

    /// True when the next dangerous failure would break the item.
    pub fn one_fail_from_destruction(&self, rules: &RefineRules) -> bool {
        !self.is_finished() && self.state.durability == 0 && !rules.is_safe(self.state.level)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn history(&self) -> impl Iterator<Item = &AttemptResult> {
        self.history.iter()
    }

    pub fn attempt<R: Rng>(&mut self, rules: &RefineRules, rng: &mut R) -> Result<AttemptResult> {
        if self.destroyed {
            return Err(RefineError::ItemDestroyed(self.state.level));
        }
        if self.reached_target() {
            return Err(RefineError::TargetReached(self.input.target_level));
        }

        let result = simulate_attempt(
            rules,
            self.input.category,
            self.state.level,
            self.state.durability,
            rng,
        )?;

        self.attempts += 1;
        self.state.apply(&result);
        self.destroyed = result.destroyed;

        if self.history.len() == SESSION_HISTORY_LEN {
            self.history.pop_back();
        }
        self.history.push_front(result);

        Ok(result)
    }

    pub fn reset(&mut self) {
        self.state = self.input.start_state();
        self.destroyed = false;
        self.attempts = 0;
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_session_runs_to_terminal_state() {
        let rules = RefineRules::default();
        let input = RefineInput::new(ItemCategory::Weapon, 4, 8, 2);
        let mut session = RefineSession::new(&rules, input).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(2024);

        while !session.is_finished() {
            session.attempt(&rules, &mut rng).unwrap();
            assert!(session.attempts() < 10_000);
        }

        let err = session.attempt(&rules, &mut rng).unwrap_err();
        if session.is_destroyed() {
            assert!(matches!(err, RefineError::ItemDestroyed(_)));
        } else {
            assert_eq!(session.state().level, 8);
            assert!(matches!(err, RefineError::TargetReached(8)));
        }
    }

    #[test]
    fn test_history_is_bounded_newest_first() {
        let mut rules = RefineRules::default();
        // Stuck at a safe level forever
        rules.rates.armor[1] = 0.0;
        let input = RefineInput::new(ItemCategory::Armor, 1, 3, 0);
        let mut session = RefineSession::new(&rules, input).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        for _ in 0..25 {
            session.attempt(&rules, &mut rng).unwrap();
        }
        assert_eq!(session.attempts(), 25);
        assert_eq!(session.history().count(), SESSION_HISTORY_LEN);
        assert!(session.history().all(|r| !r.success && !r.destroyed));
    }

    #[test]
    fn test_reset_restores_start() {
        let rules = RefineRules::default();
        let input = RefineInput::new(ItemCategory::Armor, 0, 4, 5);
        let mut session = RefineSession::new(&rules, input).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        session.attempt(&rules, &mut rng).unwrap();
        assert_eq!(session.state().level, 1);

        session.reset();
        assert_eq!(session.state(), RefineState::new(0, 5));
        assert_eq!(session.attempts(), 0);
        assert_eq!(session.history().count(), 0);
    }

    #[test]
    fn test_new_rejects_bad_target() {
        let rules = RefineRules::default();
        let input = RefineInput::new(ItemCategory::Weapon, 7, 7, 1);
        assert!(matches!(
            RefineSession::new(&rules, input),
            Err(RefineError::InvalidTarget { .. })
        ));
    }
}
