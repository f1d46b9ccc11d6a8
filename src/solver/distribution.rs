//! Probability mass over (level, durability) states.

use crate::refine::{ItemCategory, RefineLevel, RefineRules, RefineState};
use std::collections::BTreeMap;

/// Where an item may be after some number of attempts, and how likely each
/// state is. Destroyed mass leaves the map and is tallied separately, so
/// `total_mass() + destroyed_mass()` stays at 1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbabilityDistribution {
    masses: BTreeMap<RefineState, f64>,
    destroyed: f64,
}

impl ProbabilityDistribution {
    /// All mass on `state`.
    pub fn point(state: RefineState) -> Self {
        let mut dist = Self::default();
        dist.add(state, 1.0);
        dist
    }

    /// Add `mass` to `state`. Non-positive mass is ignored.
    pub fn add(&mut self, state: RefineState, mass: f64) {
        if mass > 0.0 {
            *self.masses.entry(state).or_insert(0.0) += mass;
        }
    }

    pub fn get(&self, state: RefineState) -> f64 {
        self.masses.get(&state).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RefineState, f64)> + '_ {
        self.masses.iter().map(|(&s, &p)| (s, p))
    }

    pub fn len(&self) -> usize {
        self.masses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }

    /// Mass still tracked (not destroyed).
    pub fn total_mass(&self) -> f64 {
        self.masses.values().sum()
    }

    /// Mass dropped as destroyed so far.
    pub fn destroyed_mass(&self) -> f64 {
        self.destroyed
    }

    /// Mass at or above `target`.
    pub fn settled_mass(&self, target: RefineLevel) -> f64 {
        self.iter()
            .filter(|(s, _)| s.level >= target)
            .map(|(_, p)| p)
            .sum()
    }

    /// Mass still below `target`.
    pub fn in_flight_mass(&self, target: RefineLevel) -> f64 {
        self.iter()
            .filter(|(s, _)| s.level < target)
            .map(|(_, p)| p)
            .sum()
    }

    pub fn has_in_flight(&self, target: RefineLevel) -> bool {
        // keys are ordered by level first
        self.masses.keys().next().is_some_and(|s| s.level < target)
    }

    /// One more attempt for every state below `target`. States at or above
    /// the target carry over unchanged.
    pub fn advance(
        &self,
        rules: &RefineRules,
        category: ItemCategory,
        target: RefineLevel,
    ) -> ProbabilityDistribution {
        let mut next = ProbabilityDistribution {
            masses: BTreeMap::new(),
            destroyed: self.destroyed,
        };

        for (state, p) in self.iter() {
            if state.level >= target {
                next.add(state, p);
                continue;
            }

            let rate = rules.rates.next_rate(category, state.level);
            let success = p * rate;
            let failure = p * (1.0 - rate);

            next.add(RefineState::new(state.level + 1, state.durability), success);

            if rules.is_safe(state.level) {
                next.add(state, failure);
            } else if state.durability == 0 {
                next.destroyed += failure;
            } else {
                next.add(
                    RefineState::new(state.level, state.durability - 1),
                    failure,
                );
            }
        }

        next
    }
}
