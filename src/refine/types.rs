use crate::error::{RefineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A refine level (+0, +1, ...).
pub type RefineLevel = u8;

/// Highest level the game's rate data covers.
pub const MAX_REFINE_LEVEL: RefineLevel = 20;

/// Highest level selectable in the calculator.
pub const MAX_CALCULATOR_LEVEL: RefineLevel = 12;

/// Default number of iterations for a Monte Carlo estimate.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

pub const WEAPON_SUCCESS_RATES: [f64; 20] = [
    1.00, 1.00, 1.00, 1.00, // +0 -> +4: 100%
    0.60, 0.50, 0.40, 0.30, 0.30, // +4 -> +9
    0.20, 0.19, 0.18, 0.17, 0.16, // +9 -> +14
    0.15, 0.14, 0.13, 0.12, 0.11, 0.10, // +14 -> +20
];

pub const ARMOR_SUCCESS_RATES: [f64; 20] = [
    1.00, 1.00, 1.00, 1.00, // +0 -> +4: 100%
    0.60, 0.50, 0.40, 0.30, 0.20, // +4 -> +9
    0.19, 0.18, 0.17, 0.16, 0.15, // +9 -> +14
    0.14, 0.13, 0.12, 0.11, 0.10, 0.09, // +14 -> +20
];

/// Failures at these levels cost nothing.
pub const SAFE_REFINE_LEVELS: [RefineLevel; 4] = [0, 1, 2, 3];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemCategory {
    Weapon,
    Armor,
}

impl ItemCategory {
    pub const ALL: [ItemCategory; 2] = [ItemCategory::Weapon, ItemCategory::Armor];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemCategory::Weapon => "weapon",
            ItemCategory::Armor => "armor",
        }
    }
}

impl fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemCategory {
    type Err = RefineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weapon" => Ok(ItemCategory::Weapon),
            "armor" | "armour" => Ok(ItemCategory::Armor),
            _ => Err(RefineError::UnknownCategory(s.to_string())),
        }
    }
}

/// Per-category success rates. Index `i` is the chance of `+i -> +i+1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefineRateTable {
    pub weapon: Vec<f64>,
    pub armor: Vec<f64>,
}

impl Default for RefineRateTable {
    fn default() -> Self {
        Self {
            weapon: WEAPON_SUCCESS_RATES.to_vec(),
            armor: ARMOR_SUCCESS_RATES.to_vec(),
        }
    }
}

impl RefineRateTable {
    pub fn curve(&self, category: ItemCategory) -> &[f64] {
        match category {
            ItemCategory::Weapon => &self.weapon,
            ItemCategory::Armor => &self.armor,
        }
    }

    /// Success chance for `from -> to`. Anything other than a defined
    /// single step reads as 0.0.
    pub fn success_rate(&self, category: ItemCategory, from: RefineLevel, to: RefineLevel) -> f64 {
        if to != from.saturating_add(1) || to == from {
            return 0.0;
        }
        self.curve(category)
            .get(from as usize)
            .copied()
            .unwrap_or(0.0)
    }

    /// Rate for one attempt starting at `level`.
    pub fn next_rate(&self, category: ItemCategory, level: RefineLevel) -> f64 {
        self.success_rate(category, level, level.saturating_add(1))
    }

    /// Highest level reachable in this category's table.
    pub fn max_level(&self, category: ItemCategory) -> RefineLevel {
        self.curve(category).len().min(RefineLevel::MAX as usize) as RefineLevel
    }

    pub fn validate(&self) -> Result<()> {
        for category in ItemCategory::ALL {
            for (from, &rate) in self.curve(category).iter().enumerate() {
                if !rate.is_finite() || !(0.0..=1.0).contains(&rate) {
                    let from = from.min(RefineLevel::MAX as usize) as RefineLevel;
                    return Err(RefineError::InvalidRate {
                        category,
                        from,
                        to: from.saturating_add(1),
                        rate,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Levels where a failed attempt neither costs durability nor destroys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SafeLevelSet {
    levels: BTreeSet<RefineLevel>,
}

impl Default for SafeLevelSet {
    fn default() -> Self {
        Self::new(SAFE_REFINE_LEVELS)
    }
}

impl SafeLevelSet {
    pub fn new(levels: impl IntoIterator<Item = RefineLevel>) -> Self {
        Self {
            levels: levels.into_iter().collect(),
        }
    }

    pub fn is_safe(&self, level: RefineLevel) -> bool {
        self.levels.contains(&level)
    }

    pub fn iter(&self) -> impl Iterator<Item = RefineLevel> + '_ {
        self.levels.iter().copied()
    }
}

/// Rate table plus safe levels: everything the engine reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefineRules {
    pub rates: RefineRateTable,
    #[serde(default)]
    pub safe_levels: SafeLevelSet,
}

impl RefineRules {
    pub fn new(rates: RefineRateTable, safe_levels: SafeLevelSet) -> Self {
        Self { rates, safe_levels }
    }

    pub fn max_level(&self, category: ItemCategory) -> RefineLevel {
        self.rates.max_level(category)
    }

    pub fn is_safe(&self, level: RefineLevel) -> bool {
        self.safe_levels.is_safe(level)
    }

    pub fn validate(&self) -> Result<()> {
        self.rates.validate()
    }
}

/// Live position of one item: level and remaining durability.
///
/// Ordered by level, then durability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RefineState {
    pub level: RefineLevel,
    pub durability: u32,
}

impl RefineState {
    pub fn new(level: RefineLevel, durability: u32) -> Self {
        Self { level, durability }
    }

    pub fn apply(&mut self, result: &AttemptResult) {
        self.level = result.new_level;
        self.durability = result.new_durability;
    }
}

/// Outcome of one refine attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptResult {
    pub success: bool,
    pub new_level: RefineLevel,
    pub new_durability: u32,
    pub destroyed: bool,
}

impl AttemptResult {
    pub fn state(&self) -> RefineState {
        RefineState::new(self.new_level, self.new_durability)
    }
}

/// What the calculator is asked: take `category` from `current_level` to
/// `target_level` starting with `durability`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefineInput {
    pub category: ItemCategory,
    pub current_level: RefineLevel,
    pub target_level: RefineLevel,
    pub durability: u32,
}

impl RefineInput {
    pub fn new(
        category: ItemCategory,
        current_level: RefineLevel,
        target_level: RefineLevel,
        durability: u32,
    ) -> Self {
        Self {
            category,
            current_level,
            target_level,
            durability,
        }
    }

    pub fn start_state(&self) -> RefineState {
        RefineState::new(self.current_level, self.durability)
    }

    pub fn is_single_step(&self) -> bool {
        self.target_level == self.current_level.saturating_add(1)
    }

    /// Reject targets at or below the start and targets past the table.
    pub fn validate(&self, rules: &RefineRules) -> Result<()> {
        if self.target_level <= self.current_level {
            return Err(RefineError::InvalidTarget {
                current: self.current_level,
                target: self.target_level,
            });
        }
        let max = rules.max_level(self.category);
        if self.target_level > max {
            return Err(RefineError::LevelOutOfRange {
                category: self.category,
                level: self.target_level,
                max,
            });
        }
        Ok(())
    }
}

/// One row of the per-step odds table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepProbability {
    pub from: RefineLevel,
    pub to: RefineLevel,
    pub success_rate: f64,
    pub failure_rate: f64,
    pub loses_durability_on_fail: bool,
}

/// Format a level for display (e.g. "+5").
pub fn format_level(level: RefineLevel) -> String {
    format!("+{}", level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rates_cover_data_range() {
        let rates = RefineRateTable::default();
        assert_eq!(rates.max_level(ItemCategory::Weapon), MAX_REFINE_LEVEL);
        assert_eq!(rates.max_level(ItemCategory::Armor), MAX_REFINE_LEVEL);
    }

    #[test]
    fn test_non_adjacent_transition_is_zero() {
        let rates = RefineRateTable::default();
        assert_eq!(rates.success_rate(ItemCategory::Weapon, 4, 6), 0.0);
        assert_eq!(rates.success_rate(ItemCategory::Weapon, 5, 5), 0.0);
        assert_eq!(rates.success_rate(ItemCategory::Weapon, 5, 4), 0.0);
        assert_eq!(rates.success_rate(ItemCategory::Armor, 20, 21), 0.0);
        assert_eq!(rates.success_rate(ItemCategory::Armor, 255, 255), 0.0);
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!("weapon".parse::<ItemCategory>().unwrap(), ItemCategory::Weapon);
        assert_eq!(" Armor ".parse::<ItemCategory>().unwrap(), ItemCategory::Armor);
        assert!(matches!(
            "shield".parse::<ItemCategory>(),
            Err(RefineError::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_validate_rejects_out_of_range_rate() {
        let mut rates = RefineRateTable::default();
        rates.armor[6] = 1.5;
        match rates.validate() {
            Err(RefineError::InvalidRate { category, from, to, .. }) => {
                assert_eq!(category, ItemCategory::Armor);
                assert_eq!((from, to), (6, 7));
            }
            other => panic!("expected InvalidRate, got {other:?}"),
        }

        rates.armor[6] = f64::NAN;
        assert!(rates.validate().is_err());
    }

    #[test]
    fn test_refine_state_ordering() {
        assert!(RefineState::new(4, 9) < RefineState::new(5, 0));
        assert!(RefineState::new(5, 0) < RefineState::new(5, 1));
    }

    #[test]
    fn test_format_level() {
        assert_eq!(format_level(7), "+7");
        assert_eq!(format_level(0), "+0");
    }
}
