//! Monte Carlo aggregation and report generation.

use super::runner::RunOutcome;
use crate::build_info::VERSION_LINE;
use crate::refine::{format_level, RefineInput};
use serde::Serialize;
use std::collections::BTreeMap;

/// z-score for a 95% confidence interval.
const Z_95: f64 = 1.96;

/// Running counts over a batch of simulated refines. Batches merge, so
/// parallel chunks can be summed in any order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonteCarloTally {
    pub runs: u32,
    pub successes: u32,
    pub destructions: u32,
    pub capped: u32,
    pub attempts_on_success: u64,
    pub durability_on_success: u64,
    pub attempt_distribution: BTreeMap<u32, u32>,
    pub durability_distribution: BTreeMap<u32, u32>,
}

impl MonteCarloTally {
    pub fn record(&mut self, outcome: &RunOutcome) {
        self.runs += 1;
        match *outcome {
            RunOutcome::Success {
                attempts,
                final_durability,
            } => {
                self.successes += 1;
                self.attempts_on_success += attempts as u64;
                self.durability_on_success += final_durability as u64;
                *self.attempt_distribution.entry(attempts).or_insert(0) += 1;
                *self
                    .durability_distribution
                    .entry(final_durability)
                    .or_insert(0) += 1;
            }
            RunOutcome::Destroyed { .. } => self.destructions += 1,
            RunOutcome::Capped { .. } => self.capped += 1,
        }
    }

    pub fn merge(&mut self, other: MonteCarloTally) {
        self.runs += other.runs;
        self.successes += other.successes;
        self.destructions += other.destructions;
        self.capped += other.capped;
        self.attempts_on_success += other.attempts_on_success;
        self.durability_on_success += other.durability_on_success;
        for (k, v) in other.attempt_distribution {
            *self.attempt_distribution.entry(k).or_insert(0) += v;
        }
        for (k, v) in other.durability_distribution {
            *self.durability_distribution.entry(k).or_insert(0) += v;
        }
    }

    pub fn finish(self, input: RefineInput) -> MonteCarloResult {
        let n = self.runs;
        let ratio = |count: u64, of: u32| {
            if of == 0 {
                0.0
            } else {
                count as f64 / of as f64
            }
        };

        MonteCarloResult {
            input,
            total_simulations: n,
            success_count: self.successes,
            failure_count: n - self.successes,
            destruction_count: self.destructions,
            capped_count: self.capped,
            success_rate: ratio(self.successes as u64, n),
            destruction_rate: ratio(self.destructions as u64, n),
            average_attempts: ratio(self.attempts_on_success, n),
            average_attempts_on_success: ratio(self.attempts_on_success, self.successes),
            average_durability_on_success: ratio(self.durability_on_success, self.successes),
            attempt_distribution: self.attempt_distribution,
            durability_distribution: self.durability_distribution,
        }
    }
}

/// Aggregated results from a Monte Carlo estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonteCarloResult {
    pub input: RefineInput,
    pub total_simulations: u32,
    pub success_count: u32,
    /// Every run that did not reach the target (destroyed or capped)
    pub failure_count: u32,
    pub destruction_count: u32,
    /// Runs abandoned at the attempt cap; neither success nor destruction
    pub capped_count: u32,
    pub success_rate: f64,
    pub destruction_rate: f64,
    /// Attempts spent on successful runs, averaged over all runs
    pub average_attempts: f64,
    pub average_attempts_on_success: f64,
    pub average_durability_on_success: f64,
    /// attempts -> successful runs
    pub attempt_distribution: BTreeMap<u32, u32>,
    /// final durability -> successful runs
    pub durability_distribution: BTreeMap<u32, u32>,
}

impl MonteCarloResult {
    pub fn capped_rate(&self) -> f64 {
        if self.total_simulations == 0 {
            return 0.0;
        }
        self.capped_count as f64 / self.total_simulations as f64
    }

    /// Half-width of the 95% confidence interval on `success_rate`.
    pub fn margin_of_error(&self) -> f64 {
        if self.total_simulations == 0 {
            return 0.0;
        }
        let p = self.success_rate;
        Z_95 * (p * (1.0 - p) / self.total_simulations as f64).sqrt()
    }

    /// Attempt count seen most often among successful runs.
    pub fn most_common_attempts(&self) -> Option<u32> {
        self.attempt_distribution
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(&attempts, _)| attempts)
    }

    /// Generate a text report.
    pub fn to_text(&self) -> String {
        let mut report = String::new();
        let input = &self.input;

        report.push_str("═══════════════════════════════════════════════════════════════\n");
        report.push_str("                  REFINE SIMULATION REPORT\n");
        report.push_str(&format!("                  refine {}\n", VERSION_LINE));
        report.push_str("═══════════════════════════════════════════════════════════════\n\n");

        report.push_str(&format!(
            "{} {} -> {}, durability {}\n",
            input.category,
            format_level(input.current_level),
            format_level(input.target_level),
            input.durability
        ));
        report.push_str(&format!(
            "Runs: {} total, {} succeeded, {} destroyed, {} capped\n\n",
            self.total_simulations, self.success_count, self.destruction_count, self.capped_count
        ));

        report.push_str("── OUTCOMES ─────────────────────────────────────────────────────\n");
        report.push_str(&format!(
            "  Success Rate:        {:.2}% (±{:.2}%)\n",
            self.success_rate * 100.0,
            self.margin_of_error() * 100.0
        ));
        report.push_str(&format!(
            "  Failure Rate:        {:.2}%\n",
            (1.0 - self.success_rate) * 100.0
        ));
        report.push_str(&format!(
            "  Destruction Rate:    {:.2}%\n",
            self.destruction_rate * 100.0
        ));
        if self.capped_count > 0 {
            report.push_str(&format!(
                "  ⚠️  {:.2}% of runs hit the attempt cap\n",
                self.capped_rate() * 100.0
            ));
        }
        report.push('\n');

        report.push_str("── ON SUCCESS ───────────────────────────────────────────────────\n");
        if self.success_count == 0 {
            report.push_str("  No successful runs\n\n");
        } else {
            report.push_str(&format!(
                "  Avg Attempts:        {:.1}\n",
                self.average_attempts_on_success
            ));
            report.push_str(&format!(
                "  Avg Durability Left: {:.2}\n",
                self.average_durability_on_success
            ));
            if let Some(mode) = self.most_common_attempts() {
                report.push_str(&format!("  Most Common:         {} attempts\n", mode));
            }
            report.push('\n');

            report.push_str("── DURABILITY LEFT ──────────────────────────────────────────────\n");
            for (&durability, &count) in &self.durability_distribution {
                let pct = count as f64 / self.success_count as f64 * 100.0;
                let bar: String = "█".repeat((pct / 5.0) as usize);
                report.push_str(&format!("  {:3}: {:>5.1}% {}\n", durability, pct, bar));
            }
            report.push('\n');
        }

        report.push_str("═══════════════════════════════════════════════════════════════\n");

        report
    }

    /// Generate a JSON report for further analysis.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refine::ItemCategory;

    fn input() -> RefineInput {
        RefineInput::new(ItemCategory::Weapon, 4, 6, 1)
    }

    #[test]
    fn test_tally_aggregates() {
        let mut tally = MonteCarloTally::default();
        tally.record(&RunOutcome::Success {
            attempts: 2,
            final_durability: 1,
        });
        tally.record(&RunOutcome::Success {
            attempts: 4,
            final_durability: 0,
        });
        tally.record(&RunOutcome::Destroyed { attempts: 3 });
        tally.record(&RunOutcome::Capped {
            attempts: 10,
            level: 5,
            durability: 1,
        });

        let result = tally.finish(input());
        assert_eq!(result.total_simulations, 4);
        assert_eq!(result.success_count, 2);
        assert_eq!(result.failure_count, 2);
        assert_eq!(result.destruction_count, 1);
        assert_eq!(result.capped_count, 1);
        assert!((result.success_rate - 0.5).abs() < f64::EPSILON);
        assert!((result.destruction_rate - 0.25).abs() < f64::EPSILON);
        assert!((result.average_attempts_on_success - 3.0).abs() < f64::EPSILON);
        assert!((result.average_attempts - 1.5).abs() < f64::EPSILON);
        assert!((result.average_durability_on_success - 0.5).abs() < f64::EPSILON);
        assert_eq!(result.attempt_distribution.get(&2), Some(&1));
        assert_eq!(result.durability_distribution.get(&0), Some(&1));
    }

    #[test]
    fn test_merge_matches_single_tally() {
        let outcomes = [
            RunOutcome::Success {
                attempts: 2,
                final_durability: 1,
            },
            RunOutcome::Destroyed { attempts: 5 },
            RunOutcome::Success {
                attempts: 2,
                final_durability: 0,
            },
        ];

        let mut whole = MonteCarloTally::default();
        outcomes.iter().for_each(|o| whole.record(o));

        let mut left = MonteCarloTally::default();
        left.record(&outcomes[0]);
        let mut right = MonteCarloTally::default();
        right.record(&outcomes[1]);
        right.record(&outcomes[2]);
        left.merge(right);

        assert_eq!(left, whole);
    }

    #[test]
    fn test_empty_result_has_zero_averages() {
        let result = MonteCarloTally::default().finish(input());
        assert_eq!(result.success_rate, 0.0);
        assert_eq!(result.average_attempts_on_success, 0.0);
        assert_eq!(result.margin_of_error(), 0.0);
        assert_eq!(result.most_common_attempts(), None);
    }

    #[test]
    fn test_text_and_json_reports() {
        let mut tally = MonteCarloTally::default();
        tally.record(&RunOutcome::Success {
            attempts: 3,
            final_durability: 1,
        });
        let result = tally.finish(input());

        let text = result.to_text();
        assert!(text.contains("weapon +4 -> +6"));
        assert!(text.contains("Success Rate"));

        let json: serde_json::Value = serde_json::from_str(&result.to_json()).unwrap();
        assert_eq!(json["success_count"], 1);
        assert_eq!(json["input"]["category"], "weapon");
    }
}
