// In crates/signals/src/complexity.rs

use std::fmt;

use crate::types::StrategyToggles;

/// How much curve-fitting risk the enabled strategy conditions carry.
///
/// Every additional condition narrows the set of historical situations the
/// strategy fires in, which looks great in-sample and falls apart out of
/// sample. The grade is a blunt count-based heuristic, not a statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ComplexityGrade {
    Low,
    Moderate,
    High,
    Severe,
}

impl ComplexityGrade {
    pub fn level(&self) -> u8 {
        match self {
            ComplexityGrade::Low => 0,
            ComplexityGrade::Moderate => 1,
            ComplexityGrade::High => 2,
            ComplexityGrade::Severe => 3,
        }
    }
}

impl fmt::Display for ComplexityGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ComplexityGrade::Low => "low risk",
            ComplexityGrade::Moderate => "moderate risk",
            ComplexityGrade::High => "high risk",
            ComplexityGrade::Severe => "severe risk",
        };
        f.write_str(label)
    }
}

/// The result of grading the enabled strategy conditions.
#[derive(Debug, Clone)]
pub struct StrategyComplexity {
    pub feature_count: usize,
    pub total_weight: u32,
    /// Enabled conditions, most important first.
    pub enabled_features: Vec<(&'static str, u32)>,
    pub grade: ComplexityGrade,
    pub warning: &'static str,
}

impl StrategyComplexity {
    /// Grades the currently enabled conditions.
    ///
    /// Weights reflect importance: the sentiment index is the core condition,
    /// reversal confirmation close behind, resonance barely matters.
    pub fn assess(toggles: &StrategyToggles) -> Self {
        let mut enabled_features: Vec<(&'static str, u32)> = Vec::new();
        if toggles.use_fear_greed {
            enabled_features.push(("fear & greed index", 5));
        }
        if toggles.use_reversal {
            enabled_features.push(("reversal confirmation", 4));
        }
        if toggles.use_funding_percentile {
            enabled_features.push(("funding rate percentile", 3));
        }
        if toggles.use_longshort {
            enabled_features.push(("long/short ratio", 2));
        }
        if toggles.use_resonance {
            enabled_features.push(("resonance detection", 1));
        }
        enabled_features.sort_by(|a, b| b.1.cmp(&a.1));

        let feature_count = enabled_features.len();
        let total_weight = enabled_features.iter().map(|(_, w)| w).sum();

        let (grade, warning) = match feature_count {
            n if n >= 5 => (
                ComplexityGrade::Severe,
                "All conditions enabled, severe overfitting risk",
            ),
            4 => (
                ComplexityGrade::High,
                "Too many conditions, overfitting risk present",
            ),
            3 => (
                ComplexityGrade::Moderate,
                "Strategy is fairly complex, consider simplifying",
            ),
            _ => (
                ComplexityGrade::Low,
                "Strategy is simple, low overfitting risk",
            ),
        };

        Self {
            feature_count,
            total_weight,
            enabled_features,
            grade,
            warning,
        }
    }

    /// A multi-line summary for startup logs and notifications.
    pub fn summary(&self) -> String {
        let names: Vec<&str> = self.enabled_features.iter().map(|(n, _)| *n).collect();
        format!(
            "Strategy complexity: {}/5 conditions (weight {}/15), {} - {}\nConditions: {}",
            self.feature_count,
            self.total_weight,
            self.grade,
            self.warning,
            names.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_conditions_grade_severe() {
        let c = StrategyComplexity::assess(&StrategyToggles::default());
        assert_eq!(c.feature_count, 5);
        assert_eq!(c.total_weight, 15);
        assert_eq!(c.grade, ComplexityGrade::Severe);
        // Sorted by importance, sentiment first.
        assert_eq!(c.enabled_features[0].0, "fear & greed index");
    }

    #[test]
    fn two_conditions_grade_low() {
        let toggles = StrategyToggles {
            use_fear_greed: true,
            use_reversal: true,
            use_funding_percentile: false,
            use_longshort: false,
            use_resonance: false,
            use_sell_signal: true,
        };
        let c = StrategyComplexity::assess(&toggles);
        assert_eq!(c.feature_count, 2);
        assert_eq!(c.grade, ComplexityGrade::Low);
        assert_eq!(c.grade.level(), 0);
    }

    #[test]
    fn four_conditions_grade_high() {
        let toggles = StrategyToggles {
            use_resonance: false,
            ..StrategyToggles::default()
        };
        let c = StrategyComplexity::assess(&toggles);
        assert_eq!(c.grade, ComplexityGrade::High);
    }
}
