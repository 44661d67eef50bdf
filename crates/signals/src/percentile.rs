// In crates/signals/src/percentile.rs

/// Ranks a current metric value against a trailing historical window.
///
/// The score is the share of historical values strictly below the current one,
/// expressed as 0..=100. Ties are excluded from the count, so the percentile of
/// the window minimum is 0 and a value equal to a unique maximum scores
/// `100 * (N - 1) / N`.
#[derive(Debug, Clone)]
pub struct PercentileScorer {
    min_samples: usize,
}

impl PercentileScorer {
    pub fn new(min_samples: usize) -> Self {
        Self { min_samples }
    }

    /// The percentile rank of `current` within `history`, rounded to one
    /// decimal. Fails closed (`None`) when the window is smaller than the
    /// configured minimum sample size.
    pub fn percentile(&self, history: &[f64], current: f64) -> Option<f64> {
        if history.len() < self.min_samples {
            return None;
        }

        let below = history.iter().filter(|x| **x < current).count();
        let pct = below as f64 / history.len() as f64 * 100.0;
        Some((pct * 10.0).round() / 10.0)
    }
}

impl Default for PercentileScorer {
    fn default() -> Self {
        Self::new(crate::types::ThresholdSettings::default().min_percentile_samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fails_closed_below_minimum_sample_size() {
        let scorer = PercentileScorer::new(24);
        let history: Vec<f64> = (0..23).map(|i| i as f64).collect();
        assert_eq!(scorer.percentile(&history, 10.0), None);
    }

    #[test]
    fn nine_value_window_scores_forty_four_point_four() {
        let scorer = PercentileScorer::new(5);
        let history = [1.0, 2.0, 3.0, 4.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        assert_eq!(scorer.percentile(&history, 5.0), Some(44.4));
    }

    #[test]
    fn minimum_scores_zero_and_beyond_maximum_scores_hundred() {
        let scorer = PercentileScorer::new(4);
        let history = [2.0, 4.0, 6.0, 8.0];
        assert_eq!(scorer.percentile(&history, 2.0), Some(0.0));
        assert_eq!(scorer.percentile(&history, 1.0), Some(0.0));
        assert_eq!(scorer.percentile(&history, 9.0), Some(100.0));
    }

    #[test]
    fn tie_with_a_unique_maximum_is_excluded_from_the_count() {
        let scorer = PercentileScorer::new(4);
        let history = [2.0, 4.0, 6.0, 8.0];
        // Three of four values lie strictly below.
        assert_eq!(scorer.percentile(&history, 8.0), Some(75.0));
    }

    #[test]
    fn score_is_always_within_bounds() {
        let scorer = PercentileScorer::new(1);
        let history = [5.0, 1.0, 3.0, 3.0, 9.0];
        for current in [-10.0, 0.0, 3.0, 5.5, 42.0] {
            let pct = scorer.percentile(&history, current).unwrap();
            assert!((0.0..=100.0).contains(&pct));
        }
    }
}
