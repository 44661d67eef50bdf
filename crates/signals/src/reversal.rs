// In crates/signals/src/reversal.rs

use chrono::{DateTime, NaiveDateTime, Utc};
use core_types::SentimentSample;

use crate::types::ReversalSettings;

/// Sentiment values below this are the panic band.
const PANIC_BAND: f64 = 30.0;
/// Sentiment values above this are the greed band.
const GREED_BAND: f64 = 70.0;

/// Confirms a multi-period inflection away from an extreme sentiment band.
///
/// A single fearful reading is noise; a confirmed reversal requires the last K
/// historical readings to sit inside the extreme band and move monotonically
/// towards neutral, with the current reading continuing that move. The check is
/// evaluated fresh on every call and keeps no state of its own.
#[derive(Debug, Clone)]
pub struct ReversalDetector {
    settings: ReversalSettings,
}

impl ReversalDetector {
    pub fn new(settings: ReversalSettings) -> Self {
        Self { settings }
    }

    /// Checks `history` (strictly older than `now`) plus the `current` value
    /// for a confirmed panic or greed reversal.
    ///
    /// Samples whose timestamp falls within the configured tolerance of `now`
    /// are excluded so the current reading cannot leak into its own history;
    /// samples with unparseable timestamps are skipped outright.
    pub fn confirm(&self, history: &[SentimentSample], now: DateTime<Utc>, current: f64) -> bool {
        if !self.settings.enabled {
            return false;
        }
        let values = self.usable_values(history, now);
        self.confirm_values(&values, current)
    }

    /// The timestamp-free core check, also used by the historical backtest
    /// where the series is already one value per day.
    pub fn confirm_values(&self, history: &[f64], current: f64) -> bool {
        if !self.settings.enabled {
            return false;
        }
        if current < PANIC_BAND {
            self.confirmed_tail(history, current, |prev, next| {
                next > prev && next < PANIC_BAND
            })
        } else if current > GREED_BAND {
            self.confirmed_tail(history, current, |prev, next| {
                next < prev && next > GREED_BAND
            })
        } else {
            // Neutral readings never confirm anything.
            false
        }
    }

    /// Checks that the last K historical values all satisfy the band and that
    /// each step (including history -> current) moves in the right direction.
    fn confirmed_tail(
        &self,
        history: &[f64],
        current: f64,
        advances: impl Fn(f64, f64) -> bool,
    ) -> bool {
        let k = self.settings.consecutive_periods.max(1);
        if history.len() < k {
            return false;
        }

        let tail = &history[history.len() - k..];
        // Every tail value must be inside the band; the oldest one only has to
        // satisfy the band itself, the rest must also continue the move.
        if !in_band(tail[0], current) {
            return false;
        }
        for pair in tail.windows(2) {
            if !advances(pair[0], pair[1]) {
                return false;
            }
        }
        // The newest reading must keep the trend alive.
        advances(tail[k - 1], current)
    }

    fn usable_values(&self, history: &[SentimentSample], now: DateTime<Utc>) -> Vec<f64> {
        let tolerance = self.settings.sample_tolerance_secs;
        history
            .iter()
            .filter_map(|sample| {
                let ts = parse_timestamp(&sample.timestamp)?;
                if (now - ts).num_seconds().abs() < tolerance {
                    // Too close to "now": this is the current sample, not history.
                    None
                } else {
                    Some(sample.value)
                }
            })
            .collect()
    }
}

/// Whether `value` lies in the same extreme band `current` is probing.
fn in_band(value: f64, current: f64) -> bool {
    if current < PANIC_BAND {
        value < PANIC_BAND
    } else {
        value > GREED_BAND
    }
}

/// Parses a store timestamp: RFC 3339 first, then the plain
/// `YYYY-MM-DD HH:MM:SS` form SQLite emits.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn detector(periods: usize) -> ReversalDetector {
        ReversalDetector::new(ReversalSettings {
            enabled: true,
            consecutive_periods: periods,
            sample_tolerance_secs: 5,
        })
    }

    #[test]
    fn panic_reversal_confirms_on_a_rising_tail() {
        let d = detector(2);
        assert!(d.confirm_values(&[10.0, 15.0, 20.0, 25.0], 28.0));
    }

    #[test]
    fn descending_panic_series_does_not_confirm() {
        let d = detector(2);
        assert!(!d.confirm_values(&[25.0, 20.0, 18.0, 15.0], 20.0));
    }

    #[test]
    fn current_must_continue_the_rise() {
        let d = detector(2);
        assert!(!d.confirm_values(&[10.0, 15.0, 20.0, 25.0], 22.0));
    }

    #[test]
    fn stale_history_outside_the_band_does_not_confirm() {
        // The most recent historical point already left the panic band: the
        // trend is no longer live.
        let d = detector(2);
        assert!(!d.confirm_values(&[10.0, 15.0, 20.0, 32.0], 28.0));
    }

    #[test]
    fn equal_adjacent_values_break_the_chain() {
        let d = detector(2);
        assert!(!d.confirm_values(&[10.0, 20.0, 20.0], 25.0));
    }

    #[test]
    fn insufficient_history_fails_closed() {
        let d = detector(3);
        assert!(!d.confirm_values(&[20.0, 25.0], 28.0));
    }

    #[test]
    fn greed_reversal_is_the_mirror_image() {
        let d = detector(2);
        assert!(d.confirm_values(&[85.0, 80.0, 75.0, 72.0], 71.0));
        // 68 is not above the greed band, so the check never enters.
        assert!(!d.confirm_values(&[85.0, 80.0, 75.0, 72.0], 68.0));
        // Ascending greed series is not a reversal.
        assert!(!d.confirm_values(&[72.0, 75.0, 80.0, 85.0], 78.0));
        // History fell out of the band before now.
        assert!(!d.confirm_values(&[85.0, 80.0, 75.0, 68.0], 71.0));
    }

    #[test]
    fn neutral_current_never_confirms() {
        let d = detector(2);
        assert!(!d.confirm_values(&[45.0, 50.0, 55.0], 52.0));
    }

    #[test]
    fn longer_confirmation_windows_are_honoured() {
        let d = detector(3);
        assert!(d.confirm_values(&[10.0, 15.0, 20.0, 25.0], 28.0));
        // One equal step inside the longer window breaks it.
        assert!(!d.confirm_values(&[10.0, 15.0, 15.0, 25.0], 28.0));
    }

    #[test]
    fn disabled_detector_always_declines() {
        let d = ReversalDetector::new(ReversalSettings {
            enabled: false,
            ..ReversalSettings::default()
        });
        assert!(!d.confirm_values(&[10.0, 15.0, 20.0, 25.0], 28.0));
    }

    #[test]
    fn samples_near_now_are_excluded_from_history() {
        let d = detector(2);
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let history = vec![
            SentimentSample {
                timestamp: "2024-06-01 10:00:00".to_string(),
                value: 15.0,
            },
            SentimentSample {
                timestamp: "2024-06-01 11:00:00".to_string(),
                value: 20.0,
            },
            // Written 2 seconds before "now": this is the current sample
            // leaking back out of the store.
            SentimentSample {
                timestamp: "2024-06-01 11:59:58".to_string(),
                value: 28.0,
            },
        ];
        // With the leak excluded the tail is [15, 20] and 28 confirms.
        assert!(d.confirm(&history, now, 28.0));
        // Equal current would not continue the rise against 20 but would
        // against the contaminated 28 tail; the exclusion must win.
        assert!(!d.confirm(&history, now, 20.0));
    }

    #[test]
    fn unparseable_timestamps_are_skipped_not_coerced() {
        let d = detector(2);
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let history = vec![
            SentimentSample {
                timestamp: "not-a-timestamp".to_string(),
                value: 5.0,
            },
            SentimentSample {
                timestamp: "2024-06-01 10:00:00".to_string(),
                value: 15.0,
            },
            SentimentSample {
                timestamp: "2024-06-01 11:00:00".to_string(),
                value: 20.0,
            },
        ];
        assert!(d.confirm(&history, now, 28.0));

        // If skipping left too little history, the check fails closed.
        let short = vec![
            SentimentSample {
                timestamp: "garbage".to_string(),
                value: 15.0,
            },
            SentimentSample {
                timestamp: "2024-06-01 11:00:00".to_string(),
                value: 20.0,
            },
        ];
        assert!(!d.confirm(&short, now, 28.0));
    }
}
