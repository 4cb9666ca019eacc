//! Rolling variance tracking
//!
//! This module keeps a fixed window over the date-sorted daily totals and
//! reports the sample variance, standard deviation and mean of each full
//! window. The window counts data points, not calendar days, so gaps in the
//! recording do not shrink it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::stats::RunningStats;
use crate::types::DailyAggregate;

/// Default window in data points
pub const DEFAULT_VARIANCE_WINDOW: usize = 10;

/// Statistics of one full window, keyed by its last date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingPoint {
    pub date: NaiveDate,
    /// Sample variance (denominator `W - 1`)
    pub variance: f64,
    pub std_dev: f64,
    pub mean: f64,
}

/// Qualitative reading of the average rolling variance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyBand {
    Excellent,
    Good,
    Moderate,
    High,
}

impl ConsistencyBand {
    pub fn from_variance(variance: f64) -> Self {
        if variance < 0.5 {
            ConsistencyBand::Excellent
        } else if variance < 1.0 {
            ConsistencyBand::Good
        } else if variance < 2.0 {
            ConsistencyBand::Moderate
        } else {
            ConsistencyBand::High
        }
    }
}

/// Summary over every rolling point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceSummary {
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub band: ConsistencyBand,
}

/// Rolling variance result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RollingVariance {
    /// Fewer data points than the window holds
    InsufficientData { window: usize, available: usize },
    Computed {
        window: usize,
        points: Vec<RollingPoint>,
        summary: VarianceSummary,
    },
}

impl RollingVariance {
    pub fn points(&self) -> &[RollingPoint] {
        match self {
            RollingVariance::InsufficientData { .. } => &[],
            RollingVariance::Computed { points, .. } => points,
        }
    }
}

/// Fixed-size window over a series of daily totals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarianceTracker {
    /// Trailing daily totals (hours)
    window: VecDeque<f64>,
    /// Number of data points per window
    window_size: usize,
}

impl Default for VarianceTracker {
    fn default() -> Self {
        Self::new(DEFAULT_VARIANCE_WINDOW)
    }
}

impl VarianceTracker {
    /// Create a tracker with the given window size
    pub fn new(window_size: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(window_size),
            window_size,
        }
    }

    /// Add the next daily total; returns `(variance, std_dev, mean)` once the
    /// window is full
    pub fn push(&mut self, total_hours: f64) -> Option<(f64, f64, f64)> {
        self.window.push_back(total_hours);
        while self.window.len() > self.window_size {
            self.window.pop_front();
        }
        if self.window.len() < self.window_size {
            return None;
        }

        let stats: RunningStats = self.window.iter().copied().collect();
        let variance = stats.sample_variance()?;
        let mean = stats.mean()?;
        Some((variance, variance.sqrt(), mean))
    }

    /// Rolling statistics over a daily series.
    ///
    /// The series is sorted by date first; callers may pass it in any order.
    pub fn track(daily: &[DailyAggregate], window_size: usize) -> RollingVariance {
        if window_size < 2 || daily.len() < window_size {
            return RollingVariance::InsufficientData {
                window: window_size,
                available: daily.len(),
            };
        }

        let mut sorted: Vec<&DailyAggregate> = daily.iter().collect();
        sorted.sort_by_key(|d| d.date);

        let mut tracker = Self::new(window_size);
        let points: Vec<RollingPoint> = sorted
            .iter()
            .filter_map(|day| {
                tracker
                    .push(day.total_hours)
                    .map(|(variance, std_dev, mean)| RollingPoint {
                        date: day.date,
                        variance,
                        std_dev,
                        mean,
                    })
            })
            .collect();

        let summary_stats: RunningStats = points.iter().map(|p| p.variance).collect();
        let (Some(average), Some(min), Some(max)) =
            (summary_stats.mean(), summary_stats.min(), summary_stats.max())
        else {
            return RollingVariance::InsufficientData {
                window: window_size,
                available: daily.len(),
            };
        };

        RollingVariance::Computed {
            window: window_size,
            points,
            summary: VarianceSummary {
                average,
                min,
                max,
                band: ConsistencyBand::from_variance(average),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats;

    fn series(totals: &[f64]) -> Vec<DailyAggregate> {
        let start = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        totals
            .iter()
            .zip(start.iter_days())
            .map(|(&total_hours, date)| DailyAggregate {
                date,
                total_hours,
                session_count: 1,
                longest_session_hours: total_hours,
            })
            .collect()
    }

    #[test]
    fn test_insufficient_data() {
        let result = VarianceTracker::track(&series(&[7.0; 9]), 10);
        assert_eq!(
            result,
            RollingVariance::InsufficientData {
                window: 10,
                available: 9
            }
        );
        assert!(result.points().is_empty());
    }

    #[test]
    fn test_window_uses_sample_variance() {
        let totals = [6.0, 7.0, 8.0, 5.0, 9.0];
        let result = VarianceTracker::track(&series(&totals), 3);

        let points = result.points();
        assert_eq!(points.len(), 3);
        // [6, 7, 8] -> mean 7, variance 1
        assert!((points[0].mean - 7.0).abs() < 1e-12);
        assert!((points[0].variance - 1.0).abs() < 1e-12);
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2025, 4, 3).unwrap());

        let expected = stats::sample_variance(&totals[2..5]).unwrap();
        assert!((points[2].variance - expected).abs() < 1e-12);
        assert!((points[2].std_dev - expected.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_unsorted_input_is_sorted_by_date() {
        let mut daily = series(&[6.0, 7.0, 8.0]);
        daily.reverse();
        let result = VarianceTracker::track(&daily, 3);

        let points = result.points();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2025, 4, 3).unwrap());
    }

    #[test]
    fn test_summary_band() {
        let result = VarianceTracker::track(&series(&[7.0, 7.0, 7.0, 7.0]), 2);
        match result {
            RollingVariance::Computed { summary, .. } => {
                assert_eq!(summary.average, 0.0);
                assert_eq!(summary.band, ConsistencyBand::Excellent);
            }
            other => panic!("expected computed variance, got {other:?}"),
        }

        assert_eq!(ConsistencyBand::from_variance(0.75), ConsistencyBand::Good);
        assert_eq!(ConsistencyBand::from_variance(1.5), ConsistencyBand::Moderate);
        assert_eq!(ConsistencyBand::from_variance(2.0), ConsistencyBand::High);
    }
}
