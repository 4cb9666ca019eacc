//! Outlier detection
//!
//! Scores each daily total by its distance from the mean in population
//! standard deviations and reports the most extreme days together with the
//! sessions that made them up.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::stats::{self, RunningStats};
use crate::types::{AttributedInterval, DailyAggregate};

/// Default number of days reported
pub const DEFAULT_OUTLIER_COUNT: usize = 10;

/// A session of an outlier day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierSession {
    pub record_id: String,
    pub start: String,
    pub end: String,
    pub duration_hours: f64,
}

impl From<&AttributedInterval> for OutlierSession {
    fn from(attributed: &AttributedInterval) -> Self {
        let interval = &attributed.interval;
        Self {
            record_id: interval.record_id.clone(),
            start: interval.start_instant.format("%Y-%m-%d %H:%M").to_string(),
            end: interval.end_instant.format("%Y-%m-%d %H:%M").to_string(),
            duration_hours: interval.duration_hours,
        }
    }
}

/// A day ranked by its z-score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierDay {
    pub date: NaiveDate,
    pub total_hours: f64,
    /// `|total - mean| / std`
    pub z_score: f64,
    /// `total - mean` (hours, signed)
    pub deviation_hours: f64,
    pub session_count: usize,
    pub longest_session_hours: f64,
    pub weekday: String,
    /// Sessions sorted by duration, longest first
    pub sessions: Vec<OutlierSession>,
}

/// Outlier detection result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutlierReport {
    /// The daily series is empty
    NoData,
    /// Every daily total is identical; nothing to rank
    NoVariation { days: usize, value: f64 },
    Ranked {
        mean: f64,
        std_dev: f64,
        outliers: Vec<OutlierDay>,
    },
}

impl OutlierReport {
    pub fn outliers(&self) -> &[OutlierDay] {
        match self {
            OutlierReport::Ranked { outliers, .. } => outliers,
            _ => &[],
        }
    }
}

/// Detector ranking days by z-score
pub struct OutlierDetector;

impl OutlierDetector {
    /// Rank the `count` most extreme days.
    ///
    /// Equal z-scores keep date order.
    pub fn detect(
        daily: &[DailyAggregate],
        sessions: &[AttributedInterval],
        count: usize,
    ) -> OutlierReport {
        let totals: Vec<f64> = daily.iter().map(|d| d.total_hours).collect();
        let spread: RunningStats = totals.iter().copied().collect();
        let (Some(low), Some(high)) = (spread.min(), spread.max()) else {
            return OutlierReport::NoData;
        };

        // Equal decimals can leave a residual std of a few ulps.
        if low == high {
            return OutlierReport::NoVariation {
                days: daily.len(),
                value: low,
            };
        }

        let (Some(mean), Some(std_dev)) = (stats::mean(&totals), stats::population_std(&totals))
        else {
            return OutlierReport::NoData;
        };

        let mut scored: Vec<(f64, &DailyAggregate)> = daily
            .iter()
            .map(|d| ((d.total_hours - mean).abs() / std_dev, d))
            .collect();
        scored.sort_by_key(|(_, d)| d.date);
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        let outliers = scored
            .into_iter()
            .take(count)
            .map(|(z_score, day)| {
                let mut day_sessions: Vec<&AttributedInterval> = sessions
                    .iter()
                    .filter(|s| s.assigned_date == day.date)
                    .collect();
                day_sessions.sort_by(|a, b| {
                    b.interval
                        .duration_hours
                        .total_cmp(&a.interval.duration_hours)
                });

                OutlierDay {
                    date: day.date,
                    total_hours: day.total_hours,
                    z_score,
                    deviation_hours: day.total_hours - mean,
                    session_count: day.session_count,
                    longest_session_hours: day.longest_session_hours,
                    weekday: weekday_name(day.date).to_string(),
                    sessions: day_sessions.into_iter().map(OutlierSession::from).collect(),
                }
            })
            .collect();

        OutlierReport::Ranked {
            mean,
            std_dev,
            outliers,
        }
    }
}

/// Full English weekday name
pub fn weekday_name(date: NaiveDate) -> &'static str {
    match date.weekday() {
        chrono::Weekday::Mon => "Monday",
        chrono::Weekday::Tue => "Tuesday",
        chrono::Weekday::Wed => "Wednesday",
        chrono::Weekday::Thu => "Thursday",
        chrono::Weekday::Fri => "Friday",
        chrono::Weekday::Sat => "Saturday",
        chrono::Weekday::Sun => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NormalizedInterval;
    use chrono::{TimeDelta, TimeZone};
    use chrono_tz::Tz;

    fn day(d: u32, total_hours: f64, sessions: usize) -> DailyAggregate {
        DailyAggregate {
            date: NaiveDate::from_ymd_opt(2025, 5, d).unwrap(),
            total_hours,
            session_count: sessions,
            longest_session_hours: total_hours,
        }
    }

    fn session(id: &str, d: u32, hours: f64) -> AttributedInterval {
        let end = Tz::UTC.with_ymd_and_hms(2025, 5, d, 7, 0, 0).unwrap();
        AttributedInterval {
            assigned_date: end.date_naive(),
            interval: NormalizedInterval {
                record_id: id.to_string(),
                start_instant: end - TimeDelta::minutes((hours * 60.0) as i64),
                end_instant: end,
                duration_hours: hours,
                source_timezone_label: None,
                quality: Default::default(),
            },
        }
    }

    #[test]
    fn test_constant_series_has_no_variation() {
        let daily = vec![day(1, 7.0, 1), day(2, 7.0, 1), day(3, 7.0, 1)];
        assert_eq!(
            OutlierDetector::detect(&daily, &[], 10),
            OutlierReport::NoVariation {
                days: 3,
                value: 7.0
            }
        );
    }

    #[test]
    fn test_constant_decimal_series_has_no_variation() {
        for (value, n) in [(7.1, 7u32), (0.1, 10), (7.3, 30), (6.7, 3)] {
            let daily: Vec<_> = (1..=n).map(|d| day(d, value, 1)).collect();
            assert_eq!(
                OutlierDetector::detect(&daily, &[], 10),
                OutlierReport::NoVariation {
                    days: n as usize,
                    value
                },
                "constant series of {value} over {n} days"
            );
        }
    }

    #[test]
    fn test_empty_series_has_no_data() {
        assert_eq!(OutlierDetector::detect(&[], &[], 10), OutlierReport::NoData);
    }

    #[test]
    fn test_ranks_by_z_score() {
        // mean 7, population std 1.5811...
        let daily = vec![day(1, 7.0, 1), day(2, 4.0, 1), day(3, 7.0, 1), day(4, 9.0, 2), day(5, 8.0, 1)];
        let report = OutlierDetector::detect(&daily, &[], 2);

        let outliers = report.outliers();
        assert_eq!(outliers.len(), 2);
        assert_eq!(outliers[0].date.day(), 2);
        assert_eq!(outliers[1].date.day(), 4);
        assert!(outliers[0].z_score > outliers[1].z_score);
        assert!((outliers[0].deviation_hours + 3.0).abs() < 1e-12);
        assert_eq!(outliers[0].weekday, "Friday");
    }

    #[test]
    fn test_ties_keep_date_order() {
        let daily = vec![day(3, 9.0, 1), day(1, 5.0, 1), day(2, 7.0, 1)];
        let report = OutlierDetector::detect(&daily, &[], 3);

        let dates: Vec<u32> = report.outliers().iter().map(|o| o.date.day()).collect();
        assert_eq!(dates, vec![1, 3, 2]);
    }

    #[test]
    fn test_sessions_sorted_longest_first() {
        let daily = vec![day(1, 7.0, 1), day(2, 9.0, 2), day(3, 7.0, 1)];
        let sessions = vec![
            session("a", 1, 7.0),
            session("nap", 2, 1.5),
            session("night", 2, 7.5),
            session("c", 3, 7.0),
        ];
        let report = OutlierDetector::detect(&daily, &sessions, 1);

        let top = &report.outliers()[0];
        assert_eq!(top.date.day(), 2);
        let ids: Vec<&str> = top.sessions.iter().map(|s| s.record_id.as_str()).collect();
        assert_eq!(ids, vec!["night", "nap"]);
    }
}
