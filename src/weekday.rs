//! Weekday variability
//!
//! Groups daily totals by day of week (Monday first) and reports dispersion
//! statistics for each weekday that has data.

use chrono::{Datelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::stats;
use crate::types::DailyAggregate;

/// Dispersion statistics of one weekday
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayStats {
    /// Full English weekday name
    pub weekday: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; 0 for a single observation
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub range: f64,
    /// `std_dev / mean * 100`
    pub coefficient_of_variation: f64,
}

/// Weekday variability table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayVariability {
    /// Weekdays with data, Monday first
    pub days: Vec<WeekdayStats>,
    /// Weekday with the highest standard deviation
    pub most_variable: Option<String>,
    /// Weekday with the lowest standard deviation
    pub most_consistent: Option<String>,
}

const WEEKDAYS: [(Weekday, &str); 7] = [
    (Weekday::Mon, "Monday"),
    (Weekday::Tue, "Tuesday"),
    (Weekday::Wed, "Wednesday"),
    (Weekday::Thu, "Thursday"),
    (Weekday::Fri, "Friday"),
    (Weekday::Sat, "Saturday"),
    (Weekday::Sun, "Sunday"),
];

/// Analyzer grouping daily totals by weekday
pub struct WeekdayVariabilityAnalyzer;

impl WeekdayVariabilityAnalyzer {
    pub fn analyze(daily: &[DailyAggregate]) -> WeekdayVariability {
        let days: Vec<WeekdayStats> = WEEKDAYS
            .iter()
            .filter_map(|&(weekday, name)| {
                let totals: Vec<f64> = daily
                    .iter()
                    .filter(|d| d.date.weekday() == weekday)
                    .map(|d| d.total_hours)
                    .collect();
                Self::describe(name, &totals)
            })
            .collect();

        // Ties go to the earlier weekday
        let mut most_variable: Option<&WeekdayStats> = None;
        let mut most_consistent: Option<&WeekdayStats> = None;
        for stats in &days {
            if most_variable.map_or(true, |best| stats.std_dev > best.std_dev) {
                most_variable = Some(stats);
            }
            if most_consistent.map_or(true, |best| stats.std_dev < best.std_dev) {
                most_consistent = Some(stats);
            }
        }

        WeekdayVariability {
            most_variable: most_variable.map(|s| s.weekday.clone()),
            most_consistent: most_consistent.map(|s| s.weekday.clone()),
            days,
        }
    }

    fn describe(name: &str, totals: &[f64]) -> Option<WeekdayStats> {
        let mean = stats::mean(totals)?;
        let median = stats::median(totals)?;
        let min = totals.iter().copied().fold(f64::INFINITY, f64::min);
        let max = totals.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let std_dev = stats::sample_variance(totals).map_or(0.0, f64::sqrt);
        let coefficient_of_variation = if mean > 0.0 {
            std_dev / mean * 100.0
        } else {
            0.0
        };

        Some(WeekdayStats {
            weekday: name.to_string(),
            count: totals.len(),
            mean,
            std_dev,
            min,
            max,
            median,
            range: max - min,
            coefficient_of_variation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(start: NaiveDate, totals: &[f64]) -> Vec<DailyAggregate> {
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
    fn test_single_observation_per_weekday() {
        // 2025-01-06 is a Monday
        let monday = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        let result = WeekdayVariabilityAnalyzer::analyze(&series(
            monday,
            &[6.0, 7.0, 8.0, 6.0, 7.0, 8.0, 6.0],
        ));

        assert_eq!(result.days.len(), 7);
        assert_eq!(result.days[0].weekday, "Monday");
        assert_eq!(result.days[6].weekday, "Sunday");
        for day in &result.days {
            assert_eq!(day.count, 1);
            assert_eq!(day.std_dev, 0.0);
            assert_eq!(day.range, 0.0);
            assert_eq!(day.coefficient_of_variation, 0.0);
        }
        assert_eq!(result.most_variable.as_deref(), Some("Monday"));
        assert_eq!(result.most_consistent.as_deref(), Some("Monday"));
    }

    #[test]
    fn test_two_weeks_dispersion() {
        let monday = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        let mut totals = vec![7.0; 14];
        totals[0] = 6.0; // Monday week 1
        totals[7] = 8.0; // Monday week 2
        let result = WeekdayVariabilityAnalyzer::analyze(&series(monday, &totals));

        let mon = &result.days[0];
        assert_eq!(mon.count, 2);
        assert!((mon.mean - 7.0).abs() < 1e-12);
        assert!((mon.std_dev - 2f64.sqrt()).abs() < 1e-12);
        assert!((mon.range - 2.0).abs() < 1e-12);
        assert!((mon.median - 7.0).abs() < 1e-12);
        assert!((mon.coefficient_of_variation - 2f64.sqrt() / 7.0 * 100.0).abs() < 1e-9);
        assert_eq!(result.most_variable.as_deref(), Some("Monday"));
        assert_eq!(result.most_consistent.as_deref(), Some("Tuesday"));
    }

    #[test]
    fn test_missing_weekdays_are_omitted() {
        let wednesday = NaiveDate::from_ymd_opt(2025, 1, 8).unwrap();
        let result = WeekdayVariabilityAnalyzer::analyze(&series(wednesday, &[7.0, 6.5]));

        let names: Vec<&str> = result.days.iter().map(|d| d.weekday.as_str()).collect();
        assert_eq!(names, vec!["Wednesday", "Thursday"]);
    }

    #[test]
    fn test_empty_series() {
        let result = WeekdayVariabilityAnalyzer::analyze(&[]);
        assert!(result.days.is_empty());
        assert_eq!(result.most_variable, None);
    }
}
