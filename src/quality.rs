//! Sleep quality attributes
//!
//! Descriptive statistics for each numeric quality attribute found on the
//! intervals (deep sleep share, cycles, snoring, noise, ...) and its Pearson
//! correlation with the tracked duration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::stats::{self, RunningStats};
use crate::types::NormalizedInterval;

/// Attributes reported first, in this order, when present
pub const QUALITY_METRICS: [&str; 4] = ["deep_sleep", "cycles", "snore", "noise"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub name: String,
    /// Intervals carrying the attribute
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; absent below two values
    pub std_dev: Option<f64>,
    pub min: f64,
    pub max: f64,
    /// Pearson correlation with `duration_hours`; absent when undefined
    pub duration_correlation: Option<f64>,
}

pub struct QualityAnalyzer;

impl QualityAnalyzer {
    pub fn summarize(intervals: &[NormalizedInterval]) -> Vec<MetricSummary> {
        let mut by_metric: BTreeMap<&str, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
        for interval in intervals {
            for (name, &value) in &interval.quality {
                if !value.is_finite() {
                    continue;
                }
                let (values, durations) = by_metric.entry(name.as_str()).or_default();
                values.push(value);
                durations.push(interval.duration_hours);
            }
        }

        let mut names: Vec<&str> = QUALITY_METRICS
            .iter()
            .copied()
            .filter(|name| by_metric.contains_key(name))
            .collect();
        names.extend(
            by_metric
                .keys()
                .copied()
                .filter(|name| !QUALITY_METRICS.contains(name)),
        );

        names
            .into_iter()
            .filter_map(|name| {
                let (values, durations) = by_metric.get(name)?;
                let running: RunningStats = values.iter().copied().collect();
                Some(MetricSummary {
                    name: name.to_string(),
                    count: running.count(),
                    mean: running.mean()?,
                    std_dev: running.sample_std(),
                    min: running.min()?,
                    max: running.max()?,
                    duration_correlation: stats::pearson(values, durations),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use chrono_tz::Tz;

    fn interval(hours: f64, quality: &[(&str, f64)]) -> NormalizedInterval {
        let start = Tz::UTC.with_ymd_and_hms(2025, 8, 1, 22, 0, 0).unwrap();
        NormalizedInterval {
            record_id: "q".to_string(),
            start_instant: start,
            end_instant: start + TimeDelta::minutes((hours * 60.0) as i64),
            duration_hours: hours,
            source_timezone_label: None,
            quality: quality.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    #[test]
    fn test_summary_and_correlation() {
        let intervals = vec![
            interval(6.0, &[("cycles", 4.0), ("snore", 30.0)]),
            interval(7.0, &[("cycles", 5.0), ("snore", 20.0)]),
            interval(8.0, &[("cycles", 6.0), ("snore", 10.0)]),
        ];
        let summary = QualityAnalyzer::summarize(&intervals);

        let names: Vec<&str> = summary.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["cycles", "snore"]);

        let cycles = &summary[0];
        assert_eq!(cycles.count, 3);
        assert!((cycles.mean - 5.0).abs() < 1e-12);
        assert!((cycles.std_dev.unwrap() - 1.0).abs() < 1e-12);
        assert!((cycles.duration_correlation.unwrap() - 1.0).abs() < 1e-12);
        assert!((summary[1].duration_correlation.unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_metric_has_no_correlation() {
        let intervals = vec![
            interval(6.0, &[("noise", 2.0)]),
            interval(8.0, &[("noise", 2.0)]),
        ];
        let summary = QualityAnalyzer::summarize(&intervals);

        assert_eq!(summary[0].duration_correlation, None);
        assert_eq!(summary[0].std_dev, Some(0.0));
    }

    #[test]
    fn test_extra_metrics_follow_known_ones() {
        let intervals = vec![interval(7.0, &[("rating", 4.0), ("deep_sleep", 0.3)])];
        let summary = QualityAnalyzer::summarize(&intervals);

        let names: Vec<&str> = summary.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["deep_sleep", "rating"]);
        assert_eq!(summary[0].std_dev, None);
    }
}
