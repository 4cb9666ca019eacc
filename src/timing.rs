//! Sleep timing patterns
//!
//! Bedtime and wake time of each interval as decimal hours of the local day,
//! plus circular-aware averages. Times after noon are treated as belonging to
//! the evening before so that 23:00 and 01:00 average to midnight, not noon.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::outliers::weekday_name;
use crate::stats;
use crate::types::NormalizedInterval;

const SECONDS_PER_DAY: i64 = 86_400;

/// Day-to-day bedtime shifts of this size or more are treated as schedule breaks
const MAX_BEDTIME_SHIFT_HOURS: f64 = 12.0;

/// Timing of a single interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingEntry {
    pub record_id: String,
    /// Weekday of the start
    pub weekday: String,
    /// Start as decimal hours of the local day
    pub bedtime_hours: f64,
    /// End as decimal hours of the local day
    pub wake_time_hours: f64,
    /// `wake_time_hours`, plus 24 when it precedes the bedtime
    pub wake_time_continuous: f64,
    pub wakes_next_day: bool,
    pub time_in_bed_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingSummary {
    /// Circular mean bedtime (decimal hours, 0..24)
    pub mean_bedtime_hours: f64,
    /// Circular mean wake time (decimal hours, 0..24)
    pub mean_wake_time_hours: f64,
    pub mean_time_in_bed_hours: f64,
    /// Mean absolute change in bedtime between consecutive intervals,
    /// ignoring shifts of 12 hours or more
    pub mean_bedtime_shift_hours: Option<f64>,
    pub next_day_wakes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingPatterns {
    /// Entries in start order
    pub entries: Vec<TimingEntry>,
    /// Absent when there are no intervals
    pub summary: Option<TimingSummary>,
}

pub struct TimingAnalyzer;

impl TimingAnalyzer {
    pub fn analyze(intervals: &[NormalizedInterval]) -> TimingPatterns {
        let mut sorted: Vec<&NormalizedInterval> = intervals.iter().collect();
        sorted.sort_by_key(|i| i.start_instant);

        let entries: Vec<TimingEntry> = sorted
            .iter()
            .map(|interval| {
                let bedtime_hours = decimal_hours(&interval.start_instant.time());
                let wake_time_hours = decimal_hours(&interval.end_instant.time());
                let wakes_next_day = wake_time_hours < bedtime_hours;
                TimingEntry {
                    record_id: interval.record_id.clone(),
                    weekday: weekday_name(interval.start_instant.date_naive()).to_string(),
                    bedtime_hours,
                    wake_time_hours,
                    wake_time_continuous: if wakes_next_day {
                        wake_time_hours + 24.0
                    } else {
                        wake_time_hours
                    },
                    wakes_next_day,
                    time_in_bed_hours: interval.span_hours(),
                }
            })
            .collect();

        let bedtimes: Vec<NaiveTime> = sorted.iter().map(|i| i.start_instant.time()).collect();
        let wake_times: Vec<NaiveTime> = sorted.iter().map(|i| i.end_instant.time()).collect();
        let in_bed: Vec<f64> = entries.iter().map(|e| e.time_in_bed_hours).collect();

        let shifts: Vec<f64> = entries
            .windows(2)
            .map(|pair| (pair[1].bedtime_hours - pair[0].bedtime_hours).abs())
            .filter(|shift| *shift < MAX_BEDTIME_SHIFT_HOURS)
            .collect();

        let summary = match (
            mean_time(&bedtimes),
            mean_time(&wake_times),
            stats::mean(&in_bed),
        ) {
            (Some(bed), Some(wake), Some(mean_time_in_bed_hours)) => Some(TimingSummary {
                mean_bedtime_hours: bed,
                mean_wake_time_hours: wake,
                mean_time_in_bed_hours,
                mean_bedtime_shift_hours: stats::mean(&shifts),
                next_day_wakes: entries.iter().filter(|e| e.wakes_next_day).count(),
            }),
            _ => None,
        };

        TimingPatterns { entries, summary }
    }
}

fn decimal_hours(time: &NaiveTime) -> f64 {
    time.hour() as f64 + time.minute() as f64 / 60.0
}

/// Seconds from midnight, with afternoon and evening mapped to negative values
fn map_time(time: &NaiveTime) -> i64 {
    let mut h = time.hour() as i64;
    if h > 12 {
        h -= 24;
    }
    h * 3600 + time.minute() as i64 * 60 + time.second() as i64
}

/// Mean time of day as decimal hours in `0..24`
fn mean_time(times: &[NaiveTime]) -> Option<f64> {
    if times.is_empty() {
        return None;
    }
    let mut mean = times.iter().map(map_time).sum::<i64>() / times.len() as i64;
    if mean < 0 {
        mean += SECONDS_PER_DAY;
    }
    Some(mean as f64 / 3600.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Tz;

    fn interval(id: &str, start: (u32, u32, u32), end: (u32, u32, u32)) -> NormalizedInterval {
        NormalizedInterval {
            record_id: id.to_string(),
            start_instant: Tz::UTC.with_ymd_and_hms(2025, 1, start.0, start.1, start.2, 0).unwrap(),
            end_instant: Tz::UTC.with_ymd_and_hms(2025, 1, end.0, end.1, end.2, 0).unwrap(),
            duration_hours: 8.0,
            source_timezone_label: None,
            quality: Default::default(),
        }
    }

    #[test]
    fn test_overnight_entry() {
        let patterns = TimingAnalyzer::analyze(&[interval("1", (15, 22, 30), (16, 6, 30))]);

        let entry = &patterns.entries[0];
        assert!((entry.bedtime_hours - 22.5).abs() < 1e-12);
        assert!((entry.wake_time_hours - 6.5).abs() < 1e-12);
        assert!((entry.wake_time_continuous - 30.5).abs() < 1e-12);
        assert!(entry.wakes_next_day);
        assert!((entry.time_in_bed_hours - 8.0).abs() < 1e-12);
        assert_eq!(entry.weekday, "Wednesday");
    }

    #[test]
    fn test_mean_bedtime_wraps_midnight() {
        let patterns = TimingAnalyzer::analyze(&[
            interval("a", (10, 23, 0), (11, 7, 0)),
            interval("b", (12, 1, 0), (12, 9, 0)),
        ]);

        let summary = patterns.summary.unwrap();
        assert!(summary.mean_bedtime_hours.abs() < 1e-12);
        assert!((summary.mean_wake_time_hours - 8.0).abs() < 1e-12);
        assert_eq!(summary.next_day_wakes, 1);
    }

    #[test]
    fn test_mean_bedtime_before_midnight() {
        let patterns = TimingAnalyzer::analyze(&[
            interval("a", (10, 22, 0), (11, 6, 0)),
            interval("b", (11, 23, 0), (12, 7, 0)),
        ]);

        let summary = patterns.summary.unwrap();
        assert!((summary.mean_bedtime_hours - 22.5).abs() < 1e-12);
        assert_eq!(summary.mean_bedtime_shift_hours, Some(1.0));
    }

    #[test]
    fn test_large_bedtime_shifts_are_ignored() {
        let patterns = TimingAnalyzer::analyze(&[
            interval("night", (10, 23, 0), (11, 7, 0)),
            interval("nap", (11, 9, 0), (11, 10, 0)),
        ]);

        // |9 - 23| = 14 is a schedule break
        assert_eq!(patterns.summary.unwrap().mean_bedtime_shift_hours, None);
    }

    #[test]
    fn test_empty() {
        let patterns = TimingAnalyzer::analyze(&[]);
        assert!(patterns.entries.is_empty());
        assert_eq!(patterns.summary, None);
    }
}
