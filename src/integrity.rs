//! Data integrity checks
//!
//! Flags recording problems that the daily model would otherwise hide:
//! - Consecutive intervals that overlap in time
//! - Days whose total exceeds a plausible amount of sleep

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::stats::RunningStats;
use crate::types::{DailyAggregate, NormalizedInterval};

/// Daily totals above this are reported as suspicious (hours)
pub const MAX_REASONABLE_DAILY_SLEEP_HOURS: f64 = 12.0;

/// Two intervals recorded over the same stretch of time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlap {
    pub first_id: String,
    pub second_id: String,
    /// Time from the second start to the first end (hours)
    pub overlap_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapSummary {
    pub count: usize,
    pub mean_hours: f64,
    pub max_hours: f64,
    pub min_hours: f64,
}

/// A day with an implausibly large total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspiciousDay {
    pub date: NaiveDate,
    pub total_hours: f64,
    pub session_count: usize,
    pub longest_session_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub overlaps: Vec<Overlap>,
    /// Absent when no overlaps were found
    pub overlap_summary: Option<OverlapSummary>,
    pub suspicious_days: Vec<SuspiciousDay>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.overlaps.is_empty() && self.suspicious_days.is_empty()
    }
}

pub struct IntegrityChecker;

impl IntegrityChecker {
    pub fn check(intervals: &[NormalizedInterval], daily: &[DailyAggregate]) -> IntegrityReport {
        let overlaps = Self::find_overlaps(intervals);

        let stats: RunningStats = overlaps.iter().map(|o| o.overlap_hours).collect();
        let overlap_summary = match (stats.mean(), stats.max(), stats.min()) {
            (Some(mean_hours), Some(max_hours), Some(min_hours)) => Some(OverlapSummary {
                count: stats.count(),
                mean_hours,
                max_hours,
                min_hours,
            }),
            _ => None,
        };

        let suspicious_days: Vec<SuspiciousDay> = daily
            .iter()
            .filter(|d| d.total_hours > MAX_REASONABLE_DAILY_SLEEP_HOURS)
            .map(|d| SuspiciousDay {
                date: d.date,
                total_hours: d.total_hours,
                session_count: d.session_count,
                longest_session_hours: d.longest_session_hours,
            })
            .collect();

        if !overlaps.is_empty() || !suspicious_days.is_empty() {
            log::warn!(
                "Integrity check found {} overlapping pairs and {} days over {} h",
                overlaps.len(),
                suspicious_days.len(),
                MAX_REASONABLE_DAILY_SLEEP_HOURS
            );
        }

        IntegrityReport {
            overlaps,
            overlap_summary,
            suspicious_days,
        }
    }

    /// Overlaps between neighbours in start order
    pub fn find_overlaps(intervals: &[NormalizedInterval]) -> Vec<Overlap> {
        let mut sorted: Vec<&NormalizedInterval> = intervals.iter().collect();
        sorted.sort_by_key(|i| i.start_instant);

        sorted
            .windows(2)
            .filter(|pair| pair[0].end_instant > pair[1].start_instant)
            .map(|pair| Overlap {
                first_id: pair[0].record_id.clone(),
                second_id: pair[1].record_id.clone(),
                overlap_hours: (pair[0].end_instant - pair[1].start_instant).num_seconds() as f64
                    / 3600.0,
            })
            .collect()
    }
}
