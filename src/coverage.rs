//! Recording coverage
//!
//! Finds calendar days inside the observed range that have no recording and
//! collapses them into maximal gap ranges.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::{DailyAggregate, Gap};

/// Per-day session statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub mean_sessions_per_day: f64,
    pub max_sessions_per_day: usize,
    /// Days with more than one session
    pub multi_session_days: usize,
}

/// Coverage of the observed date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    /// Days in `first_date..=last_date`
    pub total_days_in_range: i64,
    pub recorded_days: usize,
    pub missing_days: usize,
    /// `recorded_days / total_days_in_range * 100`
    pub recording_rate_percent: f64,
    pub gaps: Vec<Gap>,
    pub session_stats: SessionStats,
}

impl CoverageReport {
    pub fn longest_gap(&self) -> Option<&Gap> {
        self.gaps.iter().max_by_key(|g| g.duration_days)
    }
}

/// Analyzer for missing days and gap ranges
pub struct CoverageAnalyzer;

impl CoverageAnalyzer {
    /// Analyze the daily series; `None` when there are no recorded days
    pub fn analyze(daily: &[DailyAggregate]) -> Option<CoverageReport> {
        let present: BTreeSet<NaiveDate> = daily.iter().map(|d| d.date).collect();
        let first_date = *present.first()?;
        let last_date = *present.last()?;

        let total_days_in_range = (last_date - first_date).num_days() + 1;
        let gaps = Self::find_gaps(&present);
        let missing_days = gaps.iter().map(|g| g.duration_days as usize).sum();

        let counts: Vec<usize> = daily.iter().map(|d| d.session_count).collect();
        let session_stats = SessionStats {
            mean_sessions_per_day: counts.iter().sum::<usize>() as f64 / counts.len() as f64,
            max_sessions_per_day: counts.iter().copied().max().unwrap_or(0),
            multi_session_days: counts.iter().filter(|&&c| c > 1).count(),
        };

        Some(CoverageReport {
            first_date,
            last_date,
            total_days_in_range,
            recorded_days: present.len(),
            missing_days,
            recording_rate_percent: present.len() as f64 / total_days_in_range as f64 * 100.0,
            gaps,
            session_stats,
        })
    }

    /// Maximal runs of absent days between the first and last present date
    pub fn find_gaps(present: &BTreeSet<NaiveDate>) -> Vec<Gap> {
        let mut gaps = Vec::new();
        let mut previous: Option<NaiveDate> = None;

        for &date in present {
            if let Some(prev) = previous {
                let step = (date - prev).num_days();
                if step > 1 {
                    if let (Some(start_date), Some(end_date)) = (prev.succ_opt(), date.pred_opt()) {
                        gaps.push(Gap {
                            start_date,
                            end_date,
                            duration_days: step - 1,
                        });
                    }
                }
            }
            previous = Some(date);
        }

        gaps
    }
}
