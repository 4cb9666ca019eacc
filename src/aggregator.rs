//! Daily aggregation
//!
//! Partitions attributed intervals by their assigned date and sums every
//! session. A day with a nap and a night's sleep reports both.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{AttributedInterval, DailyAggregate, Diagnostics, Notice};

/// Summary counts from the aggregation stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingInfo {
    /// Intervals that contributed to a daily total
    pub total_intervals: usize,
    /// Distinct attributed dates
    pub unique_days: usize,
    /// `total_intervals - unique_days`
    pub multi_session_days: usize,
    /// Contributing intervals whose start and end dates differ
    pub cross_midnight_count: usize,
    /// Intervals dropped for a zero, negative or non-finite duration
    pub excluded_non_positive: usize,
}

/// Output of the aggregation stage
#[derive(Debug, Clone)]
pub struct AggregationOutcome {
    /// One aggregate per attributed date, in date order
    pub daily: Vec<DailyAggregate>,
    /// Contributing intervals, in input order
    pub sessions: Vec<AttributedInterval>,
    pub info: ProcessingInfo,
    pub diagnostics: Diagnostics,
}

impl AggregationOutcome {
    /// Sessions attributed to `date`
    pub fn sessions_on(&self, date: NaiveDate) -> impl Iterator<Item = &AttributedInterval> {
        self.sessions.iter().filter(move |s| s.assigned_date == date)
    }
}

/// Aggregator summing sessions per calendar day
pub struct DailyAggregator;

impl DailyAggregator {
    pub fn aggregate(intervals: Vec<AttributedInterval>) -> AggregationOutcome {
        let mut diagnostics = Diagnostics::new();
        let mut by_day: BTreeMap<NaiveDate, DailyAggregate> = BTreeMap::new();
        let mut sessions = Vec::with_capacity(intervals.len());
        let mut cross_midnight_count = 0;

        for attributed in intervals {
            let hours = attributed.interval.duration_hours;
            if !hours.is_finite() || hours <= 0.0 {
                diagnostics.exclude(Notice::NonPositiveDuration {
                    record_id: attributed.interval.record_id.clone(),
                    duration_hours: hours,
                });
                continue;
            }

            if attributed.interval.crosses_midnight() {
                cross_midnight_count += 1;
            }

            let day = by_day
                .entry(attributed.assigned_date)
                .or_insert_with(|| DailyAggregate {
                    date: attributed.assigned_date,
                    total_hours: 0.0,
                    session_count: 0,
                    longest_session_hours: 0.0,
                });
            day.total_hours += hours;
            day.session_count += 1;
            day.longest_session_hours = day.longest_session_hours.max(hours);

            sessions.push(attributed);
        }

        let total_intervals = sessions.len();
        let unique_days = by_day.len();
        let info = ProcessingInfo {
            total_intervals,
            unique_days,
            multi_session_days: total_intervals - unique_days,
            cross_midnight_count,
            excluded_non_positive: diagnostics.excluded,
        };

        log::info!(
            "Aggregated {} intervals into {} days ({} additional sessions, {} cross midnight)",
            info.total_intervals,
            info.unique_days,
            info.multi_session_days,
            info.cross_midnight_count
        );

        AggregationOutcome {
            daily: by_day.into_values().collect(),
            sessions,
            info,
            diagnostics,
        }
    }
}
