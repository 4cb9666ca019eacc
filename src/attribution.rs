//! Sleep-day attribution
//!
//! Decides which calendar day each normalized interval belongs to. Under the
//! wake-day policy an interval that crosses midnight counts toward the day the
//! sleeper woke up on; all other intervals count toward their start date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{AttributedInterval, NormalizedInterval};

/// Rule for assigning a midnight-crossing interval to a calendar day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributionPolicy {
    /// Assign to the end date when the dates differ
    #[default]
    #[serde(rename = "wake-day")]
    WakeDay,
}

impl AttributionPolicy {
    /// Date an interval spanning `start_date..end_date` is attributed to
    pub fn assign(self, start_date: NaiveDate, end_date: NaiveDate) -> NaiveDate {
        match self {
            AttributionPolicy::WakeDay => {
                if end_date != start_date {
                    end_date
                } else {
                    start_date
                }
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AttributionPolicy::WakeDay => "wake-day",
        }
    }
}

impl std::str::FromStr for AttributionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wake-day" | "wake_day" => Ok(AttributionPolicy::WakeDay),
            other => Err(format!("unknown attribution policy '{other}'")),
        }
    }
}

/// Attributor assigning normalized intervals to calendar days
pub struct SleepDayAttributor;

impl SleepDayAttributor {
    /// Calendar day a single interval belongs to
    pub fn assigned_date(interval: &NormalizedInterval, policy: AttributionPolicy) -> NaiveDate {
        policy.assign(
            interval.start_instant.date_naive(),
            interval.end_instant.date_naive(),
        )
    }

    /// Attribute every interval, preserving input order
    pub fn attribute(
        intervals: Vec<NormalizedInterval>,
        policy: AttributionPolicy,
    ) -> Vec<AttributedInterval> {
        intervals
            .into_iter()
            .map(|interval| AttributedInterval {
                assigned_date: Self::assigned_date(&interval, policy),
                interval,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::localize;
    use chrono::NaiveDateTime;
    use std::collections::BTreeMap;

    fn interval(start: &str, end: &str) -> NormalizedInterval {
        let parse = |s: &str| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap();
        NormalizedInterval {
            record_id: "1".to_string(),
            start_instant: localize(parse(start), "America/Chicago").instant,
            end_instant: localize(parse(end), "America/Chicago").instant,
            duration_hours: 8.0,
            source_timezone_label: Some("America/Chicago".to_string()),
            quality: BTreeMap::new(),
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_cross_midnight_goes_to_wake_day() {
        let interval = interval("2025-01-15 22:30", "2025-01-16 06:30");
        assert_eq!(
            SleepDayAttributor::assigned_date(&interval, AttributionPolicy::WakeDay),
            date("2025-01-16")
        );
    }

    #[test]
    fn test_same_day_interval_keeps_start_date() {
        let nap = interval("2025-01-16 13:00", "2025-01-16 14:30");
        let early = interval("2025-01-16 00:30", "2025-01-16 07:00");

        assert_eq!(
            SleepDayAttributor::assigned_date(&nap, AttributionPolicy::WakeDay),
            date("2025-01-16")
        );
        assert_eq!(
            SleepDayAttributor::assigned_date(&early, AttributionPolicy::WakeDay),
            date("2025-01-16")
        );
    }

    #[test]
    fn test_attribute_preserves_order() {
        let attributed = SleepDayAttributor::attribute(
            vec![
                interval("2025-01-17 23:00", "2025-01-18 07:00"),
                interval("2025-01-15 22:00", "2025-01-16 06:00"),
            ],
            AttributionPolicy::default(),
        );

        assert_eq!(attributed[0].assigned_date, date("2025-01-18"));
        assert_eq!(attributed[1].assigned_date, date("2025-01-16"));
    }

    #[test]
    fn test_policy_serde_name() {
        let json = serde_json::to_string(&AttributionPolicy::WakeDay).unwrap();
        assert_eq!(json, "\"wake-day\"");
        assert_eq!("wake-day".parse::<AttributionPolicy>(), Ok(AttributionPolicy::WakeDay));
        assert!("bed-day".parse::<AttributionPolicy>().is_err());
    }
}
