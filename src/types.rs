//! Core types for the Somnolog pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw intervals, normalized intervals, attributed intervals, daily
//! aggregates, and the diagnostics that accompany every stage.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A sleep interval as recorded by the tracking device.
///
/// `start_local` and `end_local` carry no zone; they are wall-clock readings in
/// `source_timezone`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawInterval {
    /// Record identifier from the export
    pub id: String,
    /// IANA zone the record was captured in (e.g., "America/Chicago")
    #[serde(default)]
    pub source_timezone: Option<String>,
    /// Wall-clock start in the source zone
    #[serde(default)]
    pub start_local: Option<NaiveDateTime>,
    /// Wall-clock end in the source zone
    #[serde(default)]
    pub end_local: Option<NaiveDateTime>,
    /// Tracked sleep duration (hours)
    pub duration_hours: f64,
    /// Numeric quality attributes (deep_sleep, cycles, snore, noise, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub quality: BTreeMap<String, f64>,
}

impl RawInterval {
    /// Create a complete interval without quality attributes
    pub fn new(
        id: impl Into<String>,
        source_timezone: Option<&str>,
        start_local: NaiveDateTime,
        end_local: NaiveDateTime,
        duration_hours: f64,
    ) -> Self {
        Self {
            id: id.into(),
            source_timezone: source_timezone.map(str::to_string),
            start_local: Some(start_local),
            end_local: Some(end_local),
            duration_hours,
            quality: BTreeMap::new(),
        }
    }

    /// Attach a quality attribute
    pub fn with_quality(mut self, name: impl Into<String>, value: f64) -> Self {
        self.quality.insert(name.into(), value);
        self
    }

    /// Whether both endpoints are present
    pub fn is_complete(&self) -> bool {
        self.start_local.is_some() && self.end_local.is_some()
    }
}

/// An interval whose endpoints are absolute instants in the target timezone.
///
/// Invariant: `end_instant > start_instant`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedInterval {
    /// Identifier of the originating raw record
    pub record_id: String,
    /// Start instant in the target zone
    pub start_instant: DateTime<Tz>,
    /// End instant in the target zone
    pub end_instant: DateTime<Tz>,
    /// Tracked sleep duration (hours), carried over from the raw record
    pub duration_hours: f64,
    /// Zone label of the raw record, if it had one
    pub source_timezone_label: Option<String>,
    /// Numeric quality attributes carried over from the raw record
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub quality: BTreeMap<String, f64>,
}

impl NormalizedInterval {
    /// Whether the local start and end dates differ
    pub fn crosses_midnight(&self) -> bool {
        self.start_instant.date_naive() != self.end_instant.date_naive()
    }

    /// Wall time between the endpoints (hours)
    pub fn span_hours(&self) -> f64 {
        (self.end_instant - self.start_instant).num_seconds() as f64 / 3600.0
    }
}

/// A normalized interval assigned to one calendar day.
///
/// Invariant: `assigned_date` is the start or the end date of the interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributedInterval {
    #[serde(flatten)]
    pub interval: NormalizedInterval,
    pub assigned_date: NaiveDate,
}

/// Total sleep attributed to one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    /// Sum of every contributing session (hours)
    pub total_hours: f64,
    /// Number of contributing sessions (always >= 1)
    pub session_count: usize,
    /// Longest single session of the day (hours); display annotation only
    pub longest_session_hours: f64,
}

/// A maximal run of consecutive calendar days without a recording
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration_days: i64,
}

/// One time-of-day bin of the occupancy histogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancySlot {
    /// Slot index, 0 starts at local midnight
    pub slot_index: usize,
    /// Slot start as "HH:MM"
    pub time_of_day_label: String,
    /// Sleep accumulated in this slot across all intervals (hours)
    pub accumulated_hours: f64,
    /// Polar angle of the slot start (degrees, clockwise from midnight)
    pub degrees: f64,
}

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

/// Structured data-quality notice raised by a stage.
///
/// Notices never abort a run; they travel with the stage output so a consumer
/// can show them next to the results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// No record in the input carries a timezone label
    TimezoneColumnAbsent { records: usize },
    /// Record has no timezone label; treated as already in the target zone
    MissingTimezone { record_id: String },
    /// Record's timezone label is not a known zone; treated as UTC
    UnknownTimezone { record_id: String, zone: String },
    /// Configured target zone is not a known zone; UTC is used instead
    InvalidTargetTimezone { zone: String },
    /// Wall-clock time occurs twice in the source zone; the later one was used
    AmbiguousLocalTime {
        record_id: String,
        local: NaiveDateTime,
    },
    /// Wall-clock time falls in a DST gap; shifted forward past the gap
    NonexistentLocalTime {
        record_id: String,
        local: NaiveDateTime,
    },
    /// Record lacks a start or end and was passed through unconverted
    MissingEndpoint { record_id: String },
    /// Record's end does not come after its start
    NonPositiveSpan { record_id: String },
    /// Record's duration is zero, negative or not finite
    NonPositiveDuration {
        record_id: String,
        duration_hours: f64,
    },
    /// Record's duration field is not numeric
    NonNumericDuration { record_id: String },
    /// A quality attribute is not numeric and was dropped
    NonNumericQuality { record_id: String, field: String },
    /// A timestamp could not be parsed
    UnparseableTimestamp {
        record_id: String,
        field: String,
        value: String,
    },
    /// Record starts outside the configured target year
    OutsideTargetYear { record_id: String, year: i32 },
    /// Summary of timezone conversion
    ConversionSummary {
        succeeded: usize,
        attempted: usize,
        target_timezone: String,
    },
}

impl Notice {
    pub fn severity(&self) -> Severity {
        match self {
            Notice::OutsideTargetYear { .. } | Notice::ConversionSummary { .. } => Severity::Info,
            _ => Severity::Warning,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::TimezoneColumnAbsent { records } => write!(
                f,
                "No timezone information found in {records} records; times treated as target-zone wall clock"
            ),
            Notice::MissingTimezone { record_id } => write!(
                f,
                "Record {record_id} has no timezone; treated as target-zone wall clock"
            ),
            Notice::UnknownTimezone { record_id, zone } => {
                write!(f, "Record {record_id} has unknown timezone '{zone}'; using UTC")
            }
            Notice::InvalidTargetTimezone { zone } => {
                write!(f, "Invalid target timezone '{zone}'; using UTC instead")
            }
            Notice::AmbiguousLocalTime { record_id, local } => write!(
                f,
                "Record {record_id}: {local} is ambiguous in its zone; using the standard-time reading"
            ),
            Notice::NonexistentLocalTime { record_id, local } => write!(
                f,
                "Record {record_id}: {local} does not exist in its zone; shifted past the transition"
            ),
            Notice::MissingEndpoint { record_id } => {
                write!(f, "Record {record_id} is missing a start or end time")
            }
            Notice::NonPositiveSpan { record_id } => {
                write!(f, "Record {record_id} ends at or before its start")
            }
            Notice::NonPositiveDuration {
                record_id,
                duration_hours,
            } => write!(
                f,
                "Record {record_id} has non-positive duration ({duration_hours} h)"
            ),
            Notice::NonNumericDuration { record_id } => {
                write!(f, "Record {record_id} has a non-numeric duration")
            }
            Notice::NonNumericQuality { record_id, field } => {
                write!(f, "Record {record_id}: quality field '{field}' is not numeric")
            }
            Notice::UnparseableTimestamp {
                record_id,
                field,
                value,
            } => write!(f, "Record {record_id}: cannot parse {field} '{value}'"),
            Notice::OutsideTargetYear { record_id, year } => {
                write!(f, "Record {record_id} starts in {year}, outside the target year")
            }
            Notice::ConversionSummary {
                succeeded,
                attempted,
                target_timezone,
            } => write!(
                f,
                "Converted {succeeded}/{attempted} timestamps to {target_timezone}"
            ),
        }
    }
}

/// Diagnostics record returned alongside every stage result
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    /// Notices in the order they were raised
    pub notices: Vec<Notice>,
    /// Number of records excluded by the stage
    pub excluded: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a notice
    pub fn push(&mut self, notice: Notice) {
        match notice.severity() {
            Severity::Warning => log::warn!("{notice}"),
            Severity::Info => log::info!("{notice}"),
        }
        self.notices.push(notice);
    }

    /// Record a notice for a record that the stage drops
    pub fn exclude(&mut self, notice: Notice) {
        self.excluded += 1;
        self.push(notice);
    }

    /// Append another stage's diagnostics
    pub fn merge(&mut self, other: Diagnostics) {
        self.excluded += other.excluded;
        self.notices.extend(other.notices);
    }

    /// Number of warning-level notices
    pub fn warning_count(&self) -> usize {
        self.notices
            .iter()
            .filter(|n| n.severity() == Severity::Warning)
            .count()
    }

    pub fn is_clean(&self) -> bool {
        self.excluded == 0 && self.warning_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_counts_exclusions() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(Notice::MissingTimezone {
            record_id: "1".to_string(),
        });
        diagnostics.exclude(Notice::NonPositiveSpan {
            record_id: "2".to_string(),
        });

        assert_eq!(diagnostics.excluded, 1);
        assert_eq!(diagnostics.notices.len(), 2);
        assert_eq!(diagnostics.warning_count(), 2);
        assert!(!diagnostics.is_clean());
    }

    #[test]
    fn test_info_notices_keep_diagnostics_clean() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(Notice::ConversionSummary {
            succeeded: 4,
            attempted: 4,
            target_timezone: "UTC".to_string(),
        });

        assert!(diagnostics.is_clean());
    }

    #[test]
    fn test_notice_serializes_with_kind_tag() {
        let notice = Notice::UnknownTimezone {
            record_id: "42".to_string(),
            zone: "Mars/Olympus".to_string(),
        };
        let json = serde_json::to_value(&notice).unwrap();

        assert_eq!(json["kind"], "unknown_timezone");
        assert_eq!(json["zone"], "Mars/Olympus");
        assert!(notice.to_string().contains("using UTC"));
    }
}
