//! Interval log ingestion
//!
//! This module turns exported interval logs into [`RawInterval`]s. Records are
//! read leniently: the export's own column names (`Id`, `Tz`, `From`, `To`,
//! `Hours`, ...) are accepted next to snake_case ones, numbers may arrive as
//! strings, and per-record problems become notices instead of errors. Only a
//! document that is not valid JSON fails the whole parse.

use chrono::{DateTime, Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::ComputeError;
use crate::types::{Diagnostics, Notice, RawInterval};

/// Wall-clock formats accepted for `from` / `to`, tried in order
const TIMESTAMP_FORMATS: [&str; 5] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d. %m. %Y %H:%M",
];

/// Export column names of quality attributes and their canonical names
const QUALITY_FIELDS: [(&str, &str); 12] = [
    ("DeepSleep", "deep_sleep"),
    ("deep_sleep", "deep_sleep"),
    ("Cycles", "cycles"),
    ("cycles", "cycles"),
    ("Snore", "snore"),
    ("snore", "snore"),
    ("Noise", "noise"),
    ("noise", "noise"),
    ("Rating", "rating"),
    ("rating", "rating"),
    ("LenAdjust", "len_adjust"),
    ("len_adjust", "len_adjust"),
];

/// One record of an interval log, as exported
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntervalRecord {
    #[serde(default, alias = "Id")]
    pub id: Option<Value>,
    #[serde(default, alias = "Tz")]
    pub tz: Option<String>,
    #[serde(default, alias = "From")]
    pub from: Option<String>,
    #[serde(default, alias = "To")]
    pub to: Option<String>,
    #[serde(default, alias = "Hours")]
    pub hours: Option<Value>,
    /// Every other column (quality attributes, comments, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Result of converting records into raw intervals
#[derive(Debug, Clone, Default)]
pub struct IngestOutcome {
    pub intervals: Vec<RawInterval>,
    pub diagnostics: Diagnostics,
    /// Records skipped by the target-year filter
    pub outside_target_year: usize,
    /// Records dropped for a zero or negative duration
    pub non_positive: usize,
}

/// Adapter converting interval logs to raw intervals
pub struct IntervalAdapter;

impl IntervalAdapter {
    /// Parse a JSON array of records
    pub fn parse_array(json: &str) -> Result<Vec<IntervalRecord>, ComputeError> {
        let records: Vec<IntervalRecord> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (one record per line)
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<IntervalRecord>, ComputeError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<IntervalRecord>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Convert records to raw intervals.
    ///
    /// Records without a numeric duration, or with a duration that is zero or
    /// negative, are dropped. With `target_year` set, records whose start falls
    /// in another year are skipped; records without a parseable start are kept
    /// so the normalizer can report them.
    pub fn to_raw_intervals(records: &[IntervalRecord], target_year: Option<i32>) -> IngestOutcome {
        let mut outcome = IngestOutcome::default();

        for (index, record) in records.iter().enumerate() {
            let record_id = record_id(record, index);

            let Some(duration_hours) = record.hours.as_ref().and_then(numeric) else {
                outcome
                    .diagnostics
                    .exclude(Notice::NonNumericDuration { record_id });
                continue;
            };

            let start_local = timestamp(&mut outcome.diagnostics, &record_id, "from", &record.from);
            let end_local = timestamp(&mut outcome.diagnostics, &record_id, "to", &record.to);

            if let (Some(year), Some(start)) = (target_year, start_local) {
                if start.year() != year {
                    outcome.diagnostics.push(Notice::OutsideTargetYear {
                        record_id,
                        year: start.year(),
                    });
                    outcome.outside_target_year += 1;
                    continue;
                }
            }

            if duration_hours <= 0.0 {
                outcome.diagnostics.exclude(Notice::NonPositiveDuration {
                    record_id,
                    duration_hours,
                });
                outcome.non_positive += 1;
                continue;
            }

            let quality = quality(&mut outcome.diagnostics, &record_id, &record.extra);

            outcome.intervals.push(RawInterval {
                id: record_id,
                source_timezone: record
                    .tz
                    .as_deref()
                    .map(str::trim)
                    .filter(|tz| !tz.is_empty())
                    .map(str::to_string),
                start_local,
                end_local,
                duration_hours,
                quality,
            });
        }

        log::info!(
            "Ingested {} of {} records ({} outside target year, {} non-positive, {} rejected)",
            outcome.intervals.len(),
            records.len(),
            outcome.outside_target_year,
            outcome.non_positive,
            outcome.diagnostics.excluded - outcome.non_positive
        );

        outcome
    }

    /// Parse a JSON array and convert it in one step
    pub fn ingest_json(json: &str, target_year: Option<i32>) -> Result<IngestOutcome, ComputeError> {
        let records = Self::parse_array(json)?;
        Ok(Self::to_raw_intervals(&records, target_year))
    }
}

/// Parse a wall-clock timestamp in any accepted format
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

fn record_id(record: &IntervalRecord, index: usize) -> String {
    match &record.id {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => format!("#{index}"),
    }
}

/// Number or numeric string
fn numeric(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn timestamp(
    diagnostics: &mut Diagnostics,
    record_id: &str,
    field: &str,
    value: &Option<String>,
) -> Option<NaiveDateTime> {
    let raw = value.as_deref()?.trim();
    if raw.is_empty() {
        return None;
    }
    let parsed = parse_timestamp(raw);
    if parsed.is_none() {
        diagnostics.push(Notice::UnparseableTimestamp {
            record_id: record_id.to_string(),
            field: field.to_string(),
            value: raw.to_string(),
        });
    }
    parsed
}

fn quality(
    diagnostics: &mut Diagnostics,
    record_id: &str,
    extra: &BTreeMap<String, Value>,
) -> BTreeMap<String, f64> {
    let mut quality = BTreeMap::new();
    for (column, name) in QUALITY_FIELDS {
        let Some(value) = extra.get(column) else {
            continue;
        };
        match value {
            Value::Null => {}
            Value::String(s) if s.trim().is_empty() => {}
            _ => match numeric(value) {
                Some(number) => {
                    quality.insert(name.to_string(), number);
                }
                None => diagnostics.push(Notice::NonNumericQuality {
                    record_id: record_id.to_string(),
                    field: column.to_string(),
                }),
            },
        }
    }
    quality
}
