//! Timezone normalization
//!
//! This module converts each raw interval's wall-clock endpoints from the zone
//! the record was captured in to one target zone for the whole run.
//! - Records without a zone label are read as target-zone wall clock
//! - Unknown zone labels fall back to UTC
//! - Records missing an endpoint are passed through unconverted
//! - Records whose end is not after their start are excluded

use chrono::{DateTime, LocalResult, NaiveDateTime, Offset, TimeDelta, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::types::{Diagnostics, NormalizedInterval, Notice, RawInterval};

/// How a wall-clock reading mapped onto the zone's timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalTimeResolution {
    /// Exactly one instant matches
    Unique,
    /// The reading occurs twice (DST fall-back); the later instant was used
    Ambiguous,
    /// The reading falls in a DST gap; shifted forward by the gap length
    Nonexistent,
}

/// Result of [`localize`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Localized {
    pub instant: DateTime<Tz>,
    /// False when the zone id was not recognized and UTC was used
    pub zone_known: bool,
    pub resolution: LocalTimeResolution,
}

/// Timezone conversion counters for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionReport {
    /// Timestamps converted from their declared zone
    pub succeeded: usize,
    /// Timestamps the normalizer looked at (two per record)
    pub attempted: usize,
    /// Zone every instant is expressed in
    pub target_timezone: String,
}

impl ConversionReport {
    /// Success rate as a percentage, `None` when nothing was attempted
    pub fn success_rate(&self) -> Option<f64> {
        (self.attempted > 0).then(|| self.succeeded as f64 / self.attempted as f64 * 100.0)
    }
}

/// Output of the normalization stage
#[derive(Debug, Clone)]
pub struct NormalizationOutcome {
    /// Complete, well-ordered intervals in the target zone
    pub intervals: Vec<NormalizedInterval>,
    /// Records missing an endpoint, passed through unconverted
    pub incomplete: Vec<RawInterval>,
    pub report: ConversionReport,
    pub diagnostics: Diagnostics,
}

/// Parse an IANA zone id
pub fn resolve_zone(zone_id: &str) -> Option<Tz> {
    zone_id.trim().parse::<Tz>().ok()
}

/// Interpret a wall-clock reading in `zone_id`.
///
/// An unrecognized zone id resolves to UTC and is reported through
/// [`Localized::zone_known`].
pub fn localize(naive: NaiveDateTime, zone_id: &str) -> Localized {
    let (zone, zone_known) = match resolve_zone(zone_id) {
        Some(zone) => (zone, true),
        None => (Tz::UTC, false),
    };
    let (instant, resolution) = localize_in(naive, zone);

    Localized {
        instant,
        zone_known,
        resolution,
    }
}

/// Interpret a wall-clock reading in a known zone
pub fn localize_in(naive: NaiveDateTime, zone: Tz) -> (DateTime<Tz>, LocalTimeResolution) {
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(instant) => (instant, LocalTimeResolution::Unique),
        // The later reading carries the standard-time offset
        LocalResult::Ambiguous(_, latest) => (latest, LocalTimeResolution::Ambiguous),
        LocalResult::None => {
            // Read the time with the offset in force a day earlier, before the gap opened
            let before = zone
                .offset_from_utc_datetime(&(naive - TimeDelta::days(1)))
                .fix();
            let utc = naive - TimeDelta::seconds(i64::from(before.local_minus_utc()));
            (
                zone.from_utc_datetime(&utc),
                LocalTimeResolution::Nonexistent,
            )
        }
    }
}

/// Normalizer converting raw intervals into the target zone
pub struct TemporalNormalizer;

impl TemporalNormalizer {
    /// Normalize a batch of raw intervals into `target_timezone`
    pub fn normalize(intervals: &[RawInterval], target_timezone: &str) -> NormalizationOutcome {
        let mut diagnostics = Diagnostics::new();

        let (target, target_label) = match resolve_zone(target_timezone) {
            Some(zone) => (zone, zone.name().to_string()),
            None => {
                diagnostics.push(Notice::InvalidTargetTimezone {
                    zone: target_timezone.to_string(),
                });
                (Tz::UTC, Tz::UTC.name().to_string())
            }
        };

        let unlabeled = intervals
            .iter()
            .filter(|raw| zone_label(raw).is_none())
            .count();
        let column_absent = !intervals.is_empty() && unlabeled == intervals.len();
        if column_absent {
            diagnostics.push(Notice::TimezoneColumnAbsent {
                records: intervals.len(),
            });
        }

        let mut normalized = Vec::with_capacity(intervals.len());
        let mut incomplete = Vec::new();
        let mut succeeded = 0;
        let mut attempted = 0;

        for raw in intervals {
            attempted += 2;

            let (Some(start_local), Some(end_local)) = (raw.start_local, raw.end_local) else {
                diagnostics.exclude(Notice::MissingEndpoint {
                    record_id: raw.id.clone(),
                });
                incomplete.push(raw.clone());
                continue;
            };

            let (start, end) = match zone_label(raw) {
                None => {
                    if !column_absent {
                        diagnostics.push(Notice::MissingTimezone {
                            record_id: raw.id.clone(),
                        });
                    }
                    let start = localize_in(start_local, target);
                    let end = localize_in(end_local, target);
                    (start, end)
                }
                Some(label) => {
                    let start = localize(start_local, label);
                    let end = localize(end_local, label);
                    if start.zone_known {
                        succeeded += 2;
                    } else {
                        diagnostics.push(Notice::UnknownTimezone {
                            record_id: raw.id.clone(),
                            zone: label.to_string(),
                        });
                    }
                    (
                        (start.instant.with_timezone(&target), start.resolution),
                        (end.instant.with_timezone(&target), end.resolution),
                    )
                }
            };

            for ((_, resolution), local) in [(start, start_local), (end, end_local)] {
                report_resolution(&mut diagnostics, &raw.id, local, resolution);
            }

            let (start_instant, end_instant) = (start.0, end.0);
            if end_instant <= start_instant {
                diagnostics.exclude(Notice::NonPositiveSpan {
                    record_id: raw.id.clone(),
                });
                continue;
            }

            normalized.push(NormalizedInterval {
                record_id: raw.id.clone(),
                start_instant,
                end_instant,
                duration_hours: raw.duration_hours,
                source_timezone_label: zone_label(raw).map(str::to_string),
                quality: raw.quality.clone(),
            });
        }

        diagnostics.push(Notice::ConversionSummary {
            succeeded,
            attempted,
            target_timezone: target_label.clone(),
        });

        NormalizationOutcome {
            intervals: normalized,
            incomplete,
            report: ConversionReport {
                succeeded,
                attempted,
                target_timezone: target_label,
            },
            diagnostics,
        }
    }
}

/// Non-empty zone label of a record
fn zone_label(raw: &RawInterval) -> Option<&str> {
    raw.source_timezone
        .as_deref()
        .map(str::trim)
        .filter(|label| !label.is_empty())
}

fn report_resolution(
    diagnostics: &mut Diagnostics,
    record_id: &str,
    local: NaiveDateTime,
    resolution: LocalTimeResolution,
) {
    match resolution {
        LocalTimeResolution::Unique => {}
        LocalTimeResolution::Ambiguous => diagnostics.push(Notice::AmbiguousLocalTime {
            record_id: record_id.to_string(),
            local,
        }),
        LocalTimeResolution::Nonexistent => diagnostics.push(Notice::NonexistentLocalTime {
            record_id: record_id.to_string(),
            local,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    fn raw(id: &str, tz: Option<&str>, start: NaiveDateTime, end: NaiveDateTime) -> RawInterval {
        let hours = (end - start).num_minutes() as f64 / 60.0;
        RawInterval::new(id, tz, start, end, hours)
    }

    #[test]
    fn test_same_zone_leaves_wall_clock_unchanged() {
        let intervals = vec![raw(
            "1",
            Some("America/Chicago"),
            dt(2025, 1, 15, 22, 30),
            dt(2025, 1, 16, 6, 30),
        )];
        let outcome = TemporalNormalizer::normalize(&intervals, "America/Chicago");

        assert_eq!(outcome.intervals.len(), 1);
        let interval = &outcome.intervals[0];
        assert_eq!(interval.start_instant.naive_local(), dt(2025, 1, 15, 22, 30));
        assert_eq!(interval.end_instant.naive_local(), dt(2025, 1, 16, 6, 30));
        assert_eq!(outcome.report.succeeded, 2);
        assert_eq!(outcome.report.attempted, 2);
    }

    #[test]
    fn test_converts_between_zones() {
        // 23:45 in Los Angeles is 01:45 the next day in Chicago
        let intervals = vec![raw(
            "2",
            Some("America/Los_Angeles"),
            dt(2025, 1, 16, 23, 45),
            dt(2025, 1, 17, 7, 30),
        )];
        let outcome = TemporalNormalizer::normalize(&intervals, "America/Chicago");

        let interval = &outcome.intervals[0];
        assert_eq!(interval.start_instant.naive_local(), dt(2025, 1, 17, 1, 45));
        assert_eq!(interval.end_instant.naive_local(), dt(2025, 1, 17, 9, 30));
        assert_eq!(
            interval.source_timezone_label.as_deref(),
            Some("America/Los_Angeles")
        );
    }

    #[test]
    fn test_missing_timezone_passes_through_as_target_wall_clock() {
        let intervals = vec![
            raw("1", None, dt(2025, 3, 1, 23, 0), dt(2025, 3, 2, 7, 0)),
            raw(
                "2",
                Some("UTC"),
                dt(2025, 3, 2, 23, 0),
                dt(2025, 3, 3, 7, 0),
            ),
        ];
        let outcome = TemporalNormalizer::normalize(&intervals, "Europe/Paris");

        assert_eq!(outcome.intervals.len(), 2);
        assert_eq!(
            outcome.intervals[0].start_instant.naive_local(),
            dt(2025, 3, 1, 23, 0)
        );
        assert_eq!(outcome.report.succeeded, 2);
        assert_eq!(outcome.report.attempted, 4);
        assert!(outcome.diagnostics.notices.contains(&Notice::MissingTimezone {
            record_id: "1".to_string()
        }));
    }

    #[test]
    fn test_absent_timezone_column_reports_once() {
        let intervals = vec![
            raw("1", None, dt(2025, 3, 1, 23, 0), dt(2025, 3, 2, 7, 0)),
            raw("2", None, dt(2025, 3, 2, 23, 0), dt(2025, 3, 3, 7, 0)),
        ];
        let outcome = TemporalNormalizer::normalize(&intervals, "UTC");

        let column_notices = outcome
            .diagnostics
            .notices
            .iter()
            .filter(|n| matches!(n, Notice::TimezoneColumnAbsent { .. }))
            .count();
        let per_record = outcome
            .diagnostics
            .notices
            .iter()
            .filter(|n| matches!(n, Notice::MissingTimezone { .. }))
            .count();
        assert_eq!(column_notices, 1);
        assert_eq!(per_record, 0);
        assert_eq!(outcome.report.succeeded, 0);
    }

    #[test]
    fn test_unknown_timezone_falls_back_to_utc() {
        let intervals = vec![raw(
            "9",
            Some("Mars/Olympus_Mons"),
            dt(2025, 6, 1, 22, 0),
            dt(2025, 6, 2, 6, 0),
        )];
        let outcome = TemporalNormalizer::normalize(&intervals, "America/Chicago");

        // 22:00 UTC is 17:00 CDT
        let interval = &outcome.intervals[0];
        assert_eq!(interval.start_instant.naive_local(), dt(2025, 6, 1, 17, 0));
        assert_eq!(outcome.report.succeeded, 0);
        assert!(outcome
            .diagnostics
            .notices
            .iter()
            .any(|n| matches!(n, Notice::UnknownTimezone { zone, .. } if zone == "Mars/Olympus_Mons")));
    }

    #[test]
    fn test_invalid_target_zone_uses_utc() {
        let intervals = vec![raw(
            "1",
            Some("Europe/London"),
            dt(2025, 1, 10, 23, 0),
            dt(2025, 1, 11, 7, 0),
        )];
        let outcome = TemporalNormalizer::normalize(&intervals, "Nowhere/Special");

        assert_eq!(outcome.report.target_timezone, "UTC");
        assert_eq!(
            outcome.intervals[0].start_instant.naive_local(),
            dt(2025, 1, 10, 23, 0)
        );
        assert!(outcome
            .diagnostics
            .notices
            .contains(&Notice::InvalidTargetTimezone {
                zone: "Nowhere/Special".to_string()
            }));
    }

    #[test]
    fn test_missing_endpoint_passes_through_unconverted() {
        let mut incomplete = raw(
            "7",
            Some("UTC"),
            dt(2025, 2, 1, 23, 0),
            dt(2025, 2, 2, 7, 0),
        );
        incomplete.end_local = None;
        let outcome = TemporalNormalizer::normalize(&[incomplete.clone()], "UTC");

        assert!(outcome.intervals.is_empty());
        assert_eq!(outcome.incomplete, vec![incomplete]);
        assert_eq!(outcome.diagnostics.excluded, 1);
    }

    #[test]
    fn test_end_before_start_is_excluded() {
        let intervals = vec![raw(
            "3",
            Some("UTC"),
            dt(2025, 2, 2, 7, 0),
            dt(2025, 2, 2, 7, 0),
        )];
        let outcome = TemporalNormalizer::normalize(&intervals, "UTC");

        assert!(outcome.intervals.is_empty());
        assert!(outcome.incomplete.is_empty());
        assert_eq!(outcome.diagnostics.excluded, 1);
    }

    #[test]
    fn test_localize_ambiguous_uses_standard_time() {
        // 01:30 on 2025-11-02 happens twice in Chicago; CST is UTC-6
        let localized = localize(dt(2025, 11, 2, 1, 30), "America/Chicago");
        assert!(localized.zone_known);
        assert_eq!(localized.resolution, LocalTimeResolution::Ambiguous);
        assert_eq!(
            localized.instant.with_timezone(&Tz::UTC).naive_local(),
            dt(2025, 11, 2, 7, 30)
        );
    }

    #[test]
    fn test_localize_nonexistent_shifts_forward() {
        // 02:30 on 2025-03-09 does not exist in Chicago
        let localized = localize(dt(2025, 3, 9, 2, 30), "America/Chicago");
        assert_eq!(localized.resolution, LocalTimeResolution::Nonexistent);
        assert_eq!(localized.instant.hour(), 3);
        assert_eq!(localized.instant.minute(), 30);
    }

    #[test]
    fn test_success_rate() {
        let report = ConversionReport {
            succeeded: 3,
            attempted: 4,
            target_timezone: "UTC".to_string(),
        };
        assert_eq!(report.success_rate(), Some(75.0));
    }
}
