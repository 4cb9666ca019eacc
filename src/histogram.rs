//! Cyclic time-of-day occupancy
//!
//! Every whole minute of every interval is binned by its local time of day
//! into fixed-width slots starting at midnight. Intervals that cross midnight
//! wrap around to slot 0.
//!
//! Minutes are walked in runs over which the zone offset stays constant, so a
//! run advances the time of day linearly and can be spread over slots without
//! visiting each minute.

use chrono::{DateTime, Offset, TimeDelta, Timelike};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ComputeError;
use crate::types::{NormalizedInterval, OccupancySlot};

/// Default slot width in minutes
pub const DEFAULT_INTERVAL_MINUTES: u32 = 15;

const MINUTES_PER_DAY: u32 = 1440;

/// Occupancy over one day's worth of slots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancyHistogram {
    pub interval_minutes: u32,
    pub slots: Vec<OccupancySlot>,
}

impl OccupancyHistogram {
    pub fn total_hours(&self) -> f64 {
        self.slots.iter().map(|s| s.accumulated_hours).sum()
    }

    /// Share of sleep in slots starting at or after 21:00 or at or before 08:00
    pub fn nighttime_share_percent(&self) -> Option<f64> {
        let total = self.total_hours();
        if total <= 0.0 {
            return None;
        }
        let night: f64 = self
            .slots
            .iter()
            .filter(|s| {
                let start = s.slot_index as u32 * self.interval_minutes;
                start >= 21 * 60 || start <= 8 * 60
            })
            .map(|s| s.accumulated_hours)
            .sum();
        Some(night / total * 100.0)
    }

    /// Busiest slot starting between 10:00 and 19:00 inclusive
    pub fn daytime_peak(&self) -> Option<&OccupancySlot> {
        self.slots
            .iter()
            .filter(|s| {
                let start = s.slot_index as u32 * self.interval_minutes;
                (10 * 60..=19 * 60).contains(&start)
            })
            .filter(|s| s.accumulated_hours > 0.0)
            .fold(None, |best: Option<&OccupancySlot>, slot| match best {
                Some(b) if b.accumulated_hours >= slot.accumulated_hours => Some(b),
                _ => Some(slot),
            })
    }
}

/// Histogram builder for a fixed slot width
#[derive(Debug, Clone)]
pub struct CyclicOccupancyHistogram {
    interval_minutes: u32,
    /// Accumulated minutes per slot
    minutes: Vec<u64>,
}

impl Default for CyclicOccupancyHistogram {
    fn default() -> Self {
        Self {
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            minutes: vec![0; (MINUTES_PER_DAY / DEFAULT_INTERVAL_MINUTES) as usize],
        }
    }
}

impl CyclicOccupancyHistogram {
    /// Create a builder; `interval_minutes` must divide 1440
    pub fn new(interval_minutes: u32) -> Result<Self, ComputeError> {
        if interval_minutes == 0 || MINUTES_PER_DAY % interval_minutes != 0 {
            return Err(ComputeError::InvalidConfig(format!(
                "histogram interval must divide 1440 minutes, got {interval_minutes}"
            )));
        }
        Ok(Self {
            interval_minutes,
            minutes: vec![0; (MINUTES_PER_DAY / interval_minutes) as usize],
        })
    }

    pub fn slot_count(&self) -> usize {
        self.minutes.len()
    }

    /// Bin every interval and produce the histogram
    pub fn accumulate(mut self, intervals: &[NormalizedInterval]) -> OccupancyHistogram {
        for interval in intervals {
            self.add(interval.start_instant, interval.end_instant);
        }
        self.finish()
    }

    /// Bin the whole minutes of `[start, end)`
    pub fn add(&mut self, start: DateTime<Tz>, end: DateTime<Tz>) {
        let total = (end - start).num_seconds().max(0) / 60;
        let mut walked = 0;

        while walked < total {
            let instant = start + TimeDelta::minutes(walked);
            let run = constant_offset_run(instant, total - walked);
            let minute_of_day = instant.hour() * 60 + instant.minute();
            self.add_run(minute_of_day, run as u64);
            walked += run;
        }
    }

    /// Spread `count` consecutive minutes starting at `minute_of_day`
    fn add_run(&mut self, mut minute_of_day: u32, mut count: u64) {
        let width = self.interval_minutes;
        let slots = self.minutes.len();

        // Whole days land evenly in every slot
        let days = count / u64::from(MINUTES_PER_DAY);
        if days > 0 {
            for slot in self.minutes.iter_mut() {
                *slot += days * u64::from(width);
            }
            count %= u64::from(MINUTES_PER_DAY);
        }

        while count > 0 {
            let slot = (minute_of_day / width) as usize % slots;
            let room = u64::from(width - minute_of_day % width);
            let take = room.min(count);
            self.minutes[slot] += take;
            minute_of_day = (minute_of_day + take as u32) % MINUTES_PER_DAY;
            count -= take;
        }
    }

    fn finish(self) -> OccupancyHistogram {
        let n = self.minutes.len();
        let slots = self
            .minutes
            .iter()
            .enumerate()
            .map(|(slot_index, &minutes)| {
                let start = slot_index as u32 * self.interval_minutes;
                OccupancySlot {
                    slot_index,
                    time_of_day_label: format!("{:02}:{:02}", start / 60, start % 60),
                    accumulated_hours: minutes as f64 / 60.0,
                    degrees: slot_index as f64 * 360.0 / n as f64,
                }
            })
            .collect();

        OccupancyHistogram {
            interval_minutes: self.interval_minutes,
            slots,
        }
    }
}

/// Number of minutes from `instant` (at most `remaining`) sharing its UTC offset
fn constant_offset_run(instant: DateTime<Tz>, remaining: i64) -> i64 {
    let offset = instant.offset().fix();
    let same_offset = |minutes: i64| (instant + TimeDelta::minutes(minutes)).offset().fix() == offset;

    if same_offset(remaining - 1) {
        return remaining;
    }

    // Smallest step whose offset differs; offsets only change a few times a year
    let (mut lo, mut hi) = (0, remaining - 1);
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if same_offset(mid) {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    hi
}
