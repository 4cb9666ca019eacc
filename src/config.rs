//! Pipeline configuration
//!
//! Configuration is validated once, before any stage runs; it is the only
//! source of hard failures inside the pipeline. An unknown target timezone is
//! not one of them: the normalizer falls back to UTC and reports it.

use serde::{Deserialize, Serialize};

use crate::attribution::AttributionPolicy;
use crate::error::ComputeError;
use crate::histogram::DEFAULT_INTERVAL_MINUTES;
use crate::outliers::DEFAULT_OUTLIER_COUNT;
use crate::variance::DEFAULT_VARIANCE_WINDOW;

/// Default target timezone
pub const DEFAULT_TARGET_TIMEZONE: &str = "America/Chicago";

/// Settings for one analysis run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// IANA zone every interval is converted into
    pub target_timezone: String,
    /// Rule for midnight-crossing intervals
    pub attribution_policy: AttributionPolicy,
    /// Rolling variance window in data points (>= 2)
    pub variance_window_days: usize,
    /// Number of outlier days reported (>= 1)
    pub outlier_count: usize,
    /// Occupancy slot width in minutes (must divide 1440)
    pub histogram_interval_minutes: u32,
    /// Keep only records starting in this year
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_year: Option<i32>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_timezone: DEFAULT_TARGET_TIMEZONE.to_string(),
            attribution_policy: AttributionPolicy::WakeDay,
            variance_window_days: DEFAULT_VARIANCE_WINDOW,
            outlier_count: DEFAULT_OUTLIER_COUNT,
            histogram_interval_minutes: DEFAULT_INTERVAL_MINUTES,
            target_year: None,
        }
    }
}

impl PipelineConfig {
    pub fn with_target_timezone(mut self, zone: impl Into<String>) -> Self {
        self.target_timezone = zone.into();
        self
    }

    pub fn with_target_year(mut self, year: i32) -> Self {
        self.target_year = Some(year);
        self
    }

    /// Check every numeric parameter
    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.variance_window_days < 2 {
            return Err(ComputeError::InvalidConfig(format!(
                "variance_window_days must be at least 2, got {}",
                self.variance_window_days
            )));
        }
        if self.outlier_count < 1 {
            return Err(ComputeError::InvalidConfig(
                "outlier_count must be at least 1".to_string(),
            ));
        }
        if self.histogram_interval_minutes == 0 || 1440 % self.histogram_interval_minutes != 0 {
            return Err(ComputeError::InvalidConfig(format!(
                "histogram_interval_minutes must divide 1440, got {}",
                self.histogram_interval_minutes
            )));
        }
        Ok(())
    }

    /// Load configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Save configuration to JSON
    pub fn to_json(&self) -> Result<String, ComputeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
