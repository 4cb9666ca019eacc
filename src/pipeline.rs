//! Pipeline orchestration
//!
//! This module provides the public API for Somnolog.
//! It runs the full pipeline from raw intervals to an analysis report.

use serde::Serialize;
use uuid::Uuid;

use crate::aggregator::{DailyAggregator, ProcessingInfo};
use crate::attribution::SleepDayAttributor;
use crate::cache::{cache_key, document_cache_key, AnalysisCache};
use crate::config::PipelineConfig;
use crate::coverage::{CoverageAnalyzer, CoverageReport};
use crate::error::ComputeError;
use crate::histogram::{CyclicOccupancyHistogram, OccupancyHistogram};
use crate::ingest::{IngestOutcome, IntervalAdapter};
use crate::integrity::{IntegrityChecker, IntegrityReport};
use crate::normalizer::{ConversionReport, TemporalNormalizer};
use crate::outliers::{OutlierDetector, OutlierReport};
use crate::quality::{MetricSummary, QualityAnalyzer};
use crate::timing::{TimingAnalyzer, TimingPatterns};
use crate::types::{DailyAggregate, Diagnostics, NormalizedInterval, RawInterval};
use crate::variance::{RollingVariance, VarianceTracker};
use crate::weekday::{WeekdayVariability, WeekdayVariabilityAnalyzer};
use crate::{PRODUCER_NAME, SOMNOLOG_VERSION};

/// Provenance of a report
#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub producer: String,
    pub version: String,
    pub run_id: Uuid,
    /// Zone all instants are expressed in
    pub target_timezone: String,
    pub attribution_policy: String,
    /// Raw intervals handed to the pipeline
    pub input_records: usize,
}

/// Every view derived from one interval log
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub meta: ReportMeta,
    pub conversion: ConversionReport,
    pub processing_info: ProcessingInfo,
    pub daily: Vec<DailyAggregate>,
    /// Absent when no day has a recording
    pub coverage: Option<CoverageReport>,
    pub rolling_variance: RollingVariance,
    pub outliers: OutlierReport,
    pub weekday_variability: WeekdayVariability,
    pub occupancy: OccupancyHistogram,
    pub timing: TimingPatterns,
    pub quality: Vec<MetricSummary>,
    pub integrity: IntegrityReport,
    /// Records passed through without both endpoints
    pub incomplete_records: Vec<String>,
    pub diagnostics: Diagnostics,
}

impl AnalysisReport {
    pub fn to_json(&self) -> Result<String, ComputeError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, ComputeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Sum of daily totals (hours)
    pub fn total_hours(&self) -> f64 {
        self.daily.iter().map(|d| d.total_hours).sum()
    }
}

/// Analyze raw intervals.
///
/// Pipeline stages:
/// 1. TemporalNormalizer - Convert every interval into the target zone
/// 2. CyclicOccupancyHistogram - Bin minutes by time of day
/// 3. SleepDayAttributor - Assign each interval to a calendar day
/// 4. DailyAggregator - Sum sessions per day
/// 5. Daily views - Coverage, rolling variance, outliers, weekday variability
///
/// # Example
/// ```ignore
/// let report = analyze(&intervals, &PipelineConfig::default())?;
/// println!("{}", report.to_json_pretty()?);
/// ```
pub fn analyze(
    intervals: &[RawInterval],
    config: &PipelineConfig,
) -> Result<AnalysisReport, ComputeError> {
    run(intervals, config, Diagnostics::new())
}

/// Parse a JSON array of interval records and analyze it
pub fn analyze_json(raw_json: &str, config: &PipelineConfig) -> Result<AnalysisReport, ComputeError> {
    config.validate()?;
    let ingested = IntervalAdapter::ingest_json(raw_json, config.target_year)?;
    analyze_ingested(ingested, config)
}

/// Analyze the output of the ingestion adapter, keeping its notices
pub fn analyze_ingested(
    ingested: IngestOutcome,
    config: &PipelineConfig,
) -> Result<AnalysisReport, ComputeError> {
    run(&ingested.intervals, config, ingested.diagnostics)
}

fn run(
    intervals: &[RawInterval],
    config: &PipelineConfig,
    mut diagnostics: Diagnostics,
) -> Result<AnalysisReport, ComputeError> {
    config.validate()?;
    let histogram = CyclicOccupancyHistogram::new(config.histogram_interval_minutes)?;
    let run_id = Uuid::new_v4();

    log::info!(
        "Run {} analyzing {} intervals into {}",
        run_id,
        intervals.len(),
        config.target_timezone
    );

    // Stage 1: Normalize timezones
    let normalized = TemporalNormalizer::normalize(intervals, &config.target_timezone);
    diagnostics.merge(normalized.diagnostics);

    // Stage 2: Attribute to calendar days
    let attributed =
        SleepDayAttributor::attribute(normalized.intervals, config.attribution_policy);

    // Stage 3: Aggregate per day, dropping non-positive durations
    let aggregation = DailyAggregator::aggregate(attributed);
    diagnostics.merge(aggregation.diagnostics);
    let contributing: Vec<NormalizedInterval> = aggregation
        .sessions
        .iter()
        .map(|s| s.interval.clone())
        .collect();

    // Stage 4: Views over contributing intervals
    let occupancy = histogram.accumulate(&contributing);
    let timing = TimingAnalyzer::analyze(&contributing);
    let quality = QualityAnalyzer::summarize(&contributing);
    let integrity = IntegrityChecker::check(&contributing, &aggregation.daily);

    // Stage 5: Views over the daily series
    let coverage = CoverageAnalyzer::analyze(&aggregation.daily);
    let rolling_variance = VarianceTracker::track(&aggregation.daily, config.variance_window_days);
    let outliers = OutlierDetector::detect(
        &aggregation.daily,
        &aggregation.sessions,
        config.outlier_count,
    );
    let weekday_variability = WeekdayVariabilityAnalyzer::analyze(&aggregation.daily);

    Ok(AnalysisReport {
        meta: ReportMeta {
            producer: PRODUCER_NAME.to_string(),
            version: SOMNOLOG_VERSION.to_string(),
            run_id,
            target_timezone: normalized.report.target_timezone.clone(),
            attribution_policy: config.attribution_policy.as_str().to_string(),
            input_records: intervals.len(),
        },
        conversion: normalized.report,
        processing_info: aggregation.info,
        daily: aggregation.daily,
        coverage,
        rolling_variance,
        outliers,
        weekday_variability,
        occupancy,
        timing,
        quality,
        integrity,
        incomplete_records: normalized.incomplete.into_iter().map(|r| r.id).collect(),
        diagnostics,
    })
}

/// Processor that remembers finished reports.
///
/// Use this when the same log may be analyzed repeatedly with the same
/// settings, e.g. from an interactive front end.
pub struct SleepProcessor {
    config: PipelineConfig,
    cache: AnalysisCache,
}

impl Default for SleepProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl SleepProcessor {
    /// Create a processor with default settings
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            cache: AnalysisCache::new(),
        }
    }

    /// Create a processor with the given settings
    pub fn with_config(config: PipelineConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            config,
            cache: AnalysisCache::new(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Analyze raw intervals, reusing a stored report for identical input
    pub fn process(&mut self, intervals: &[RawInterval]) -> Result<AnalysisReport, ComputeError> {
        let key = cache_key(intervals, &self.config)?;
        if let Some(report) = self.cache.get(&key) {
            return Ok(report.clone());
        }

        let report = analyze(intervals, &self.config)?;
        self.cache.insert(key, report.clone());
        Ok(report)
    }

    /// Parse and analyze a JSON array of interval records
    pub fn process_json(&mut self, raw_json: &str) -> Result<AnalysisReport, ComputeError> {
        let key = document_cache_key(raw_json, &self.config)?;
        if let Some(report) = self.cache.get(&key) {
            return Ok(report.clone());
        }

        let ingested = IntervalAdapter::ingest_json(raw_json, self.config.target_year)?;
        let report = analyze_ingested(ingested, &self.config)?;
        self.cache.insert(key, report.clone());
        Ok(report)
    }

    /// Number of stored reports
    pub fn cached_reports(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}
