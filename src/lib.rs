//! Somnolog - Batch analytics engine for overnight sleep-tracking logs
//!
//! Somnolog turns a log of sleep intervals, each recorded in its own local
//! timezone, into a per-day sleep model through a deterministic pipeline:
//! timezone normalization → sleep-day attribution → daily aggregation →
//! derived statistical views.
//!
//! ## Modules
//!
//! - **Core pipeline**: normalizer, attribution, aggregator
//! - **Daily views**: coverage gaps, rolling variance, outliers, weekday variability
//! - **Interval views**: time-of-day occupancy histogram, timing patterns, quality metrics, integrity checks
//! - **Ingestion**: JSON / NDJSON interval logs in the export's column layout

pub mod aggregator;
pub mod attribution;
pub mod cache;
pub mod config;
pub mod coverage;
pub mod error;
pub mod histogram;
pub mod ingest;
pub mod integrity;
pub mod normalizer;
pub mod outliers;
pub mod pipeline;
pub mod quality;
pub mod stats;
pub mod timing;
pub mod types;
pub mod variance;
pub mod weekday;

pub use attribution::AttributionPolicy;
pub use config::PipelineConfig;
pub use error::ComputeError;
pub use ingest::{IntervalAdapter, IntervalRecord};
pub use normalizer::{localize, TemporalNormalizer};
pub use pipeline::{analyze, analyze_json, AnalysisReport, SleepProcessor};
pub use types::{
    AttributedInterval, DailyAggregate, Diagnostics, Gap, NormalizedInterval, Notice,
    OccupancySlot, RawInterval,
};

/// Somnolog version embedded in every report
pub const SOMNOLOG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "somnolog";
