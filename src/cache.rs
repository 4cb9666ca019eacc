//! Content-addressed report cache
//!
//! Reports are keyed by a SHA-256 digest of the raw input and the
//! configuration, so re-running an unchanged log with unchanged settings
//! returns the stored report.

use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};

use crate::config::PipelineConfig;
use crate::error::ComputeError;
use crate::pipeline::AnalysisReport;
use crate::types::RawInterval;

/// Hex SHA-256 over the canonical JSON of the input and the configuration
pub fn cache_key(intervals: &[RawInterval], config: &PipelineConfig) -> Result<String, ComputeError> {
    let mut hasher = Sha256::new();
    hasher.update(b"config:");
    hasher.update(serde_json::to_vec(config)?);
    hasher.update(b";intervals:");
    hasher.update(serde_json::to_vec(intervals)?);
    Ok(hex::encode(hasher.finalize()))
}

/// Hex SHA-256 over the configuration and the document text as received.
///
/// Covers records that ingestion rejects, whose notices are part of the report.
pub fn document_cache_key(document: &str, config: &PipelineConfig) -> Result<String, ComputeError> {
    let mut hasher = Sha256::new();
    hasher.update(b"config:");
    hasher.update(serde_json::to_vec(config)?);
    hasher.update(b";document:");
    hasher.update(document.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Reports kept before the oldest is evicted
pub const DEFAULT_CACHE_CAPACITY: usize = 32;

/// Finished reports by cache key, evicting the oldest insert once full
#[derive(Debug)]
pub struct AnalysisCache {
    reports: HashMap<String, AnalysisReport>,
    order: VecDeque<String>,
    capacity: usize,
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache holding at most `capacity` reports (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            reports: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, key: &str) -> Option<&AnalysisReport> {
        let hit = self.reports.get(key);
        log::debug!(
            "Report cache {} for {}",
            if hit.is_some() { "hit" } else { "miss" },
            &key[..key.len().min(12)]
        );
        hit
    }

    pub fn insert(&mut self, key: String, report: AnalysisReport) {
        if self.reports.insert(key.clone(), report).is_some() {
            return;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.reports.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn clear(&mut self) {
        self.reports.clear();
        self.order.clear();
    }
}
