//! Runtime counters for the detection engine.
//!
//! Counters only observe verdicts; nothing here feeds back into scoring.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::detectors::DetectorFamily;
use crate::score::{DetectionReason, DetectionResult};

/// Lock-free verdict counters shared across analyze calls.
#[derive(Debug, Default)]
pub struct StatsCollector {
    analyzed: AtomicU64,
    spam: AtomicU64,
    false_positive_reports: AtomicU64,
    by_reason: DashMap<DetectionReason, u64>,
    false_positives_by_family: DashMap<DetectorFamily, u64>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one verdict.
    pub fn record(&self, result: &DetectionResult) {
        self.analyzed.fetch_add(1, Ordering::Relaxed);
        if result.is_spam {
            self.spam.fetch_add(1, Ordering::Relaxed);
        }
        *self.by_reason.entry(result.reason).or_insert(0) += 1;
    }

    /// Record a user report that `result` was wrongly flagged.
    ///
    /// Families that contributed to the verdict are counted individually.
    pub fn record_false_positive(&self, result: &DetectionResult) {
        self.false_positive_reports.fetch_add(1, Ordering::Relaxed);
        for detector in result.detector_results.iter().flatten() {
            *self.false_positives_by_family.entry(detector.family).or_insert(0) += 1;
        }
    }

    pub fn analyzed(&self) -> u64 {
        self.analyzed.load(Ordering::Relaxed)
    }

    pub fn spam(&self) -> u64 {
        self.spam.load(Ordering::Relaxed)
    }

    pub fn false_positive_reports(&self) -> u64 {
        self.false_positive_reports.load(Ordering::Relaxed)
    }

    /// Count for one reason.
    pub fn reason_count(&self, reason: DetectionReason) -> u64 {
        self.by_reason.get(&reason).map(|c| *c).unwrap_or(0)
    }

    fn reason_counts(&self) -> BTreeMap<String, u64> {
        self.by_reason
            .iter()
            .map(|entry| (entry.key().as_str().to_string(), *entry.value()))
            .collect()
    }

    fn false_positive_counts(&self) -> BTreeMap<String, u64> {
        self.false_positives_by_family
            .iter()
            .map(|entry| (entry.key().as_str().to_string(), *entry.value()))
            .collect()
    }
}

/// Block/allow-list sizes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSizes {
    pub blacklisted_users: usize,
    pub blacklisted_keywords: usize,
    pub whitelisted_users: usize,
    pub whitelisted_domains: usize,
}

/// Point-in-time engine statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatistics {
    /// Detectors constructed by the engine
    pub detectors_loaded: usize,
    /// Families currently enabled
    pub enabled_detectors: Vec<DetectorFamily>,
    pub lists: ListSizes,
    pub aggressive_mode: bool,
    pub comments_analyzed: u64,
    pub spam_detected: u64,
    /// Verdict counts keyed by reason
    pub by_reason: BTreeMap<String, u64>,
    pub false_positive_reports: u64,
    /// False-positive counts keyed by contributing family
    pub false_positives_by_family: BTreeMap<String, u64>,
}

impl EngineStatistics {
    pub(crate) fn new(
        detectors_loaded: usize,
        enabled_detectors: Vec<DetectorFamily>,
        lists: ListSizes,
        aggressive_mode: bool,
        collector: &StatsCollector,
    ) -> Self {
        Self {
            detectors_loaded,
            enabled_detectors,
            lists,
            aggressive_mode,
            comments_analyzed: collector.analyzed(),
            spam_detected: collector.spam(),
            by_reason: collector.reason_counts(),
            false_positive_reports: collector.false_positive_reports(),
            false_positives_by_family: collector.false_positive_counts(),
        }
    }
}
