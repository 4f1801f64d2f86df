//! Detection results and ensemble scoring.

use serde::{Deserialize, Serialize};

use crate::detectors::{DetectedPattern, DetectorFamily, DetectorResult};

/// Why a verdict was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionReason {
    /// Author or a link domain is allow-listed
    Whitelisted,
    /// Author is block-listed
    BlacklistedUser,
    /// Text contains a block-listed keyword
    BlacklistedKeywords,
    /// No detector produced any signal
    NoPatternsDetected,
    /// Ensemble confidence reached the spam threshold
    PatternDetection,
    /// Signals found, but below the spam threshold
    BelowThreshold,
    /// Internal fault; failed open
    AnalysisError,
}

impl DetectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionReason::Whitelisted => "whitelisted",
            DetectionReason::BlacklistedUser => "blacklisted_user",
            DetectionReason::BlacklistedKeywords => "blacklisted_keywords",
            DetectionReason::NoPatternsDetected => "no_patterns_detected",
            DetectionReason::PatternDetection => "pattern_detection",
            DetectionReason::BelowThreshold => "below_threshold",
            DetectionReason::AnalysisError => "analysis_error",
        }
    }

    /// Whether the verdict came from a block/allow list.
    pub fn is_list_match(&self) -> bool {
        matches!(
            self,
            DetectionReason::Whitelisted
                | DetectionReason::BlacklistedUser
                | DetectionReason::BlacklistedKeywords
        )
    }
}

/// Final verdict for a comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub is_spam: bool,

    /// Confidence in `[0, 1]`
    pub confidence: f64,

    pub reason: DetectionReason,

    /// Signals that contributed
    pub patterns: Vec<DetectedPattern>,

    /// Non-zero detector results behind an ensemble verdict
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detector_results: Option<Vec<DetectorResult>>,
}

impl DetectionResult {
    /// A non-spam result with no evidence.
    pub fn not_spam(reason: DetectionReason) -> Self {
        Self {
            is_spam: false,
            confidence: 0.0,
            reason,
            patterns: vec![],
            detector_results: None,
        }
    }

    /// The fail-open result for internal faults.
    pub fn analysis_error() -> Self {
        Self::not_spam(DetectionReason::AnalysisError)
    }

    /// A list-based verdict.
    pub fn list_match(is_spam: bool, confidence: f64, reason: DetectionReason, patterns: Vec<DetectedPattern>) -> Self {
        Self {
            is_spam,
            confidence,
            reason,
            patterns,
            detector_results: None,
        }
    }
}

/// Reliability weight per detector family.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleWeights {
    pub investment: f64,
    pub crypto: f64,
    pub social_engineering: f64,
    pub generic: f64,
}

impl EnsembleWeights {
    pub fn weight(&self, family: DetectorFamily) -> f64 {
        match family {
            DetectorFamily::Investment => self.investment,
            DetectorFamily::Crypto => self.crypto,
            DetectorFamily::SocialEngineering => self.social_engineering,
            DetectorFamily::Generic => self.generic,
        }
    }
}

impl Default for EnsembleWeights {
    fn default() -> Self {
        Self {
            investment: 1.2,
            crypto: 1.1,
            social_engineering: 1.0,
            generic: 0.8,
        }
    }
}

/// Spam threshold in aggressive mode.
pub const AGGRESSIVE_THRESHOLD: f64 = 0.6;
/// Spam threshold otherwise.
pub const DEFAULT_THRESHOLD: f64 = 0.8;

/// Combines detector results into one verdict.
#[derive(Debug, Clone, Default)]
pub struct EnsembleCalculator {
    pub weights: EnsembleWeights,
}

impl EnsembleCalculator {
    pub fn new(weights: EnsembleWeights) -> Self {
        Self { weights }
    }

    pub fn threshold(aggressive: bool) -> f64 {
        if aggressive {
            AGGRESSIVE_THRESHOLD
        } else {
            DEFAULT_THRESHOLD
        }
    }

    /// Drop zero-confidence results, then take the reliability-weighted
    /// average of the rest.
    pub fn combine(&self, results: Vec<DetectorResult>, aggressive: bool) -> DetectionResult {
        let surviving: Vec<DetectorResult> = results.into_iter().filter(|r| r.confidence > 0.0).collect();

        if surviving.is_empty() {
            return DetectionResult::not_spam(DetectionReason::NoPatternsDetected);
        }

        let mut total_weight = 0.0;
        let mut weighted = 0.0;
        let mut patterns = Vec::new();

        for result in &surviving {
            let weight = self.weights.weight(result.family);
            total_weight += weight;
            weighted += result.confidence * weight;
            patterns.extend(result.patterns.iter().cloned());
        }

        let confidence = if total_weight > 0.0 {
            (weighted / total_weight).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let is_spam = confidence >= Self::threshold(aggressive);

        DetectionResult {
            is_spam,
            confidence,
            reason: if is_spam {
                DetectionReason::PatternDetection
            } else {
                DetectionReason::BelowThreshold
            },
            patterns,
            detector_results: Some(surviving),
        }
    }
}
