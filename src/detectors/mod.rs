//! Comment spam detectors.
//!
//! Each detector scores one family of spam signals and returns a confidence
//! in `[0, 1]`. Detectors hold no per-comment state; the only mutable parts
//! are their pattern registry and enabled flag.

pub mod crypto;
pub mod generic;
pub mod investment;
pub mod patterns;
pub mod social;

pub use crypto::CryptoScamDetector;
pub use generic::GenericSpamDetector;
pub use investment::InvestmentScamDetector;
pub use patterns::{CategoryMatch, Normalization, PatternCategory, PatternRegistry, RuleKind, RuleSet};
pub use social::SocialEngineeringDetector;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::comment::Comment;
use crate::error::Result;

/// Detector families, in the order the engine runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DetectorFamily {
    Investment,
    Crypto,
    Generic,
    SocialEngineering,
}

impl DetectorFamily {
    pub const ALL: [DetectorFamily; 4] = [
        DetectorFamily::Investment,
        DetectorFamily::Crypto,
        DetectorFamily::Generic,
        DetectorFamily::SocialEngineering,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorFamily::Investment => "investment",
            DetectorFamily::Crypto => "crypto",
            DetectorFamily::Generic => "generic",
            DetectorFamily::SocialEngineering => "socialEngineering",
        }
    }

    /// Pattern type tag used for patterns this family emits.
    pub fn pattern_type(&self) -> PatternType {
        match self {
            DetectorFamily::Investment => PatternType::InvestmentScam,
            DetectorFamily::Crypto => PatternType::CryptoScam,
            DetectorFamily::Generic => PatternType::GenericSpam,
            DetectorFamily::SocialEngineering => PatternType::SocialEngineering,
        }
    }
}

impl fmt::Display for DetectorFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source tag on a detected pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    InvestmentScam,
    CryptoScam,
    GenericSpam,
    SocialEngineering,
    /// Block/allow-list short-circuit
    ListFilter,
}

/// One detected signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedPattern {
    #[serde(rename = "type")]
    pub kind: PatternType,
    /// Category name within the detector
    pub category: String,
    /// Matched text or a synthetic label
    pub pattern: String,
    /// Category weight
    pub weight: f64,
}

impl DetectedPattern {
    pub fn new(
        kind: PatternType,
        category: impl Into<String>,
        pattern: impl Into<String>,
        weight: f64,
    ) -> Self {
        Self {
            kind,
            category: category.into(),
            pattern: pattern.into(),
            weight,
        }
    }
}

/// Result from a detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorResult {
    /// Confidence exceeded this detector's own threshold
    pub is_spam: bool,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
    /// Signals that contributed
    pub patterns: Vec<DetectedPattern>,
    #[serde(rename = "type")]
    pub family: DetectorFamily,
}

impl DetectorResult {
    /// A zero-confidence result.
    pub fn empty(family: DetectorFamily) -> Self {
        Self {
            is_spam: false,
            confidence: 0.0,
            patterns: vec![],
            family,
        }
    }

    /// Build a result, clamping confidence and applying the threshold.
    pub fn scored(family: DetectorFamily, confidence: f64, threshold: f64, patterns: Vec<DetectedPattern>) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            is_spam: confidence > threshold,
            confidence,
            patterns,
            family,
        }
    }

    /// Add a pattern.
    pub fn with_pattern(mut self, pattern: DetectedPattern) -> Self {
        self.patterns.push(pattern);
        self
    }
}

/// Raw detector output before thresholding.
#[derive(Debug, Clone, Default)]
pub struct Evidence {
    pub confidence: f64,
    pub patterns: Vec<DetectedPattern>,
}

/// Trait for comment spam detectors.
///
/// Implementors provide [`Detector::score`]; gating, thresholding and
/// pattern management come from the provided methods.
pub trait Detector: Send + Sync {
    /// Detector family.
    fn family(&self) -> DetectorFamily;

    /// Get the detector name.
    fn name(&self) -> &'static str;

    /// Confidence must exceed this for the detector's own verdict.
    fn spam_threshold(&self) -> f64;

    fn is_enabled(&self) -> bool;

    fn set_enabled(&mut self, enabled: bool);

    fn registry(&self) -> &Arc<PatternRegistry>;

    fn registry_mut(&mut self) -> &mut Arc<PatternRegistry>;

    /// Score the comment. Only called when enabled.
    fn score(&self, comment: &Comment) -> Evidence;

    /// Analyze the comment and return a detection result.
    fn detect(&self, comment: &Comment) -> DetectorResult {
        if !self.is_enabled() {
            return DetectorResult::empty(self.family());
        }
        let evidence = self.score(comment);
        DetectorResult::scored(
            self.family(),
            evidence.confidence,
            self.spam_threshold(),
            evidence.patterns,
        )
    }

    /// Snapshot of the current patterns.
    fn patterns(&self) -> Arc<PatternRegistry> {
        Arc::clone(self.registry())
    }

    /// Add a pattern to a category.
    fn add_pattern(&mut self, category: &str, pattern: &str) -> Result<()> {
        let name = self.name();
        let added = Arc::make_mut(self.registry_mut())
            .add_pattern(category, pattern)
            .inspect_err(|e| warn!(detector = name, category, pattern, error = %e, "Rejected pattern"))?;
        if added {
            info!(detector = name, category, pattern, "Added pattern");
        }
        Ok(())
    }

    /// Remove a pattern from a category. Missing patterns are ignored.
    fn remove_pattern(&mut self, category: &str, pattern: &str) -> Result<()> {
        let name = self.name();
        let removed = Arc::make_mut(self.registry_mut())
            .remove_pattern(category, pattern)
            .inspect_err(|e| warn!(detector = name, category, error = %e, "Cannot remove pattern"))?;
        if removed {
            info!(detector = name, category, pattern, "Removed pattern");
        }
        Ok(())
    }

    /// Replace a category weight.
    fn set_category_weight(&mut self, category: &str, weight: f64) -> Result<()> {
        let name = self.name();
        Arc::make_mut(self.registry_mut())
            .set_weight(category, weight)
            .inspect_err(|e| warn!(detector = name, category, error = %e, "Rejected category weight"))?;
        info!(detector = name, category, weight, "Updated category weight");
        Ok(())
    }
}

/// Run every category of `registry` against the text, accumulating weighted
/// scores. Returns `(total, max_possible)`; every category's weight counts
/// toward `max_possible` whether or not it matched. Zero-weight categories
/// are skipped so they never report patterns without confidence.
pub(crate) fn score_categories(
    registry: &PatternRegistry,
    text: &str,
    folded: &str,
    patterns: &mut Vec<DetectedPattern>,
) -> (f64, f64) {
    let kind = registry.family().pattern_type();
    let mut total = 0.0;
    let mut max = 0.0;

    for category in registry.categories() {
        if category.weight() <= 0.0 {
            continue;
        }
        let result = category.evaluate(text, folded);
        if result.is_match() {
            patterns.extend(result.matches.iter().map(|m| {
                DetectedPattern::new(kind, category.name(), m.clone(), category.weight())
            }));
            total += result.score * category.weight();
        }
        max += category.weight();
    }

    (total, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_names() {
        assert_eq!(DetectorFamily::Investment.as_str(), "investment");
        assert_eq!(DetectorFamily::SocialEngineering.to_string(), "socialEngineering");
        assert_eq!(
            serde_json::to_string(&DetectorFamily::SocialEngineering).unwrap(),
            "\"socialEngineering\""
        );
    }

    #[test]
    fn test_pattern_type_serialization() {
        let pattern = DetectedPattern::new(PatternType::CryptoScam, "crypto_keywords", "BTC", 0.5);
        let json = serde_json::to_value(&pattern).unwrap();
        assert_eq!(json["type"], "crypto_scam");
        assert_eq!(json["category"], "crypto_keywords");
    }

    #[test]
    fn test_scored_clamps_confidence() {
        let result = DetectorResult::scored(DetectorFamily::Crypto, 1.7, 0.6, vec![]);
        assert_eq!(result.confidence, 1.0);
        assert!(result.is_spam);

        let result = DetectorResult::scored(DetectorFamily::Crypto, f64::NAN, 0.6, vec![]);
        assert_eq!(result.confidence, 0.0);
        assert!(!result.is_spam);
    }

    #[test]
    fn test_threshold_is_strict() {
        let result = DetectorResult::scored(DetectorFamily::Generic, 0.5, 0.5, vec![]);
        assert!(!result.is_spam);
    }

    #[test]
    fn test_score_categories_counts_unmatched_weight() {
        let registry = PatternRegistry::new(DetectorFamily::Generic)
            .with_keywords("a", 0.5, Normalization::Linear, &["alpha", "beta"])
            .with_keywords("b", 0.3, Normalization::Linear, &["gamma"]);
        let mut patterns = Vec::new();
        let (total, max) = score_categories(&registry, "alpha", "alpha", &mut patterns);
        assert!((total - 0.25).abs() < 1e-9);
        assert!((max - 0.8).abs() < 1e-9);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].kind, PatternType::GenericSpam);
    }

    #[test]
    fn test_score_categories_skips_zero_weight() {
        let mut registry = PatternRegistry::new(DetectorFamily::Crypto)
            .with_keywords("a", 0.5, Normalization::Linear, &["alpha"])
            .with_keywords("b", 0.3, Normalization::Linear, &["beta"]);
        registry.set_weight("a", 0.0).unwrap();

        let mut patterns = Vec::new();
        let (total, max) = score_categories(&registry, "alpha", "alpha", &mut patterns);
        assert_eq!(total, 0.0);
        assert!((max - 0.3).abs() < 1e-9);
        assert!(patterns.is_empty());

        let (total, _) = score_categories(&registry, "alpha beta", "alpha beta", &mut patterns);
        assert!((total - 0.3).abs() < 1e-9);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].category, "b");
    }
}
