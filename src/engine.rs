//! Detection engine: list filter, four detectors, weighted ensemble.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use tracing::{debug, error, info};

use crate::comment::Comment;
use crate::config::SpamGuardConfig;
use crate::detectors::{
    CryptoScamDetector, Detector, DetectorFamily, DetectorResult, GenericSpamDetector,
    InvestmentScamDetector, PatternRegistry, SocialEngineeringDetector,
};
use crate::error::{Result, SpamGuardError};
use crate::lists::ListFilter;
use crate::score::{DetectionResult, EnsembleCalculator};
use crate::stats::{EngineStatistics, ListSizes, StatsCollector};

/// Run one detector, turning a panic into an error.
fn run_detector(detector: &dyn Detector, comment: &Comment) -> Result<DetectorResult> {
    catch_unwind(AssertUnwindSafe(|| detector.detect(comment)))
        .map_err(|_| SpamGuardError::DetectorPanicked(detector.family()))
}

/// Everything an analyze call reads. Replaced wholesale on writes.
#[derive(Debug, Clone)]
struct EngineState {
    config: SpamGuardConfig,
    list_filter: ListFilter,
    investment: InvestmentScamDetector,
    crypto: CryptoScamDetector,
    generic: GenericSpamDetector,
    social: SocialEngineeringDetector,
}

impl EngineState {
    fn new(config: SpamGuardConfig) -> Self {
        let families = &config.detection_patterns;
        Self {
            list_filter: ListFilter::from_config(&config),
            investment: InvestmentScamDetector::new(families.investment_scams),
            crypto: CryptoScamDetector::new(families.crypto_scams),
            generic: GenericSpamDetector::new(families.generic_spam),
            social: SocialEngineeringDetector::new(families.social_engineering),
            config,
        }
    }

    fn detector(&self, family: DetectorFamily) -> &dyn Detector {
        match family {
            DetectorFamily::Investment => &self.investment,
            DetectorFamily::Crypto => &self.crypto,
            DetectorFamily::Generic => &self.generic,
            DetectorFamily::SocialEngineering => &self.social,
        }
    }

    fn detector_mut(&mut self, family: DetectorFamily) -> &mut dyn Detector {
        match family {
            DetectorFamily::Investment => &mut self.investment,
            DetectorFamily::Crypto => &mut self.crypto,
            DetectorFamily::Generic => &mut self.generic,
            DetectorFamily::SocialEngineering => &mut self.social,
        }
    }

    /// Swap in new configuration; pattern sets are kept.
    fn apply_config(&mut self, config: SpamGuardConfig) {
        for family in DetectorFamily::ALL {
            let enabled = config.detection_patterns.is_enabled(family);
            self.detector_mut(family).set_enabled(enabled);
        }
        self.list_filter = ListFilter::from_config(&config);
        self.config = config;
    }

    fn list_sizes(&self) -> ListSizes {
        ListSizes {
            blacklisted_users: self.list_filter.blocked_user_count(),
            blacklisted_keywords: self.list_filter.blocked_keyword_count(),
            whitelisted_users: self.list_filter.allowed_user_count(),
            whitelisted_domains: self.list_filter.allowed_domain_count(),
        }
    }
}

/// Comment spam detection engine.
///
/// `analyze` never fails: internal faults, including detector panics, are
/// logged and reported as a non-spam `analysis_error` verdict. Each call
/// works on a snapshot of the engine state, so concurrent pattern or
/// configuration updates are seen either entirely or not at all.
#[derive(Debug)]
pub struct DetectionEngine {
    state: RwLock<Arc<EngineState>>,
    calculator: EnsembleCalculator,
    stats: StatsCollector,
}

impl DetectionEngine {
    /// Create an engine from configuration.
    pub fn new(config: SpamGuardConfig) -> Self {
        let state = EngineState::new(config);
        info!(
            aggressive_mode = state.config.settings.aggressive_mode,
            blacklisted_users = state.list_filter.blocked_user_count(),
            blacklisted_keywords = state.list_filter.blocked_keyword_count(),
            "Detection engine initialized"
        );

        Self {
            state: RwLock::new(Arc::new(state)),
            calculator: EnsembleCalculator::default(),
            stats: StatsCollector::new(),
        }
    }

    /// Create an engine with every detection family enabled.
    pub fn with_defaults() -> Self {
        Self::new(SpamGuardConfig::recommended())
    }

    fn snapshot(&self) -> Result<Arc<EngineState>> {
        self.state
            .read()
            .map(|guard| Arc::clone(&guard))
            .map_err(|_| SpamGuardError::LockPoisoned)
    }

    fn update<T>(&self, f: impl FnOnce(&mut EngineState) -> Result<T>) -> Result<T> {
        let mut guard = self.state.write().map_err(|_| SpamGuardError::LockPoisoned)?;
        let mut next = EngineState::clone(&guard);
        let value = f(&mut next)?;
        *guard = Arc::new(next);
        Ok(value)
    }

    /// Classify one comment.
    pub fn analyze(&self, comment: &Comment) -> DetectionResult {
        let state = self.snapshot().ok();
        self.analyze_with(state.as_deref(), comment)
    }

    /// Classify comments in order against one state snapshot.
    pub fn analyze_batch(&self, comments: &[Comment]) -> Vec<DetectionResult> {
        let state = self.snapshot().ok();
        comments
            .iter()
            .map(|c| self.analyze_with(state.as_deref(), c))
            .collect()
    }

    fn analyze_with(&self, state: Option<&EngineState>, comment: &Comment) -> DetectionResult {
        let start = Instant::now();

        let outcome = state
            .ok_or(SpamGuardError::LockPoisoned)
            .and_then(|state| self.try_analyze(state, comment));
        self.finish(outcome, start)
    }

    /// Record and log an outcome. Errors allow the comment.
    fn finish(&self, outcome: Result<DetectionResult>, start: Instant) -> DetectionResult {
        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "Comment analysis failed, allowing comment");
                DetectionResult::analysis_error()
            }
        };

        self.stats.record(&result);

        debug!(
            is_spam = result.is_spam,
            confidence = result.confidence,
            reason = result.reason.as_str(),
            patterns = result.patterns.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Comment analyzed"
        );

        result
    }

    fn try_analyze(&self, state: &EngineState, comment: &Comment) -> Result<DetectionResult> {
        if let Some(result) = state.list_filter.check(comment) {
            return Ok(result);
        }

        let mut results: Vec<DetectorResult> = Vec::with_capacity(DetectorFamily::ALL.len());
        for family in DetectorFamily::ALL {
            let detector = state.detector(family);
            if !detector.is_enabled() {
                continue;
            }
            results.push(run_detector(detector, comment)?);
        }

        Ok(self
            .calculator
            .combine(results, state.config.settings.aggressive_mode))
    }

    /// Current configuration.
    pub fn config(&self) -> Result<SpamGuardConfig> {
        Ok(self.snapshot()?.config.clone())
    }

    /// Replace the configuration. Pattern sets survive.
    pub fn update_config(&self, config: SpamGuardConfig) -> Result<()> {
        self.update(|state| {
            state.apply_config(config);
            Ok(())
        })?;
        info!("Detection engine configuration updated");
        Ok(())
    }

    /// Add a pattern to a family's category.
    pub fn add_pattern(&self, family: DetectorFamily, category: &str, pattern: &str) -> Result<()> {
        self.update(|state| state.detector_mut(family).add_pattern(category, pattern))
    }

    /// Remove a pattern from a family's category.
    pub fn remove_pattern(&self, family: DetectorFamily, category: &str, pattern: &str) -> Result<()> {
        self.update(|state| state.detector_mut(family).remove_pattern(category, pattern))
    }

    /// Replace a category weight.
    pub fn set_category_weight(&self, family: DetectorFamily, category: &str, weight: f64) -> Result<()> {
        self.update(|state| state.detector_mut(family).set_category_weight(category, weight))
    }

    /// Snapshot of a family's patterns.
    pub fn patterns(&self, family: DetectorFamily) -> Result<Arc<PatternRegistry>> {
        Ok(self.snapshot()?.detector(family).patterns())
    }

    /// Record a user report that `result` was a false positive.
    pub fn report_false_positive(&self, result: &DetectionResult) {
        self.stats.record_false_positive(result);
        info!(
            reason = result.reason.as_str(),
            confidence = result.confidence,
            "False positive reported"
        );
    }

    /// Engine statistics.
    pub fn statistics(&self) -> Result<EngineStatistics> {
        let state = self.snapshot()?;
        let enabled = DetectorFamily::ALL
            .into_iter()
            .filter(|family| state.detector(*family).is_enabled())
            .collect();

        Ok(EngineStatistics::new(
            DetectorFamily::ALL.len(),
            enabled,
            state.list_sizes(),
            state.config.settings.aggressive_mode,
            &self.stats,
        ))
    }
}

impl Default for DetectionEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comment::UserRef;
    use crate::detectors::investment::ADVISOR_TITLES;
    use crate::detectors::Evidence;
    use crate::score::DetectionReason;

    const INVESTMENT_BAIT: &str = "投資老師 保證獲利 把握機會 限時";

    #[test]
    fn test_default_engine_flags_investment_bait() {
        let engine = DetectionEngine::with_defaults();
        let result = engine.analyze(&Comment::new(INVESTMENT_BAIT));
        assert!(result.is_spam);
        assert_eq!(result.reason, DetectionReason::PatternDetection);
        let detectors = result.detector_results.unwrap();
        assert_eq!(detectors.len(), 1);
        assert_eq!(detectors[0].family, DetectorFamily::Investment);
    }

    #[test]
    fn test_empty_config_runs_no_detectors() {
        let engine = DetectionEngine::new(SpamGuardConfig::default());
        let result = engine.analyze(&Comment::new(INVESTMENT_BAIT));
        assert!(!result.is_spam);
        assert_eq!(result.reason, DetectionReason::NoPatternsDetected);
    }

    #[test]
    fn test_update_config_keeps_patterns() {
        let engine = DetectionEngine::with_defaults();
        engine
            .add_pattern(DetectorFamily::Investment, ADVISOR_TITLES, "飆股大神")
            .unwrap();

        let mut config = SpamGuardConfig::recommended();
        config.blacklist.users.push("troll".into());
        engine.update_config(config).unwrap();

        let patterns = engine.patterns(DetectorFamily::Investment).unwrap();
        assert!(patterns.category(ADVISOR_TITLES).unwrap().rules().contains("飆股大神"));

        let result = engine.analyze(&Comment::new("hi").with_author(UserRef::with_username("troll")));
        assert_eq!(result.reason, DetectionReason::BlacklistedUser);
    }

    #[test]
    fn test_snapshot_is_isolated_from_updates() {
        let engine = DetectionEngine::with_defaults();
        let before = engine.patterns(DetectorFamily::Investment).unwrap();
        engine
            .add_pattern(DetectorFamily::Investment, ADVISOR_TITLES, "飆股大神")
            .unwrap();
        assert!(!before.category(ADVISOR_TITLES).unwrap().rules().contains("飆股大神"));
    }

    #[test]
    fn test_failed_update_leaves_state_unchanged() {
        let engine = DetectionEngine::with_defaults();
        let before = engine.patterns(DetectorFamily::Crypto).unwrap();
        assert!(engine.add_pattern(DetectorFamily::Crypto, "nope", "x").is_err());
        let after = engine.patterns(DetectorFamily::Crypto).unwrap();
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn test_poisoned_state_fails_open() {
        let engine = Arc::new(DetectionEngine::with_defaults());
        let poisoner = Arc::clone(&engine);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.state.write().unwrap();
            panic!("poison engine state");
        })
        .join();

        let result = engine.analyze(&Comment::new(INVESTMENT_BAIT));
        assert!(!result.is_spam);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.reason, DetectionReason::AnalysisError);
        assert!(matches!(
            engine.add_pattern(DetectorFamily::Crypto, "crypto_keywords", "SOL"),
            Err(SpamGuardError::LockPoisoned)
        ));
    }

    struct PanickingDetector {
        patterns: Arc<PatternRegistry>,
    }

    impl Detector for PanickingDetector {
        fn family(&self) -> DetectorFamily {
            DetectorFamily::Crypto
        }

        fn name(&self) -> &'static str {
            "panicking"
        }

        fn spam_threshold(&self) -> f64 {
            0.5
        }

        fn is_enabled(&self) -> bool {
            true
        }

        fn set_enabled(&mut self, _enabled: bool) {}

        fn registry(&self) -> &Arc<PatternRegistry> {
            &self.patterns
        }

        fn registry_mut(&mut self) -> &mut Arc<PatternRegistry> {
            &mut self.patterns
        }

        fn score(&self, _comment: &Comment) -> Evidence {
            panic!("detector bug");
        }
    }

    #[test]
    fn test_panicking_detector_fails_open() {
        let detector = PanickingDetector {
            patterns: Arc::new(PatternRegistry::new(DetectorFamily::Crypto)),
        };
        let comment = Comment::new(INVESTMENT_BAIT);
        let engine = DetectionEngine::with_defaults();

        let outcome = run_detector(&detector, &comment)
            .map(|result| engine.calculator.combine(vec![result], false));
        assert!(matches!(
            outcome,
            Err(SpamGuardError::DetectorPanicked(DetectorFamily::Crypto))
        ));

        let result = engine.finish(outcome, Instant::now());
        assert!(!result.is_spam);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.reason, DetectionReason::AnalysisError);
        assert!(result.patterns.is_empty());

        let stats = engine.statistics().unwrap();
        assert_eq!(stats.comments_analyzed, 1);
        assert_eq!(stats.spam_detected, 0);
        assert_eq!(stats.by_reason.get("analysis_error"), Some(&1));
    }

    #[test]
    fn test_statistics_track_verdicts() {
        let engine = DetectionEngine::with_defaults();
        let spam = engine.analyze(&Comment::new(INVESTMENT_BAIT));
        engine.analyze(&Comment::new("謝謝分享"));
        engine.report_false_positive(&spam);

        let stats = engine.statistics().unwrap();
        assert_eq!(stats.detectors_loaded, 4);
        assert_eq!(stats.enabled_detectors.len(), 4);
        assert_eq!(stats.comments_analyzed, 2);
        assert_eq!(stats.spam_detected, 1);
        assert_eq!(stats.by_reason.get("pattern_detection"), Some(&1));
        assert_eq!(stats.false_positive_reports, 1);
        assert_eq!(stats.false_positives_by_family.get("investment"), Some(&1));
    }
}
