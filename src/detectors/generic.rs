//! Generic spam detector.
//!
//! Catches spam that is not investment- or crypto-specific:
//! - Emoji, repeated-character and all-caps runs
//! - Short-link services
//! - Advertising keywords and promotional phrasing
//! - Very little text around many links
//!
//! The confidence is a weighted average: accumulated weighted scores divided
//! by the sum of weights that could have contributed.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::debug;

use super::{DetectedPattern, Detector, DetectorFamily, Evidence, Normalization, PatternRegistry};
use crate::comment::Comment;
use crate::error::Result;

pub const SHORT_LINKS: &str = "suspicious_links";
pub const SPAM_KEYWORDS: &str = "spam_keywords";
pub const PROMOTIONAL_PHRASES: &str = "promotional_phrases";

const EMOJI_WEIGHT: f64 = 0.3;
const REPETITIVE_WEIGHT: f64 = 0.2;
const CAPS_WEIGHT: f64 = 0.2;
const LENGTH_LINK_WEIGHT: f64 = 0.3;

/// Minimum run length for emoji, repeated characters and capitals.
const RUN_LENGTH: usize = 5;

static EMOJI_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"[\x{1F600}-\x{1F64F}\x{1F300}-\x{1F5FF}\x{1F680}-\x{1F6FF}\x{1F1E0}-\x{1F1FF}\x{2600}-\x{26FF}\x{2700}-\x{27BF}]{5,}",
    )
    .unwrap()
});

static CAPS_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Z]{5,}").unwrap());

static SEED_PATTERNS: LazyLock<PatternRegistry> = LazyLock::new(|| seed_patterns().unwrap());

fn seed_patterns() -> Result<PatternRegistry> {
    Ok(PatternRegistry::new(DetectorFamily::Generic)
        .with_regexes(
            SHORT_LINKS,
            0.4,
            Normalization::Saturating(2.0),
            &[r"bit\.ly/\w+", r"tinyurl\.com/\w+", r"短網址"],
        )?
        .with_keywords(
            SPAM_KEYWORDS,
            0.5,
            Normalization::Saturating(3.0),
            &[
                "點擊連結", "限時優惠", "免費贈送", "立即領取",
                "私訊我", "加我好友", "詳情私聊", "有興趣私",
                "廣告", "推廣", "宣傳", "代理", "招商",
                "賺外快", "兼職", "在家工作", "網路賺錢",
            ],
        )
        .with_regexes(
            PROMOTIONAL_PHRASES,
            0.4,
            Normalization::Saturating(2.0),
            &[
                r"加入.*群組",
                r"掃描.*QR",
                r"關注.*獲得",
                r"分享.*朋友",
                r"轉發.*有獎",
            ],
        )?)
}

/// Count maximal runs of one character repeated at least five times.
/// Line terminators never form a run.
pub fn repetitive_runs(text: &str) -> usize {
    let mut runs = 0;
    let mut current: Option<char> = None;
    let mut len = 0usize;

    for c in text.chars() {
        if Some(c) == current {
            len += 1;
            continue;
        }
        if len >= RUN_LENGTH {
            runs += 1;
        }
        if matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}') {
            current = None;
            len = 0;
        } else {
            current = Some(c);
            len = 1;
        }
    }
    if len >= RUN_LENGTH {
        runs += 1;
    }

    runs
}

/// Score for little text around many links.
pub fn length_link_ratio_score(text_len: usize, link_count: usize) -> f64 {
    if link_count == 0 {
        return 0.0;
    }

    if text_len < 50 && link_count > 1 {
        0.8
    } else if text_len < 100 && link_count > 2 {
        0.6
    } else if link_count as f64 > text_len as f64 / 20.0 {
        0.4
    } else {
        0.0
    }
}

/// Generic spam detector.
#[derive(Debug, Clone)]
pub struct GenericSpamDetector {
    patterns: Arc<PatternRegistry>,
    enabled: bool,
}

impl GenericSpamDetector {
    /// Create a new detector with the seed patterns.
    pub fn new(enabled: bool) -> Self {
        Self {
            patterns: Arc::new(SEED_PATTERNS.clone()),
            enabled,
        }
    }

    fn pattern(category: &str, label: String, weight: f64) -> DetectedPattern {
        DetectedPattern::new(DetectorFamily::Generic.pattern_type(), category, label, weight)
    }
}

impl Default for GenericSpamDetector {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Detector for GenericSpamDetector {
    fn family(&self) -> DetectorFamily {
        DetectorFamily::Generic
    }

    fn name(&self) -> &'static str {
        "generic_spam_detector"
    }

    fn spam_threshold(&self) -> f64 {
        0.5
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn registry(&self) -> &Arc<PatternRegistry> {
        &self.patterns
    }

    fn registry_mut(&mut self) -> &mut Arc<PatternRegistry> {
        &mut self.patterns
    }

    fn score(&self, comment: &Comment) -> Evidence {
        let text = comment.text.as_str();
        let folded = text.to_lowercase();
        let mut patterns = Vec::new();
        let mut total = 0.0;
        let mut max = 0.0;

        // Character-run signals
        let runs = [
            ("excessive_emojis", EMOJI_RUN.find_iter(text).count(), 3.0, EMOJI_WEIGHT, "emoji sequences"),
            ("repetitive_chars", repetitive_runs(text), 2.0, REPETITIVE_WEIGHT, "repetitive sequences"),
            ("excessive_caps", CAPS_RUN.find_iter(text).count(), 2.0, CAPS_WEIGHT, "caps sequences"),
        ];
        for (category, count, divisor, weight, label) in runs {
            if count > 0 {
                patterns.push(Self::pattern(category, format!("{} {}", count, label), weight));
                total += Normalization::Saturating(divisor).score(count, 0) * weight;
            }
            max += weight;
        }

        if let Some(category) = self.patterns.category(SHORT_LINKS).filter(|c| c.weight() > 0.0) {
            let count = category.count_occurrences(text, &folded);
            if count > 0 {
                patterns.push(Self::pattern(
                    SHORT_LINKS,
                    format!("{} suspicious links", count),
                    category.weight(),
                ));
                total += category.normalization().score(count, category.rules().len()) * category.weight();
            }
            max += category.weight();
        }

        if let Some(category) = self.patterns.category(SPAM_KEYWORDS).filter(|c| c.weight() > 0.0) {
            let result = category.evaluate(text, &folded);
            if result.is_match() {
                patterns.push(Self::pattern(SPAM_KEYWORDS, result.matches.join(", "), category.weight()));
                total += result.score * category.weight();
            }
            max += category.weight();
        }

        if let Some(category) = self.patterns.category(PROMOTIONAL_PHRASES).filter(|c| c.weight() > 0.0) {
            let result = category.evaluate(text, &folded);
            if result.is_match() {
                patterns.push(Self::pattern(
                    PROMOTIONAL_PHRASES,
                    format!("{} promotional phrases", result.matches.len()),
                    category.weight(),
                ));
                total += result.score * category.weight();
            }
            max += category.weight();
        }

        let ratio = length_link_ratio_score(comment.text_len(), comment.links.len());
        if ratio > 0.0 {
            patterns.push(Self::pattern(
                "length_link_ratio",
                "suspicious length to link ratio".to_string(),
                LENGTH_LINK_WEIGHT,
            ));
            total += ratio * LENGTH_LINK_WEIGHT;
            max += LENGTH_LINK_WEIGHT;
        }

        let confidence = if max > 0.0 { (total / max).min(1.0) } else { 0.0 };

        debug!(
            detector = "generic",
            confidence,
            patterns = patterns.len(),
            "Generic spam scoring complete"
        );

        Evidence {
            confidence,
            patterns,
        }
    }
}
