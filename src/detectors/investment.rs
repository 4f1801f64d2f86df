//! Investment scam detector.
//!
//! Flags "investment teacher" promotions:
//! - Advisor titles and profit vocabulary
//! - Testimonials thanking a teacher
//! - Urgency and guaranteed-return promises
//! - Encouragement to follow along
//! - Tagging friends under investment bait
//!
//! Weighted category scores are accumulated directly into the confidence,
//! without dividing by the maximum possible weight.

use std::sync::{Arc, LazyLock};

use tracing::debug;

use super::{score_categories, DetectedPattern, Detector, DetectorFamily, Evidence, Normalization, PatternRegistry};
use crate::comment::Comment;
use crate::error::Result;

pub const ADVISOR_TITLES: &str = "investment_keywords";
pub const PROFIT_TERMS: &str = "profit_keywords";
pub const TESTIMONIALS: &str = "testimonial_patterns";
pub const URGENCY: &str = "urgency_keywords";
pub const GUARANTEED_RETURNS: &str = "promise_patterns";
pub const SOCIAL_PROOF: &str = "encouragement_phrases";

/// Weight of the tagged-user amplifier.
const TAGGED_USERS_WEIGHT: f64 = 0.3;
/// Tag count at which the amplifier saturates.
const TAGGED_USERS_SATURATION: f64 = 5.0;

static SEED_PATTERNS: LazyLock<PatternRegistry> = LazyLock::new(|| seed_patterns().unwrap());

fn seed_patterns() -> Result<PatternRegistry> {
    let registry = PatternRegistry::new(DetectorFamily::Investment)
        .with_keywords(
            ADVISOR_TITLES,
            0.5,
            Normalization::Logarithmic,
            &[
                "股海策略師", "投資老師", "理財師", "股票老師", "操盤手",
                "投資顧問", "財經專家", "股市大師", "投資達人", "理財專家",
            ],
        )
        .with_keywords(
            PROFIT_TERMS,
            0.3,
            Normalization::Logarithmic,
            &[
                "獲利", "賺錢", "收益", "報酬", "回報", "利潤", "盈利",
                "翻倍", "暴漲", "漲停", "漲幅", "收穫", "賺到",
            ],
        )
        .with_regexes(
            TESTIMONIALS,
            0.6,
            Normalization::Linear,
            &[
                r"真的建議去看看.*跟他學習",
                r"跟.*學習.*感謝",
                r"老師.*真的.*感謝",
                r"學習.*一段時間.*感謝",
                r"非常感謝.*老師",
                r"推薦.*老師.*不錯",
            ],
        )?
        .with_keywords(
            URGENCY,
            0.4,
            Normalization::Logarithmic,
            &[
                "把握機會", "不要錯過", "限時", "趕快", "馬上", "立即",
                "錯過可惜", "機不可失", "難得機會", "千載難逢",
            ],
        )
        .with_regexes(
            GUARANTEED_RETURNS,
            0.8,
            Normalization::Logarithmic,
            &[
                r"保證.*獲利",
                r"保證(獲利|收益|報酬|賺錢)",
                r"穩賺不賠",
                r"零風險",
                r"包賺",
                r"躺著賺",
                r"輕鬆賺",
            ],
        )?
        .with_keywords(
            SOCIAL_PROOF,
            0.3,
            Normalization::Linear,
            &[
                "真的建議", "推薦大家", "強烈推薦", "親身經歷",
                "已經賺了", "跟著老師", "大家可以試試", "相信老師",
            ],
        );
    Ok(registry)
}

/// Investment scam detector.
#[derive(Debug, Clone)]
pub struct InvestmentScamDetector {
    patterns: Arc<PatternRegistry>,
    enabled: bool,
}

impl InvestmentScamDetector {
    /// Create a new detector with the seed patterns.
    pub fn new(enabled: bool) -> Self {
        Self {
            patterns: Arc::new(SEED_PATTERNS.clone()),
            enabled,
        }
    }

    /// Tag amplifier: `min(tags / 5, 1)` when the text carries investment or
    /// profit vocabulary and at least one user is tagged.
    fn tagged_users_score(&self, comment: &Comment, text: &str, folded: &str) -> f64 {
        let tags = comment.tagged_users.len();
        if tags == 0 {
            return 0.0;
        }

        let has_investment_content = [ADVISOR_TITLES, PROFIT_TERMS]
            .iter()
            .filter_map(|name| self.patterns.category(name))
            .any(|category| category.matches_any(text, folded));

        if has_investment_content {
            (tags as f64 / TAGGED_USERS_SATURATION).min(1.0)
        } else {
            0.0
        }
    }
}

impl Default for InvestmentScamDetector {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Detector for InvestmentScamDetector {
    fn family(&self) -> DetectorFamily {
        DetectorFamily::Investment
    }

    fn name(&self) -> &'static str {
        "investment_scam_detector"
    }

    fn spam_threshold(&self) -> f64 {
        0.7
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

        let (mut total, _max) = score_categories(&self.patterns, text, &folded, &mut patterns);

        let tagged = self.tagged_users_score(comment, text, &folded);
        if tagged > 0.0 {
            patterns.push(DetectedPattern::new(
                DetectorFamily::Investment.pattern_type(),
                "tagged_users",
                "investment_content_with_tags",
                TAGGED_USERS_WEIGHT,
            ));
            total += tagged * TAGGED_USERS_WEIGHT;
        }

        let confidence = total.min(1.0);

        debug!(
            detector = "investment",
            confidence,
            patterns = patterns.len(),
            "Investment scam scoring complete"
        );

        Evidence {
            confidence,
            patterns,
        }
    }
}
