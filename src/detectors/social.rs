//! Social engineering detector.
//!
//! Detects spam spread by tagging friends: tag floods, "share with your
//! friends" manipulation, fake urgency, authority claims, social proof and
//! bot-like posting accounts. Combined tactics earn a bonus.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::debug;

use super::{score_categories, DetectedPattern, Detector, DetectorFamily, Evidence, Normalization, PatternRegistry};
use crate::comment::Comment;
use crate::error::Result;

pub const MANIPULATION_PHRASES: &str = "manipulation_phrases";
pub const URGENCY_TACTICS: &str = "urgency_tactics";
pub const AUTHORITY_CLAIMS: &str = "authority_claims";
pub const SOCIAL_PROOF_PHRASES: &str = "social_proof_phrases";

const EXCESSIVE_TAGGING: &str = "excessive_tagging";
const COORDINATED_BEHAVIOR: &str = "coordinated_behavior";

const TAGGING_WEIGHT: f64 = 0.6;
const COORDINATED_WEIGHT: f64 = 0.4;
const CROSS_SIGNAL_BONUS: f64 = 0.2;

/// Accounts younger than this are suspicious.
const NEW_ACCOUNT_DAYS: u32 = 30;
/// Tag-heavy comments with less remaining text than this are suspicious.
const MIN_CONTENT_CHARS: usize = 20;

static GENERIC_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z]+ [A-Za-z]+$").unwrap());

static MENTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@\w+").unwrap());

static SEED_PATTERNS: LazyLock<PatternRegistry> = LazyLock::new(|| seed_patterns().unwrap());

fn seed_patterns() -> Result<PatternRegistry> {
    Ok(PatternRegistry::new(DetectorFamily::SocialEngineering)
        .with_keywords(
            MANIPULATION_PHRASES,
            0.4,
            Normalization::Linear,
            &[
                "快告訴朋友", "分享給朋友", "讓朋友知道", "推薦給朋友",
                "告訴身邊的人", "分享出去", "讓更多人知道",
                "一起來看", "大家一起", "邀請朋友",
            ],
        )
        .with_keywords(
            URGENCY_TACTICS,
            0.3,
            Normalization::Linear,
            &[
                "名額有限", "僅限今天", "錯過就沒了", "最後機會",
                "限時限量", "售完為止", "今日特價", "限今日",
            ],
        )
        .with_regexes(
            AUTHORITY_CLAIMS,
            0.5,
            Normalization::Linear,
            &[
                r".*專家.*推薦",
                r".*老師.*建議",
                r".*大師.*說",
                r".*權威.*認證",
                r".*官方.*推薦",
            ],
        )?
        .with_keywords(
            SOCIAL_PROOF_PHRASES,
            0.3,
            Normalization::Linear,
            &[
                "很多人都在", "大家都說", "朋友都推薦", "網友分享",
                "熱門推薦", "爆紅", "瘋傳", "討論度很高",
            ],
        ))
}

/// Score tag count against text length.
pub fn excessive_tagging_score(tag_count: usize, text_len: usize) -> f64 {
    if tag_count == 0 {
        return 0.0;
    }

    if tag_count > 5 {
        1.0
    } else if tag_count > 3 && text_len < 100 {
        0.8
    } else if tag_count > 2 && text_len < 50 {
        0.6
    } else if tag_count as f64 > text_len as f64 / 20.0 {
        0.4
    } else {
        0.0
    }
}

/// Fraction of bot-like posting factors present: new account, generic
/// two-word display name, and a tag-heavy comment with almost no content.
pub fn coordinated_behavior_score(comment: &Comment) -> f64 {
    let mut factors = 0u32;

    if let Some(author) = &comment.author {
        if author.account_age_days.is_some_and(|days| days < NEW_ACCOUNT_DAYS) {
            factors += 1;
        }
        if author.name.as_deref().is_some_and(|name| GENERIC_NAME.is_match(name)) {
            factors += 1;
        }
    }

    if !comment.tagged_users.is_empty() {
        let remaining = MENTION.replace_all(&comment.text, "");
        if remaining.trim().chars().count() < MIN_CONTENT_CHARS {
            factors += 1;
        }
    }

    (factors as f64 / 3.0).min(1.0)
}

/// Social engineering detector.
#[derive(Debug, Clone)]
pub struct SocialEngineeringDetector {
    patterns: Arc<PatternRegistry>,
    enabled: bool,
}

impl SocialEngineeringDetector {
    /// Create a new detector with the seed patterns.
    pub fn new(enabled: bool) -> Self {
        Self {
            patterns: Arc::new(SEED_PATTERNS.clone()),
            enabled,
        }
    }
}

impl Default for SocialEngineeringDetector {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Detector for SocialEngineeringDetector {
    fn family(&self) -> DetectorFamily {
        DetectorFamily::SocialEngineering
    }

    fn name(&self) -> &'static str {
        "social_engineering_detector"
    }

    fn spam_threshold(&self) -> f64 {
        0.6
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
        let kind = DetectorFamily::SocialEngineering.pattern_type();
        let tags = comment.tagged_users.len();
        let mut patterns = Vec::new();
        let mut total = 0.0;
        let mut max = 0.0;

        let tagging = excessive_tagging_score(tags, comment.text_len());
        if tagging > 0.0 {
            patterns.push(DetectedPattern::new(
                kind,
                EXCESSIVE_TAGGING,
                format!("{} users tagged", tags),
                TAGGING_WEIGHT,
            ));
            total += tagging * TAGGING_WEIGHT;
            max += TAGGING_WEIGHT;
        }

        let (category_total, category_max) = score_categories(&self.patterns, text, &folded, &mut patterns);
        total += category_total;
        max += category_max;

        let coordinated = coordinated_behavior_score(comment);
        if coordinated > 0.0 {
            patterns.push(DetectedPattern::new(
                kind,
                COORDINATED_BEHAVIOR,
                "suspicious posting pattern",
                COORDINATED_WEIGHT,
            ));
            total += coordinated * COORDINATED_WEIGHT;
            max += COORDINATED_WEIGHT;
        }

        // Tagging combined with any other tactic
        if tags > 0 && patterns.iter().any(|p| p.category != EXCESSIVE_TAGGING) {
            total += CROSS_SIGNAL_BONUS;
            max += CROSS_SIGNAL_BONUS;
        }

        let confidence = if max > 0.0 { (total / max).min(1.0) } else { 0.0 };

        debug!(
            detector = "social_engineering",
            confidence,
            tags,
            patterns = patterns.len(),
            "Social engineering scoring complete"
        );

        Evidence {
            confidence,
            patterns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comment::UserRef;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_excessive_tagging_score() {
        assert_eq!(excessive_tagging_score(0, 5), 0.0);
        assert_eq!(excessive_tagging_score(6, 500), 1.0);
        assert_eq!(excessive_tagging_score(4, 50), 0.8);
        assert_eq!(excessive_tagging_score(3, 40), 0.6);
        assert_eq!(excessive_tagging_score(3, 55), 0.4);
        assert_eq!(excessive_tagging_score(1, 200), 0.0);
    }

    #[test]
    fn test_coordinated_behavior_all_factors() {
        let comment = Comment::new("@bob hi")
            .with_author(UserRef::with_id("1").named("John Smith").aged(10))
            .with_tagged_user(UserRef::with_username("bob"));
        assert_eq!(coordinated_behavior_score(&comment), 1.0);
    }

    #[test]
    fn test_coordinated_behavior_established_account() {
        let comment = Comment::new("我覺得這部電影的配樂真的很棒，推薦大家去電影院看")
            .with_author(UserRef::with_id("1").named("王小明").aged(900))
            .with_tagged_user(UserRef::with_username("bob"));
        assert_eq!(coordinated_behavior_score(&comment), 0.0);
    }

    #[test]
    fn test_tagging_with_manipulation() {
        let detector = SocialEngineeringDetector::default();
        let result = detector.detect(&Comment::new("大家一起來看 推薦給朋友").with_tagged_count(4));

        // tagging 0.8, manipulation 3/10, one coordinated factor, cross-signal bonus
        let total = 0.8 * 0.6 + 0.3 * 0.4 + (1.0 / 3.0) * 0.4 + 0.2;
        let max = 0.6 + 1.5 + 0.4 + 0.2;
        assert!(approx(result.confidence, total / max), "confidence: {}", result.confidence);

        let tagging = result
            .patterns
            .iter()
            .find(|p| p.category == EXCESSIVE_TAGGING)
            .expect("tagging pattern");
        assert_eq!(tagging.pattern, "4 users tagged");
        assert_eq!(tagging.weight, 0.6);
        assert!(result.patterns.iter().any(|p| p.category == MANIPULATION_PHRASES));
        assert!(result.patterns.iter().any(|p| p.category == COORDINATED_BEHAVIOR));
    }

    #[test]
    fn test_authority_claim() {
        let detector = SocialEngineeringDetector::default();
        let result = detector.detect(&Comment::new("專家推薦這個產品"));
        let authority = result
            .patterns
            .iter()
            .find(|p| p.category == AUTHORITY_CLAIMS)
            .expect("authority pattern");
        assert_eq!(authority.pattern, "專家推薦");
        assert!(approx(result.confidence, (1.0 / 5.0) * 0.5 / 1.5));
    }

    #[test]
    fn test_benign_comment() {
        let detector = SocialEngineeringDetector::default();
        let result = detector.detect(&Comment::new("這篇文章寫得很好，謝謝分享！"));
        assert_eq!(result.confidence, 0.0);
        assert!(result.patterns.is_empty());
    }

    #[test]
    fn test_tag_flood_with_other_tactics() {
        let detector = SocialEngineeringDetector::default();
        let result = detector.detect(
            &Comment::new(
                "專家推薦 官方推薦 老師建議 大師說 權威認證 名額有限 最後機會 快告訴朋友 分享出去 很多人都在 爆紅",
            )
                .with_author(UserRef::with_id("9").named("Amy Lee").aged(3))
                .with_tagged_count(8),
        );
        assert!(result.confidence > 0.6, "confidence: {}", result.confidence);
        assert!(result.is_spam);
    }

    #[test]
    fn test_add_authority_pattern() {
        let mut detector = SocialEngineeringDetector::default();
        let comment = Comment::new("醫生掛保證");
        assert_eq!(detector.detect(&comment).confidence, 0.0);
        detector.add_pattern(AUTHORITY_CLAIMS, r"醫生.*保證").unwrap();
        assert!(detector.detect(&comment).confidence > 0.0);
    }
}
