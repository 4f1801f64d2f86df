//! Block/allow-list filter.
//!
//! Lists short-circuit the detector pipeline. The allow-list is checked
//! first, so an author on both lists is never flagged.

use std::collections::HashSet;

use tracing::debug;

use crate::comment::Comment;
use crate::config::SpamGuardConfig;
use crate::detectors::{DetectedPattern, PatternType};
use crate::score::{DetectionReason, DetectionResult};

/// Confidence for a block-listed author.
pub const BLACKLISTED_USER_CONFIDENCE: f64 = 1.0;
/// Confidence for a block-listed keyword.
pub const BLACKLISTED_KEYWORD_CONFIDENCE: f64 = 0.9;

const WHITELISTED_USER: &str = "whitelisted_user";
const WHITELISTED_DOMAIN: &str = "whitelisted_domain";
const BLACKLISTED_USER: &str = "blacklisted_user";
const BLACKLISTED_KEYWORD: &str = "blacklisted_keyword";

fn id_set(list: &[String]) -> HashSet<String> {
    list.iter()
        .map(|u| u.trim())
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .collect()
}

/// Block/allow-list membership checks.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    blocked_users: HashSet<String>,
    /// (original, lowercased)
    blocked_keywords: Vec<(String, String)>,
    allowed_users: HashSet<String>,
    allowed_domains: HashSet<String>,
}

impl ListFilter {
    /// Build the filter from configuration. Blank entries are ignored.
    pub fn from_config(config: &SpamGuardConfig) -> Self {
        let mut blocked_keywords: Vec<(String, String)> = Vec::new();
        for keyword in &config.blacklist.keywords {
            if keyword.trim().is_empty() || blocked_keywords.iter().any(|(k, _)| k == keyword) {
                continue;
            }
            blocked_keywords.push((keyword.clone(), keyword.to_lowercase()));
        }

        Self {
            blocked_users: id_set(&config.blacklist.users),
            blocked_keywords,
            allowed_users: id_set(&config.whitelist.users),
            allowed_domains: config
                .whitelist
                .domains
                .iter()
                .map(|d| d.trim().to_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    pub fn blocked_user_count(&self) -> usize {
        self.blocked_users.len()
    }

    pub fn blocked_keyword_count(&self) -> usize {
        self.blocked_keywords.len()
    }

    pub fn allowed_user_count(&self) -> usize {
        self.allowed_users.len()
    }

    pub fn allowed_domain_count(&self) -> usize {
        self.allowed_domains.len()
    }

    /// Allow-list check: author id/username, or any link hostname.
    ///
    /// Returns the synthetic pattern describing the match.
    pub fn allow_list_match(&self, comment: &Comment) -> Option<DetectedPattern> {
        if let Some(author) = &comment.author {
            if let Some(id) = author.identifiers().find(|id| self.allowed_users.contains(*id)) {
                return Some(DetectedPattern::new(PatternType::ListFilter, WHITELISTED_USER, id, 0.0));
            }
        }

        if self.allowed_domains.is_empty() {
            return None;
        }

        comment
            .link_hosts()
            .find(|host| self.allowed_domains.contains(host))
            .map(|host| DetectedPattern::new(PatternType::ListFilter, WHITELISTED_DOMAIN, host, 0.0))
    }

    /// Block-list check: author first, then keywords.
    pub fn block_list_match(&self, comment: &Comment) -> Option<DetectionResult> {
        if let Some(author) = &comment.author {
            if let Some(id) = author.identifiers().find(|id| self.blocked_users.contains(*id)) {
                debug!(user = id, "Author is block-listed");
                return Some(DetectionResult::list_match(
                    true,
                    BLACKLISTED_USER_CONFIDENCE,
                    DetectionReason::BlacklistedUser,
                    vec![DetectedPattern::new(
                        PatternType::ListFilter,
                        BLACKLISTED_USER,
                        id,
                        BLACKLISTED_USER_CONFIDENCE,
                    )],
                ));
            }
        }

        if self.blocked_keywords.is_empty() {
            return None;
        }

        let folded = comment.text.to_lowercase();
        let matched: Vec<DetectedPattern> = self
            .blocked_keywords
            .iter()
            .filter(|(_, lowered)| folded.contains(lowered.as_str()))
            .map(|(keyword, _)| {
                DetectedPattern::new(
                    PatternType::ListFilter,
                    BLACKLISTED_KEYWORD,
                    keyword.as_str(),
                    BLACKLISTED_KEYWORD_CONFIDENCE,
                )
            })
            .collect();

        if matched.is_empty() {
            return None;
        }

        debug!(keywords = matched.len(), "Text contains block-listed keywords");
        Some(DetectionResult::list_match(
            true,
            BLACKLISTED_KEYWORD_CONFIDENCE,
            DetectionReason::BlacklistedKeywords,
            matched,
        ))
    }

    /// Run both lists. `None` means the detectors must decide.
    pub fn check(&self, comment: &Comment) -> Option<DetectionResult> {
        if let Some(pattern) = self.allow_list_match(comment) {
            debug!(category = %pattern.category, value = %pattern.pattern, "Comment is allow-listed");
            return Some(DetectionResult::list_match(
                false,
                0.0,
                DetectionReason::Whitelisted,
                vec![pattern],
            ));
        }
        self.block_list_match(comment)
    }
}
