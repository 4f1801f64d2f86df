//! Cryptocurrency scam detector.
//!
//! Looks for crypto vocabulary stacked with get-rich promises, insider
//! phrasing, "guaranteed" platforms, and links to look-alike trading sites.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::debug;

use super::{score_categories, DetectedPattern, Detector, DetectorFamily, Evidence, Normalization, PatternRegistry};
use crate::comment::{link_host, Comment};
use crate::error::Result;

pub const CRYPTO_KEYWORDS: &str = "crypto_keywords";
pub const SCAM_PROMISES: &str = "scam_promises";
pub const SCAM_PHRASES: &str = "scam_phrases";
pub const SUSPICIOUS_PLATFORMS: &str = "suspicious_platforms";

const SUSPICIOUS_LINKS_WEIGHT: f64 = 0.4;

/// Hostname shapes common to scam trading sites.
static SUSPICIOUS_DOMAINS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"-crypto.*\.com$").unwrap(),
        Regex::new(r"bitcoin.*\.top$").unwrap(),
        Regex::new(r"eth.*\.cc$").unwrap(),
        Regex::new(r"trade.*\.xyz$").unwrap(),
        Regex::new(r"invest.*\.info$").unwrap(),
    ]
});

static SEED_PATTERNS: LazyLock<PatternRegistry> = LazyLock::new(|| seed_patterns().unwrap());

fn seed_patterns() -> Result<PatternRegistry> {
    PatternRegistry::new(DetectorFamily::Crypto)
        .with_keywords(
            CRYPTO_KEYWORDS,
            0.5,
            Normalization::Logarithmic,
            &[
                "比特幣", "以太幣", "以太坊", "萊特幣", "瑞波幣",
                "Bitcoin", "BTC", "Ethereum", "ETH", "Litecoin", "LTC",
                "Ripple", "XRP", "Dogecoin", "DOGE", "Cardano", "ADA",
                "加密貨幣", "虛擬貨幣", "數位貨幣", "區塊鏈", "挖礦",
            ],
        )
        .with_regexes(
            SCAM_PROMISES,
            0.8,
            Normalization::Logarithmic,
            &[
                r"快速致富.*加密",
                r"躺著賺.*比特幣",
                r"一夜暴富.*虛擬貨幣",
                r"保證獲利.*crypto",
                r"穩賺.*區塊鏈",
                r"零風險.*挖礦",
            ],
        )?
        .with_keywords(
            SCAM_PHRASES,
            0.6,
            Normalization::Logarithmic,
            &[
                "內幕消息", "獨家資訊", "幣圈大佬", "合約交易",
                "槓桿交易", "量化交易", "DeFi挖礦", "NFT暴漲",
                "空投福利", "白名單", "私募額度", "早期投資",
            ],
        )
        .with_regexes(
            SUSPICIOUS_PLATFORMS,
            0.7,
            Normalization::Logarithmic,
            &[
                r".*交易所.*保證",
                r".*平台.*穩賺",
                r".*APP.*獲利",
                r".*系統.*自動",
            ],
        )
}

/// Whether a link points at a look-alike crypto trading host.
pub fn is_suspicious_crypto_domain(link: &str) -> bool {
    match link_host(link) {
        Some(host) => SUSPICIOUS_DOMAINS.iter().any(|re| re.is_match(&host)),
        None => false,
    }
}

/// Cryptocurrency scam detector.
#[derive(Debug, Clone)]
pub struct CryptoScamDetector {
    patterns: Arc<PatternRegistry>,
    enabled: bool,
}

impl CryptoScamDetector {
    /// Create a new detector with the seed patterns.
    pub fn new(enabled: bool) -> Self {
        Self {
            patterns: Arc::new(SEED_PATTERNS.clone()),
            enabled,
        }
    }

    /// Share of links pointing at suspicious hosts, counted only when the
    /// text mentions a crypto asset.
    fn suspicious_links_score(&self, comment: &Comment, text: &str, folded: &str) -> f64 {
        if comment.links.is_empty() {
            return 0.0;
        }

        let has_crypto_content = self
            .patterns
            .category(CRYPTO_KEYWORDS)
            .is_some_and(|c| c.matches_any(text, folded));
        if !has_crypto_content {
            return 0.0;
        }

        let suspicious = comment
            .links
            .iter()
            .filter(|link| is_suspicious_crypto_domain(link))
            .count();

        if suspicious > 0 {
            (suspicious as f64 / comment.links.len() as f64).min(1.0)
        } else {
            0.0
        }
    }
}

impl Default for CryptoScamDetector {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Detector for CryptoScamDetector {
    fn family(&self) -> DetectorFamily {
        DetectorFamily::Crypto
    }

    fn name(&self) -> &'static str {
        "crypto_scam_detector"
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
        let mut patterns = Vec::new();

        let (mut total, _max) = score_categories(&self.patterns, text, &folded, &mut patterns);

        let links = self.suspicious_links_score(comment, text, &folded);
        if links > 0.0 {
            patterns.push(DetectedPattern::new(
                DetectorFamily::Crypto.pattern_type(),
                "suspicious_links",
                "crypto_related_suspicious_links",
                SUSPICIOUS_LINKS_WEIGHT,
            ));
            total += links * SUSPICIOUS_LINKS_WEIGHT;
        }

        let confidence = total.min(1.0);

        debug!(
            detector = "crypto",
            confidence,
            patterns = patterns.len(),
            "Crypto scam scoring complete"
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

    #[test]
    fn test_coin_names_only() {
        let detector = CryptoScamDetector::default();
        let result = detector.detect(&Comment::new("比特幣 以太幣").with_link("https://news.example.com/a"));

        let expected = 3f64.ln() / 23f64.ln() * 0.5;
        assert!((result.confidence - expected).abs() < 1e-9);
        assert!(result.confidence < 0.6);
        assert!(!result.is_spam);
        assert_eq!(result.patterns.len(), 2);
        assert!(result.patterns.iter().all(|p| p.category == CRYPTO_KEYWORDS));
    }

    #[test]
    fn test_scam_promise_stack() {
        let detector = CryptoScamDetector::default();
        let result = detector.detect(&Comment::new(
            "比特幣 區塊鏈 內幕消息 合約交易 穩賺區塊鏈 這個交易所保證翻倍",
        ));
        assert!(result.confidence > 0.6, "confidence: {}", result.confidence);
        assert!(result.is_spam);

        let categories: Vec<&str> = result.patterns.iter().map(|p| p.category.as_str()).collect();
        assert!(categories.contains(&SCAM_PROMISES));
        assert!(categories.contains(&SCAM_PHRASES));
        assert!(categories.contains(&SUSPICIOUS_PLATFORMS));
    }

    #[test]
    fn test_suspicious_domain_patterns() {
        assert!(is_suspicious_crypto_domain("https://best-crypto-gains.com/join"));
        assert!(is_suspicious_crypto_domain("http://freebitcoin.top"));
        assert!(is_suspicious_crypto_domain("https://ETHdouble.cc/x"));
        assert!(is_suspicious_crypto_domain("https://mytrade.xyz"));
        assert!(is_suspicious_crypto_domain("https://invest-now.info"));
        assert!(!is_suspicious_crypto_domain("https://www.coinbase.com"));
        assert!(!is_suspicious_crypto_domain("not a url"));
    }

    #[test]
    fn test_suspicious_links_ratio() {
        let detector = CryptoScamDetector::default();
        let base = detector.detect(&Comment::new("BTC"));
        let result = detector.detect(
            &Comment::new("BTC")
                .with_link("https://freebitcoin.top/")
                .with_link("https://example.org/"),
        );
        assert!((result.confidence - base.confidence - 0.5 * 0.4).abs() < 1e-9);
        assert!(result.patterns.iter().any(|p| p.category == "suspicious_links"));
    }

    #[test]
    fn test_suspicious_links_need_crypto_text() {
        let detector = CryptoScamDetector::default();
        let result = detector.detect(&Comment::new("看看這個").with_link("https://freebitcoin.top/"));
        assert_eq!(result.confidence, 0.0);
        assert!(result.patterns.is_empty());
    }

    #[test]
    fn test_malformed_link_is_not_suspicious() {
        let detector = CryptoScamDetector::default();
        let result = detector.detect(&Comment::new("BTC").with_link("%%%"));
        assert!(!result.patterns.iter().any(|p| p.category == "suspicious_links"));
    }

    #[test]
    fn test_disabled_detector() {
        let mut detector = CryptoScamDetector::default();
        detector.set_enabled(false);
        let result = detector.detect(&Comment::new("比特幣 內幕消息"));
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_add_pattern() {
        let mut detector = CryptoScamDetector::default();
        let comment = Comment::new("快來買 SOLANA");
        assert_eq!(detector.detect(&comment).confidence, 0.0);
        detector.add_pattern(CRYPTO_KEYWORDS, "Solana").unwrap();
        assert!(detector.detect(&comment).confidence > 0.0);
    }
}
