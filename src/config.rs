//! Configuration types for the comment spam engine.
//!
//! Every section is `#[serde(default)]`: missing keys fall back to
//! permissive, non-blocking behavior.

use serde::{Deserialize, Serialize};

use crate::detectors::DetectorFamily;

/// Main configuration for the comment spam engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpamGuardConfig {
    /// Global kill switch. Owned by the caller; the engine itself ignores it.
    pub enabled: bool,

    /// Per-family detector switches
    pub detection_patterns: DetectionPatternsConfig,

    /// Users and keywords that are always spam
    pub blacklist: BlacklistConfig,

    /// Users and link domains that are never spam
    pub whitelist: WhitelistConfig,

    /// Behavior settings
    pub settings: SettingsConfig,
}

impl Default for SpamGuardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            detection_patterns: DetectionPatternsConfig::default(),
            blacklist: BlacklistConfig::default(),
            whitelist: WhitelistConfig::default(),
            settings: SettingsConfig::default(),
        }
    }
}

impl SpamGuardConfig {
    /// Configuration with every detection family enabled.
    pub fn recommended() -> Self {
        Self {
            detection_patterns: DetectionPatternsConfig::all(),
            ..Default::default()
        }
    }

    /// Set aggressive mode.
    pub fn with_aggressive_mode(mut self, aggressive: bool) -> Self {
        self.settings.aggressive_mode = aggressive;
        self
    }
}

/// Detection family switches. An absent family is disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DetectionPatternsConfig {
    pub investment_scams: bool,
    pub crypto_scams: bool,
    pub generic_spam: bool,
    pub social_engineering: bool,
}

impl DetectionPatternsConfig {
    /// All families enabled.
    pub fn all() -> Self {
        Self {
            investment_scams: true,
            crypto_scams: true,
            generic_spam: true,
            social_engineering: true,
        }
    }

    /// Whether the given family is enabled.
    pub fn is_enabled(&self, family: DetectorFamily) -> bool {
        match family {
            DetectorFamily::Investment => self.investment_scams,
            DetectorFamily::Crypto => self.crypto_scams,
            DetectorFamily::Generic => self.generic_spam,
            DetectorFamily::SocialEngineering => self.social_engineering,
        }
    }

    /// Set the switch for one family.
    pub fn set(&mut self, family: DetectorFamily, enabled: bool) {
        match family {
            DetectorFamily::Investment => self.investment_scams = enabled,
            DetectorFamily::Crypto => self.crypto_scams = enabled,
            DetectorFamily::Generic => self.generic_spam = enabled,
            DetectorFamily::SocialEngineering => self.social_engineering = enabled,
        }
    }
}

/// Block-list configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BlacklistConfig {
    /// User ids or usernames
    pub users: Vec<String>,

    /// Keywords matched as case-insensitive substrings
    pub keywords: Vec<String>,
}

/// Allow-list configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WhitelistConfig {
    /// User ids or usernames
    pub users: Vec<String>,

    /// Link hostnames (exact match)
    pub domains: Vec<String>,
}

/// Behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsConfig {
    /// Lower the ensemble spam threshold from 0.8 to 0.6
    pub aggressive_mode: bool,

    /// UI-only: show notifications when a comment is hidden
    pub show_notifications: bool,

    /// UI-only: collaborator log level
    pub log_level: String,

    /// UI-only: auto-update pattern lists
    pub auto_update: bool,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            aggressive_mode: false,
            show_notifications: true,
            log_level: "info".to_string(),
            auto_update: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SpamGuardConfig::default();
        assert!(config.enabled);
        assert!(!config.settings.aggressive_mode);
        assert_eq!(config.detection_patterns, DetectionPatternsConfig::default());
        assert!(!config.detection_patterns.investment_scams);
        assert!(config.blacklist.users.is_empty());
        assert!(config.whitelist.domains.is_empty());
    }

    #[test]
    fn test_recommended_enables_all_families() {
        let config = SpamGuardConfig::recommended();
        for family in DetectorFamily::ALL {
            assert!(config.detection_patterns.is_enabled(family));
        }
    }

    #[test]
    fn test_partial_config_from_json() {
        let json = r#"{
            "detectionPatterns": {"cryptoScams": true},
            "blacklist": {"keywords": ["快速致富"]},
            "settings": {"aggressiveMode": true}
        }"#;
        let config: SpamGuardConfig = serde_json::from_str(json).unwrap();
        assert!(config.detection_patterns.crypto_scams);
        assert!(!config.detection_patterns.investment_scams);
        assert_eq!(config.blacklist.keywords, vec!["快速致富"]);
        assert!(config.blacklist.users.is_empty());
        assert!(config.settings.aggressive_mode);
        assert!(config.settings.show_notifications);
    }

    #[test]
    fn test_empty_config_from_json() {
        let config: SpamGuardConfig = serde_json::from_str("{}").unwrap();
        assert!(config.enabled);
        assert!(!config.detection_patterns.generic_spam);
    }

    #[test]
    fn test_config_serialization() {
        let config = SpamGuardConfig::recommended().with_aggressive_mode(true);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"aggressiveMode\":true"));
        let parsed: SpamGuardConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.detection_patterns, config.detection_patterns);
    }

    #[test]
    fn test_family_switch_set() {
        let mut patterns = DetectionPatternsConfig::all();
        patterns.set(DetectorFamily::Generic, false);
        assert!(!patterns.is_enabled(DetectorFamily::Generic));
        assert!(patterns.is_enabled(DetectorFamily::Crypto));
    }
}
