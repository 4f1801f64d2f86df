//! Comment spam detection for Zentinel
//!
//! Classifies social-media comments as spam, aimed at the scam campaigns
//! that flood comment sections: fake investment teachers, crypto get-rich
//! schemes, generic promotional spam, and tag-your-friends manipulation.
//!
//! # Features
//!
//! - Block/allow lists by author and link domain
//! - Investment and crypto scam detection
//! - Generic spam heuristics (emoji runs, shouting, short links)
//! - Social engineering and coordinated-account detection
//! - Weighted ensemble with an aggressive mode
//! - Runtime pattern management
//!
//! # Example
//!
//! ```ignore
//! use zentinel_comment_spam::{Comment, DetectionEngine, SpamGuardConfig};
//!
//! let engine = DetectionEngine::new(SpamGuardConfig::recommended());
//! let result = engine.analyze(&Comment::new("投資老師帶你保證獲利"));
//! if result.is_spam {
//!     // hide the comment
//! }
//! ```

pub mod comment;
pub mod config;
pub mod detectors;
pub mod engine;
pub mod error;
pub mod lists;
pub mod score;
pub mod stats;

pub use comment::{Comment, UserRef};
pub use config::SpamGuardConfig;
pub use detectors::{DetectedPattern, DetectorFamily, DetectorResult, PatternType};
pub use engine::DetectionEngine;
pub use error::{Result, SpamGuardError};
pub use lists::ListFilter;
pub use score::{DetectionReason, DetectionResult};
pub use stats::EngineStatistics;
