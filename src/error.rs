//! Error types for the comment spam engine.

use thiserror::Error;

use crate::detectors::DetectorFamily;

/// Errors raised by pattern management and internal engine faults.
///
/// `DetectionEngine::analyze` never surfaces these to callers; they are
/// logged and folded into a fail-open `analysis_error` result.
#[derive(Debug, Error)]
pub enum SpamGuardError {
    /// A regular expression failed to compile.
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// The named category does not exist in the detector's registry.
    #[error("unknown pattern category '{category}' for {family} detector")]
    UnknownCategory {
        family: DetectorFamily,
        category: String,
    },

    /// A blank pattern would match every comment.
    #[error("empty pattern for category '{category}'")]
    EmptyPattern { category: String },

    /// A category weight was NaN or infinite.
    #[error("invalid weight {weight} for category '{category}'")]
    InvalidWeight { category: String, weight: f64 },

    /// Engine state lock was poisoned by a panicking writer.
    #[error("engine state lock poisoned")]
    LockPoisoned,

    /// A detector panicked while scoring a comment.
    #[error("{0} detector panicked during analysis")]
    DetectorPanicked(DetectorFamily),
}

pub type Result<T> = std::result::Result<T, SpamGuardError>;
