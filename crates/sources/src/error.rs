//! Error taxonomy for external platforms.
//!
//! Every variant is scoped to one platform. The pipeline absorbs all of
//! them at the aggregator boundary; only `Transient` is worth retrying.

use thiserror::Error;
use tracks::Platform;

/// Errors raised while talking to a recommendation source or a favorites platform
#[derive(Error, Debug)]
pub enum SourceError {
    /// Invalid, missing or expired credentials (HTTP 401/403)
    #[error("{platform} authentication failed: {reason}")]
    Authentication { platform: Platform, reason: String },

    /// Timeouts, connection failures, rate limiting, upstream 5xx
    #[error("{platform} request failed: {reason}")]
    Transient { platform: Platform, reason: String },

    /// Platform enabled but required credential fields are missing
    #[error("{platform} is not configured: {reason}")]
    Configuration { platform: Platform, reason: String },

    /// Upstream answered with something we can't interpret
    #[error("{platform} returned an invalid response: {reason}")]
    InvalidResponse { platform: Platform, reason: String },

    /// A transient error that survived every retry attempt
    #[error("{source} (gave up after {attempts} attempts)")]
    RetriesExhausted {
        attempts: u32,
        source: Box<SourceError>,
    },
}

impl SourceError {
    pub fn authentication(platform: Platform, reason: impl Into<String>) -> Self {
        Self::Authentication {
            platform,
            reason: reason.into(),
        }
    }

    pub fn transient(platform: Platform, reason: impl Into<String>) -> Self {
        Self::Transient {
            platform,
            reason: reason.into(),
        }
    }

    pub fn configuration(platform: Platform, reason: impl Into<String>) -> Self {
        Self::Configuration {
            platform,
            reason: reason.into(),
        }
    }

    pub fn invalid_response(platform: Platform, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            platform,
            reason: reason.into(),
        }
    }

    /// Whether retrying the same request could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::Transient { .. })
    }

    /// True for credential problems, including missing configuration
    pub fn is_authentication(&self) -> bool {
        match self {
            SourceError::Authentication { .. } | SourceError::Configuration { .. } => true,
            SourceError::RetriesExhausted { source, .. } => source.is_authentication(),
            _ => false,
        }
    }

    /// The platform this error belongs to
    pub fn platform(&self) -> Platform {
        match self {
            SourceError::Authentication { platform, .. }
            | SourceError::Transient { platform, .. }
            | SourceError::Configuration { platform, .. }
            | SourceError::InvalidResponse { platform, .. } => *platform,
            SourceError::RetriesExhausted { source, .. } => source.platform(),
        }
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, SourceError>;
