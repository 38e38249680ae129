//! Unified error types for the collector.
//!
//! Two distinct failure families:
//! - `RejectReason`: client-payload problems (REJECT_001-004). Swallowed at
//!   the ingestion boundary and only visible through diagnostics.
//! - `Error`: persistence and aggregation failures (STORE_001). Logged and,
//!   for ingestion, surfaced only when the store is unreachable.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Why an inbound payload was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// REJECT_001: Body is not valid JSON or fails field validation
    MalformedPayload,
    /// REJECT_002: Body exceeds the per-event size limit
    TooLarge,
    /// REJECT_003: Missing or empty visitorId/sessionId
    MissingIdentity,
    /// REJECT_004: Unknown range selector on a query
    InvalidRange,
}

impl RejectReason {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedPayload => "REJECT_001",
            Self::TooLarge => "REJECT_002",
            Self::MissingIdentity => "REJECT_003",
            Self::InvalidRange => "REJECT_004",
        }
    }

    /// Stable label used as a diagnostics counter key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedPayload => "malformed_payload",
            Self::TooLarge => "too_large",
            Self::MissingIdentity => "missing_identity",
            Self::InvalidRange => "invalid_range",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.as_str())
    }
}

/// Persistence error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
    /// STORE_001: Failed to durably append an event
    WriteFailed,
}

impl StoreErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::WriteFailed => "STORE_001",
        }
    }
}

/// Unified error type for the collector.
#[derive(Debug, Error)]
pub enum Error {
    /// Persistence error with code.
    #[error("[{code}] {message}")]
    Store {
        code: &'static str,
        message: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("aggregation error: {0}")]
    Aggregation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a persistence error.
    pub fn store(code: StoreErrorCode, msg: impl Into<String>) -> Self {
        Self::Store {
            code: code.code(),
            message: msg.into(),
        }
    }

    pub fn write_failed(msg: impl Into<String>) -> Self {
        Self::store(StoreErrorCode::WriteFailed, msg)
    }

    pub fn aggregation(msg: impl Into<String>) -> Self {
        Self::Aggregation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error means the store could not accept the write.
    pub fn is_write_failure(&self) -> bool {
        matches!(self, Self::Store { .. } | Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_codes() {
        assert_eq!(RejectReason::MalformedPayload.code(), "REJECT_001");
        assert_eq!(RejectReason::InvalidRange.code(), "REJECT_004");
        assert_eq!(RejectReason::TooLarge.as_str(), "too_large");
    }

    #[test]
    fn test_store_error() {
        let err = Error::write_failed("disk full");
        assert!(err.is_write_failure());
        assert_eq!(err.to_string(), "[STORE_001] disk full");
    }
}
