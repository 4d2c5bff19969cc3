//! Unified error type for feed synchronization
//!
//! One flat error enum shared by every crate in the workspace. Lower-level
//! errors (`StorageError`, `NetworkError`, `DecodeError`) convert into it at
//! crate boundaries.

use serde::{Deserialize, Serialize};

use crate::effects::network::NetworkError;
use crate::effects::storage::StorageError;
use crate::wire::DecodeError;

/// Unified error type for all feed operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum FeedError {
    /// Malformed wire response or identifier
    #[error("Parse error: {message}")]
    Parse {
        /// Error message describing what failed to parse
        message: String,
    },

    /// Resource not found
    #[error("Not found: {message}")]
    NotFound {
        /// Error message describing what was not found
        message: String,
    },

    /// Persistence failure after the store exhausted its retries
    #[error("Storage error: {message}")]
    Storage {
        /// Error message describing the storage failure
        message: String,
    },

    /// Transport failure
    #[error("Network error: {message}")]
    Network {
        /// Error message describing the network issue
        message: String,
    },

    /// Invalid input or configuration
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Bounded wait elapsed
    #[error("Timed out: {message}")]
    Timeout {
        /// Error message describing the wait that elapsed
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl FeedError {
    /// Create a parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable numeric code reported to the scheduler on request errors.
    pub fn code(&self) -> u16 {
        match self {
            Self::Parse { .. } => 1,
            Self::NotFound { .. } => 2,
            Self::Storage { .. } => 3,
            Self::Network { .. } => 4,
            Self::Invalid { .. } => 5,
            Self::Timeout { .. } => 6,
            Self::Internal { .. } => 7,
        }
    }
}

/// Standard Result type for feed operations
pub type Result<T> = std::result::Result<T, FeedError>;

impl From<StorageError> for FeedError {
    fn from(err: StorageError) -> Self {
        Self::storage(err.to_string())
    }
}

impl From<NetworkError> for FeedError {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::Timeout => Self::timeout("network request"),
            other => Self::network(other.to_string()),
        }
    }
}

impl From<DecodeError> for FeedError {
    fn from(err: DecodeError) -> Self {
        Self::parse(err.to_string())
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(err.to_string())
    }
}

impl From<std::io::Error> for FeedError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            _ => Self::internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = FeedError::parse("bad operation");
        assert!(matches!(err, FeedError::Parse { .. }));
        assert_eq!(err.to_string(), "Parse error: bad operation");
    }

    #[test]
    fn error_codes_are_unique() {
        let errors = [
            FeedError::parse("x"),
            FeedError::not_found("x"),
            FeedError::storage("x"),
            FeedError::network("x"),
            FeedError::invalid("x"),
            FeedError::timeout("x"),
            FeedError::internal("x"),
        ];
        let codes: std::collections::HashSet<_> = errors.iter().map(FeedError::code).collect();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn network_timeout_maps_to_timeout() {
        let err = FeedError::from(NetworkError::Timeout);
        assert!(matches!(err, FeedError::Timeout { .. }));
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "snapshot missing");
        assert!(matches!(FeedError::from(io_err), FeedError::NotFound { .. }));
    }
}
