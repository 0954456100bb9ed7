//! Error types for ledgerlink.
//!
//! Uses `thiserror` for structured error types.
//!
//! ## Error Taxonomy
//!
//! Errors are categorized into five main categories:
//! - **Authentication**: Login rejection, expired sessions
//! - **Network**: Connection, timeout, DNS, or SSL/TLS issues
//! - **Service**: Structured errors returned by the ledger service (including
//!   per-field validation errors, passed through uninterpreted)
//! - **Storage**: Local persistent storage failures (quota, corrupt entries)
//! - **Internal**: Unexpected errors, bugs, or unclassified issues
//!
//! The split matters operationally: read paths recover from `Network` and
//! `Service` errors via cache fallback, write paths surface them unchanged,
//! and `SessionExpired` is terminal for the current authenticated flow.

use std::collections::BTreeMap;

use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for classification and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Authentication issues (rejected login, expired/missing credentials).
    Authentication,
    /// Network issues (timeout, DNS, connection refused).
    Network,
    /// Errors reported by the ledger service itself.
    Service,
    /// Local persistent storage issues.
    Storage,
    /// Internal errors (bugs, unexpected state, unclassified).
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Authentication => "Authentication error",
            Self::Network => "Network error",
            Self::Service => "Service error",
            Self::Storage => "Storage error",
            Self::Internal => "Internal error",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// ApiError
// =============================================================================

/// Per-field validation messages as returned by the ledger service,
/// preserved structurally so a form layer can render them next to inputs.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Main error type for ledgerlink operations.
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================================================
    // Authentication errors (Category: Authentication)
    // ==========================================================================
    /// Login was rejected by the authentication endpoint.
    #[error("login rejected: {reason}")]
    LoginRejected { reason: String },

    /// The session ended: refresh failed or a replayed request was rejected
    /// again. Terminal for the current authenticated flow, never retried.
    #[error("session expired")]
    SessionExpired,

    // ==========================================================================
    // Network errors (Category: Network)
    // ==========================================================================
    /// Request timed out. The effective timeout is whatever the client was
    /// configured with, so the message carries no number.
    #[error("request timed out")]
    Timeout,

    /// Generic network failure (DNS, refused connection, broken transfer).
    #[error("network error: {0}")]
    Network(String),

    // ==========================================================================
    // Service errors (Category: Service)
    // ==========================================================================
    /// The requested entity does not exist on the service.
    #[error("not found: {resource}")]
    NotFound { resource: String },

    /// The service rejected the request. Field-level validation messages
    /// are preserved when the response body carried them.
    #[error("service error ({status}): {message}")]
    Service {
        status: u16,
        message: String,
        field_errors: FieldErrors,
    },

    /// Failed to decode a service response body.
    #[error("failed to parse response: {0}")]
    ParseResponse(String),

    // ==========================================================================
    // Storage errors (Category: Storage)
    // ==========================================================================
    /// Local persistent storage failed in a way that could not be absorbed.
    #[error("storage error: {0}")]
    Storage(String),

    // ==========================================================================
    // Configuration errors (Category: Internal)
    // ==========================================================================
    /// Configuration loading or validation failed.
    #[error("configuration error: {0}")]
    Config(String),

    // ==========================================================================
    // I/O errors (Category: Internal)
    // ==========================================================================
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ApiError {
    /// Returns the error category for classification and routing.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::LoginRejected { .. } | Self::SessionExpired => ErrorCategory::Authentication,
            Self::Timeout | Self::Network(_) => ErrorCategory::Network,
            Self::NotFound { .. } | Self::Service { .. } | Self::ParseResponse(_) => {
                ErrorCategory::Service
            }
            Self::Storage(_) => ErrorCategory::Storage,
            Self::Config(_) | Self::Io(_) | Self::Json(_) => ErrorCategory::Internal,
        }
    }

    /// Whether retrying the same operation could plausibly succeed.
    ///
    /// `SessionExpired` is explicitly non-retryable: callers must treat it
    /// as "session ended", not as a transient failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Network(_))
    }

    /// Field-level validation messages, if the service returned any.
    #[must_use]
    pub const fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Service { field_errors, .. } => Some(field_errors),
            _ => None,
        }
    }
}

/// Result type alias for ledgerlink operations.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_route_as_expected() {
        assert_eq!(
            ApiError::SessionExpired.category(),
            ErrorCategory::Authentication
        );
        assert_eq!(
            ApiError::Network("boom".into()).category(),
            ErrorCategory::Network
        );
        assert_eq!(
            ApiError::Service {
                status: 400,
                message: "bad".into(),
                field_errors: FieldErrors::new(),
            }
            .category(),
            ErrorCategory::Service
        );
        assert_eq!(
            ApiError::Storage("quota".into()).category(),
            ErrorCategory::Storage
        );
    }

    #[test]
    fn session_expired_is_not_retryable() {
        assert!(!ApiError::SessionExpired.is_retryable());
        assert!(ApiError::Timeout.is_retryable());
    }

    #[test]
    fn timeout_message_names_no_fixed_duration() {
        assert_eq!(ApiError::Timeout.to_string(), "request timed out");
    }

    #[test]
    fn field_errors_only_on_service_variant() {
        let mut fields = FieldErrors::new();
        fields.insert("amount".into(), vec!["must be positive".into()]);
        let err = ApiError::Service {
            status: 400,
            message: "validation failed".into(),
            field_errors: fields,
        };
        assert_eq!(
            err.field_errors().unwrap()["amount"],
            vec!["must be positive".to_string()]
        );
        assert!(ApiError::SessionExpired.field_errors().is_none());
    }
}
