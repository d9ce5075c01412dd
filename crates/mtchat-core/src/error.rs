//! Error types for the mtchat client and BFF.

use serde::Serialize;
use thiserror::Error;

/// A shared error type for every mtchat crate.
///
/// Variants follow the failure taxonomy of the remote entity API: session
/// expiry, validation caught before any network call, upstream HTTP and
/// transport failures, plus local configuration and state-machine errors.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum MtchatError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// The remote API answered 401; the local session has been cleared.
    #[error("Session expired")]
    SessionExpired,

    /// Non-2xx response from the remote API (other than 401)
    #[error("HTTP {status} {status_text}: {message}")]
    Http {
        status: u16,
        status_text: String,
        message: String,
    },

    /// Transport failure (DNS, connect, timeout, body read)
    #[error("Network error: {0}")]
    Network(String),

    /// Input rejected before any request was issued
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rejected auth state transition
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MtchatError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates an Http error
    pub fn http(status: u16, status_text: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            status_text: status_text.into(),
            message: message.into(),
        }
    }

    /// Creates a Network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a session expiry
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a transport-level failure
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Returns the HTTP status carried by this error, if any.
    ///
    /// `SessionExpired` reports 401 and `NotFound` reports 404 so that the
    /// BFF can forward a faithful status without inspecting variants itself.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::SessionExpired => Some(401),
            Self::NotFound { .. } => Some(404),
            Self::Validation(_) => Some(400),
            _ => None,
        }
    }

    /// Check if this error means "the thing does not exist upstream".
    ///
    /// Returns true for `NotFound` and for `Http` errors with status 404.
    pub fn is_not_found_or_missing(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Http { status, .. } => *status == 404,
            _ => false,
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<serde_json::Error> for MtchatError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for MtchatError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for MtchatError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for MtchatError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(format!("{} (kind: {:?})", err, err.kind()))
    }
}

impl From<url::ParseError> for MtchatError {
    fn from(err: url::ParseError) -> Self {
        Self::Config(format!("invalid URL: {err}"))
    }
}

/// A type alias for `Result<T, MtchatError>`.
pub type Result<T> = std::result::Result<T, MtchatError>;
