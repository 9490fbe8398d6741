//! Error types for the Aster SDK.
//!
//! Signing failures and transport failures share one enum so callers can
//! propagate everything with `?`, while [`AsterError::is_retryable`] keeps the
//! two apart: a request that failed to sign must never be retried blindly.

use std::time::Duration;
use thiserror::Error;

/// Main error type for the Aster SDK.
#[derive(Error, Debug)]
pub enum AsterError {
    /// A value could not be encoded (canonical text, address, ABI tuple)
    #[error("Encoding error: {message}")]
    Encoding {
        message: String,
        field: Option<String>,
    },

    /// Private key or signature computation failure
    #[error("Signing error: {message}")]
    Signing {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An internal invariant did not hold (library bug)
    #[error("Invariant violation: {message}")]
    InvariantViolation { message: String },

    /// The system clock could not be read
    #[error("Clock error: {message}")]
    Clock { message: String },

    /// Configuration errors
    #[error("Config error: {message}")]
    Config { message: String },

    /// Network-related errors (typically retryable)
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// API errors returned by the exchange
    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        error_code: Option<i64>,
    },

    /// Timeout errors
    #[error("Timeout: operation timed out after {duration:?}")]
    Timeout {
        duration: Duration,
        operation: String,
    },

    /// Parsing/serialization errors
    #[error("Parse error: {message}")]
    Parse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl AsterError {
    /// Check if this error is retryable.
    ///
    /// Only transport failures qualify. Re-signing produces a new nonce and
    /// timestamp, so it is a different request rather than a retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Api { status, .. } => *status >= 500 && *status < 600,
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Get suggested retry delay.
    #[must_use]
    pub fn retry_delay(&self) -> Option<Duration> {
        match self {
            Self::Network { .. } => Some(Duration::from_millis(100)),
            Self::Api { status, .. } if *status >= 500 => Some(Duration::from_millis(500)),
            Self::Timeout { .. } => Some(Duration::from_millis(50)),
            _ => None,
        }
    }

    /// Check if this is a critical error that should stop trading.
    #[must_use]
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Self::Signing { .. } | Self::InvariantViolation { .. } | Self::Config { .. }
        )
    }

    /// Get error category for metrics.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Encoding { .. } => "encoding",
            Self::Signing { .. } => "signing",
            Self::InvariantViolation { .. } => "invariant",
            Self::Clock { .. } => "clock",
            Self::Config { .. } => "config",
            Self::Network { .. } => "network",
            Self::Api { .. } => "api",
            Self::Timeout { .. } => "timeout",
            Self::Parse { .. } => "parse",
        }
    }
}

// Convenience constructors
impl AsterError {
    /// Create an encoding error.
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
            field: None,
        }
    }

    /// Create an encoding error tied to a named field.
    pub fn encoding_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a signing error without source.
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
            source: None,
        }
    }

    /// Create a signing error with source.
    pub fn signing_with_source<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::Signing {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invariant violation.
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Create a clock error.
    pub fn clock(message: impl Into<String>) -> Self {
        Self::Clock {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a network error with source.
    pub fn network<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::Network {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
            error_code: None,
        }
    }

    /// Create a timeout error.
    pub fn timeout(duration: Duration, operation: impl Into<String>) -> Self {
        Self::Timeout {
            duration,
            operation: operation.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            source: None,
        }
    }

    /// Create a parse error with source.
    pub fn parse_with_source<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::Parse {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

#[cfg(feature = "client")]
impl From<reqwest::Error> for AsterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                duration: Duration::from_secs(15),
                operation: "HTTP request".to_string(),
            }
        } else if err.is_connect() || err.is_request() {
            Self::network("HTTP request failed", err)
        } else {
            Self::network("Unexpected reqwest error", err)
        }
    }
}

impl From<serde_json::Error> for AsterError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse_with_source(format!("JSON parsing failed: {err}"), err)
    }
}

#[cfg(feature = "client")]
impl From<url::ParseError> for AsterError {
    fn from(err: url::ParseError) -> Self {
        Self::config(format!("Invalid URL: {err}"))
    }
}

// Manual Clone implementation since Box<dyn Error> doesn't implement Clone
impl Clone for AsterError {
    fn clone(&self) -> Self {
        match self {
            Self::Encoding { message, field } => Self::Encoding {
                message: message.clone(),
                field: field.clone(),
            },
            Self::Signing { message, .. } => Self::Signing {
                message: message.clone(),
                source: None,
            },
            Self::InvariantViolation { message } => Self::InvariantViolation {
                message: message.clone(),
            },
            Self::Clock { message } => Self::Clock {
                message: message.clone(),
            },
            Self::Config { message } => Self::Config {
                message: message.clone(),
            },
            Self::Network { message, .. } => Self::Network {
                message: message.clone(),
                source: None,
            },
            Self::Api {
                status,
                message,
                error_code,
            } => Self::Api {
                status: *status,
                message: message.clone(),
                error_code: *error_code,
            },
            Self::Timeout {
                duration,
                operation,
            } => Self::Timeout {
                duration: *duration,
                operation: operation.clone(),
            },
            Self::Parse { message, .. } => Self::Parse {
                message: message.clone(),
                source: None,
            },
        }
    }
}

/// Result type alias for convenience.
pub type Result<T> = std::result::Result<T, AsterError>;

/// Alias for backward compatibility.
pub type Error = AsterError;
