//! Error types for Management API operations.
//!
//! Every remote call either returns a decoded result or one of four failure
//! kinds. Errors carry a category so callers can give consistent feedback
//! without matching on every variant.

use std::fmt;

/// Result type alias for Management API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of remote failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The remote confirmed the resource does not exist.
    NotFound,
    /// The remote refused the request (validation, authorization, conflict).
    Rejected,
    /// A success response whose body could not be interpreted.
    Format,
    /// The request could not be completed at the connection level.
    Network,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "Resource not found",
            Self::Rejected => "Request rejected by the management API",
            Self::Format => "Unexpected response format",
            Self::Network => "Network connectivity issue",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::NotFound => "Check the API, plan and subscription identifiers",
            Self::Rejected => "Check credentials, permissions and the request payload",
            Self::Format => "Check that the management URL points at a Management API v2",
            Self::Network => "Check the management URL and your network connection",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors returned by the Management API client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The remote reported the resource as absent.
    #[error("{resource} {id} not found")]
    NotFound {
        /// Resource kind ("plan", "subscription", "api").
        resource: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// Any non-success status not otherwise classified.
    #[error("management API returned status {status}: {message}")]
    RemoteRejected {
        /// Raw HTTP status.
        status: u16,
        /// Response body, kept for diagnostics.
        message: String,
    },

    /// Success status with a body that does not match the expected shape.
    #[error("invalid API response: {0}")]
    Decode(String),

    /// The call never completed.
    #[error("transport error: {0}")]
    Transport(String),
}

impl Error {
    /// Create a not-found error.
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    /// Create a rejection error from a status and response body.
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::RemoteRejected {
            status,
            message: message.into(),
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::RemoteRejected { .. } => ErrorCategory::Rejected,
            Error::Decode(_) => ErrorCategory::Format,
            Error::Transport(_) => ErrorCategory::Network,
        }
    }

    /// Whether the remote confirmed the resource is absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// HTTP status attached to the failure, if the remote answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::NotFound { .. } => Some(404),
            Error::RemoteRejected { status, .. } => Some(*status),
            Error::Decode(_) | Error::Transport(_) => None,
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::RemoteRejected {
                status: code,
                message: format!("HTTP {}", code),
            },
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
