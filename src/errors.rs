//! Unified error types for the dashboard crate.
//!
//! The formatting core never fails; these errors only come out of
//! configuration loading and the backend API layer.

use thiserror::Error;

/// Every failure the crate can report to a caller.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description of the problem
        message: String,
    },

    /// Input rejected before it was sent to the backend
    #[error("Validation error: {message}")]
    Validation {
        /// Which field failed and why
        message: String,
    },

    /// No API token configured for the session
    #[error("No authentication token configured")]
    MissingToken,

    /// Backend answered 401
    #[error("Session expired, please sign in again")]
    Unauthorized,

    /// Backend answered 403
    #[error("Not allowed to access {resource}")]
    Forbidden {
        /// Resource that was requested
        resource: String,
    },

    /// Backend answered 404
    #[error("{resource} not found")]
    NotFound {
        /// Resource that was requested
        resource: String,
    },

    /// Any other non-success status
    #[error("Backend error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Message extracted from the response body
        message: String,
    },

    /// Backend refused to switch into a department context
    #[error("Could not enter department context {department_id}")]
    DepartmentContext {
        /// Department that was requested
        department_id: String,
    },

    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not match the expected shape
    #[error("Invalid payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable could not be read
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

impl Error {
    /// True when the backend rejected the session itself and the caller
    /// should discard the stored credentials.
    #[must_use]
    pub const fn requires_sign_in(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::Forbidden { .. })
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_sign_in() {
        assert!(Error::Unauthorized.requires_sign_in());
        assert!(
            Error::Forbidden {
                resource: "accounts".to_string()
            }
            .requires_sign_in()
        );
        assert!(
            !Error::NotFound {
                resource: "accounts".to_string()
            }
            .requires_sign_in()
        );
        assert!(!Error::MissingToken.requires_sign_in());
    }

    #[test]
    fn test_error_messages() {
        let err = Error::Api {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Backend error (500): boom");

        let err = Error::NotFound {
            resource: "Account 1.1".to_string(),
        };
        assert_eq!(err.to_string(), "Account 1.1 not found");
    }
}
