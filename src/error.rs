//! Error types for belayer-e2e
//!
//! Every failure ends the run. The variants carry enough context (the step
//! that failed, what was expected and what came back) to diagnose a
//! non-conformant server without re-running the sequence.

use crate::types::Step;
use thiserror::Error;

/// Result type alias for belayer-e2e operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for belayer-e2e
#[derive(Debug, Error)]
pub enum Error {
    /// Credentials rejected or the auth response carried no access token
    #[error("authentication failed: {message}")]
    Authentication {
        /// Human-readable reason, including the server's `errorMessage` when present
        message: String,
    },

    /// Response could not be split into headers and a JSON body
    #[error("malformed response for step {step}: {reason}")]
    MalformedResponse {
        /// The step whose response was malformed
        step: Step,
        /// What was wrong with the response
        reason: String,
    },

    /// Response was well-formed but violated the step's contract
    #[error("verification failed for step {step}: expected {expected}, got {actual}")]
    Verification {
        /// The step whose contract was violated
        step: Step,
        /// Description of the expected value (with JSON path when applicable)
        expected: String,
        /// Description of the value actually received
        actual: String,
    },

    /// Transport (process invocation, connection) failed
    #[error("transport error: {0}")]
    Transport(String),

    /// Network error from the HTTP client
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "base_url")
        key: Option<String>,
    },

    /// Session invariant violated (e.g. transaction id assigned twice)
    #[error("invalid session state: {0}")]
    InvalidState(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Build a verification failure for `step`
    pub fn verification(
        step: Step,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::Verification {
            step,
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Build a malformed-response failure for `step`
    pub fn malformed(step: Step, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            step,
            reason: reason.into(),
        }
    }

    /// The lifecycle step this error is attributed to, if any
    pub fn step(&self) -> Option<Step> {
        match self {
            Error::MalformedResponse { step, .. } | Error::Verification { step, .. } => {
                Some(*step)
            }
            _ => None,
        }
    }

    /// Machine-readable error code, used as a structured log field
    pub fn code(&self) -> &'static str {
        match self {
            Error::Authentication { .. } => "authentication_error",
            Error::MalformedResponse { .. } => "malformed_response",
            Error::Verification { .. } => "verification_failure",
            Error::Transport(_) | Error::Network(_) => "transport_error",
            Error::Config { .. } => "config_error",
            Error::InvalidState(_) => "invalid_state",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
        }
    }
}
