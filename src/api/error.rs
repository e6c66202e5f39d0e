//! Error types for the Lambda Cloud client.

use thiserror::Error;

use crate::config::ConfigError;

use super::transport::TransportError;
use super::types::ErrorEnvelope;

const CAPACITY_PHRASE: &str = "insufficient capacity";
const CAPACITY_CODE: &str = "insufficient-capacity";

/// Errors raised by [`super::LambdaClient`] operations.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum LambdaApiError {
    /// Raised when the configuration is incomplete.
    #[error("configuration error: {0}")]
    Config(String),
    /// Raised when an operation is given unusable arguments.
    #[error("invalid request: {0}")]
    Validation(String),
    /// Raised when the service could not be reached.
    #[error("transport error: {message}")]
    Transport {
        /// Description of the network failure.
        message: String,
    },
    /// Raised when the service answers with a non-success status.
    #[error("API returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Machine-readable error code, when the body carried one.
        code: Option<String>,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when a success body is not the JSON the client expects.
    #[error("failed to decode response: {message}")]
    Decode {
        /// Parser error message.
        message: String,
    },
    /// Raised when a well-formed response lacks required data.
    #[error("unexpected response: {message}")]
    UnexpectedResponse {
        /// Description of what was missing.
        message: String,
    },
    /// Raised when the caller cancels a long-running wait.
    #[error("{operation} cancelled")]
    Cancelled {
        /// Operation that was aborted.
        operation: String,
    },
    /// Raised when an instance never reports a hostname.
    #[error("instance {instance_id} reported no hostname after {waited_secs} seconds")]
    HostnameTimeout {
        /// Instance that was polled.
        instance_id: String,
        /// Total time spent waiting, including the settle period.
        waited_secs: u64,
    },
}

impl LambdaApiError {
    /// Builds a [`LambdaApiError::Status`] from a failed response, extracting
    /// the `{"error": {...}}` envelope when present and falling back to the
    /// raw body otherwise.
    #[must_use]
    pub fn from_status(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => {
                let error = envelope.error;
                let message = match error.suggestion {
                    Some(suggestion) if !suggestion.trim().is_empty() => {
                        format!("{} ({suggestion})", error.message)
                    }
                    _ => error.message,
                };
                Self::Status {
                    status,
                    code: error.code,
                    message,
                }
            }
            Err(_) => Self::Status {
                status,
                code: None,
                message: body.trim().to_owned(),
            },
        }
    }

    pub(crate) fn cancelled(operation: &str) -> Self {
        Self::Cancelled {
            operation: operation.to_owned(),
        }
    }

    /// Returns `true` for a 400 whose message or code reports insufficient
    /// capacity, the one launch failure worth retrying indefinitely.
    #[must_use]
    pub fn is_capacity_error(&self) -> bool {
        let Self::Status {
            status: 400,
            code,
            message,
        } = self
        else {
            return false;
        };

        message.to_ascii_lowercase().contains(CAPACITY_PHRASE)
            || code
                .as_deref()
                .is_some_and(|value| value.to_ascii_lowercase().contains(CAPACITY_CODE))
    }

    /// Returns `true` when the service reported the resource as unknown.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }

    /// Returns `true` when the failure came from a cancellation request.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

impl From<TransportError> for LambdaApiError {
    fn from(value: TransportError) -> Self {
        Self::Transport {
            message: value.to_string(),
        }
    }
}

impl From<ConfigError> for LambdaApiError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value.to_string())
    }
}

impl From<serde_json::Error> for LambdaApiError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode {
            message: value.to_string(),
        }
    }
}
