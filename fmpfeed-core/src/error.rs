//! Structured error types for fetch, decode and mapping.
//!
//! Only [`FetchError::Validation`] is recoverable: the pipeline either aborts on
//! it (fail-fast) or routes it to a sink and keeps going. Everything else means
//! progress on the current call is impossible.

use chrono::NaiveDate;
use thiserror::Error;

use crate::validate::ValidationFailure;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport failure on {endpoint}: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("unexpected HTTP status {status} from {endpoint}")]
    UnexpectedStatus { endpoint: String, status: u16 },

    #[error("malformed response from {endpoint}: {reason}")]
    MalformedResponse { endpoint: String, reason: String },

    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error("invalid date range: to date {to} is before from date {from}")]
    InvalidRange { from: NaiveDate, to: NaiveDate },

    #[error("{endpoint} did not signal its last part within {limit} parts")]
    PartLimitExceeded { endpoint: String, limit: u32 },

    #[error("fetch task was cancelled before completing")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),
}

impl FetchError {
    pub(crate) fn transport(endpoint: &str, reason: impl Into<String>) -> Self {
        FetchError::Transport {
            endpoint: endpoint.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(endpoint: &str, reason: impl Into<String>) -> Self {
        FetchError::MalformedResponse {
            endpoint: endpoint.to_string(),
            reason: reason.into(),
        }
    }

    /// True for failures of the transport itself, including unexpected statuses.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            FetchError::Transport { .. } | FetchError::UnexpectedStatus { .. }
        )
    }

    /// Whether the pipeline may skip past this error under collect-and-continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FetchError::Validation(_))
    }

    /// The validation failure carried by this error, if any.
    pub fn as_validation(&self) -> Option<&ValidationFailure> {
        match self {
            FetchError::Validation(failure) => Some(failure),
            _ => None,
        }
    }
}
