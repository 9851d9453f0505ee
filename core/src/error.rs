//! Error types for the Nutripatrol client.
//!
//! # Design
//! Every failure a call can hit is folded into one `ApiError` at the
//! dispatcher boundary. Its variants keep enough structure for Rust callers
//! to match on, while `to_normalized` renders the single wire shape
//! `{"error": {"statusCode", "message", "details"}}` that consumers of the
//! service's other clients already expect.
//!
//! The underlying cause of an `Unexpected` error is kept as the error
//! source for logs only; it never reaches the normalized shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::transport::TransportError;

/// Errors returned by every `NutripatrolClient` operation.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The service rejected the request with HTTP 422. `details` holds the
    /// `msg` of each entry in the response's `detail` array, in order.
    #[error("Validation error")]
    Validation { details: Vec<String> },

    /// The service answered with any other non-2xx status.
    #[error("Error while requesting Nutripatrol API")]
    Upstream { status: u16, body: Value },

    /// A 2xx response with no usable payload.
    #[error("Malformed API response")]
    MalformedResponse,

    /// Anything that went wrong around the call itself.
    #[error("An unexpected error occurred")]
    Unexpected(#[source] Cause),
}

/// Why a call ended up as `ApiError::Unexpected`.
#[derive(Debug, Error)]
pub enum Cause {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("request body could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("response body is not JSON: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("422 response has no `detail` array of messages")]
    ValidationBody,
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Validation { .. } => 422,
            ApiError::Upstream { status, .. } => *status,
            ApiError::MalformedResponse | ApiError::Unexpected(_) => 500,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn details(&self) -> Option<Value> {
        match self {
            ApiError::Validation { details } => Some(Value::from(details.clone())),
            ApiError::Upstream { body, .. } => Some(body.clone()),
            ApiError::MalformedResponse | ApiError::Unexpected(_) => None,
        }
    }

    pub fn to_normalized(&self) -> NormalizedError {
        NormalizedError {
            error: ErrorBody {
                status_code: self.status_code(),
                message: self.message(),
                details: self.details(),
            },
        }
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        ApiError::Unexpected(Cause::Transport(err))
    }
}

/// Wire shape of a failed call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedError {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl From<&ApiError> for NormalizedError {
    fn from(err: &ApiError) -> Self {
        err.to_normalized()
    }
}
