//! Join request errors

use meetrtc_core::MeetRtcError;
use thiserror::Error;

/// Errors raised while resolving connection details
#[derive(Error, Debug)]
pub enum SignalingError {
    /// The configured endpoint or origin is not a valid URL
    #[error("Invalid join endpoint {endpoint}: {source}")]
    InvalidEndpoint {
        /// Endpoint as configured
        endpoint: String,
        /// Parse error
        source: url::ParseError,
    },

    /// The HTTP request could not be completed
    #[error("Join request failed: {source}")]
    Http {
        /// Transport error
        #[from]
        source: reqwest::Error,
    },

    /// The endpoint answered with a non-success status
    #[error("Join endpoint returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// The response body was not valid connection details
    #[error("Invalid connection details: {source}")]
    Decode {
        /// JSON error
        #[from]
        source: serde_json::Error,
    },
}

impl From<SignalingError> for MeetRtcError {
    fn from(err: SignalingError) -> Self {
        MeetRtcError::JoinRequest {
            reason: err.to_string(),
        }
    }
}
