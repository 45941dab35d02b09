//! Error types for meetrtc

use crate::media::TrackSource;
use thiserror::Error;

/// Result alias used across the meetrtc crates
pub type MeetRtcResult<T> = Result<T, MeetRtcError>;

/// Main error type for meetrtc operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeetRtcError {
    /// The user declined camera/microphone access
    #[error("Media permission denied: {message}")]
    PermissionDenied {
        /// User-facing message
        message: String,
    },

    /// The platform cannot run the configured end-to-end encryption
    #[error("End-to-end encryption is not supported: {reason}")]
    EncryptionUnsupported {
        /// Reason reported by the SDK
        reason: String,
    },

    /// Encryption setup failed for a reason other than platform support
    #[error("Encryption setup failed: {reason}")]
    Encryption {
        /// Reason for the failure
        reason: String,
    },

    /// Room connect failed
    #[error("Connection to {server_url} failed: {reason}")]
    ConnectFailure {
        /// Server the connect was issued against
        server_url: String,
        /// Reason for the failure
        reason: String,
    },

    /// A local device could not be enabled after connect
    #[error("Failed to enable {device}: {reason}")]
    DeviceEnableFailure {
        /// Device that failed
        device: TrackSource,
        /// Reason for the failure
        reason: String,
    },

    /// The platform rejected a capture restart or encoder parameter change
    #[error("Track mutation not supported ({operation}): {reason}")]
    TrackMutationUnsupported {
        /// Operation that was rejected
        operation: String,
        /// Reason reported by the platform
        reason: String,
    },

    /// A track mutation failed in a way the platform did not classify
    #[error("Track mutation failed ({operation}): {reason}")]
    TrackMutation {
        /// Operation that failed
        operation: String,
        /// Reason for the failure
        reason: String,
    },

    /// The configured E2EE passphrase could not be decoded
    #[error("Invalid encryption passphrase: {reason}")]
    InvalidPassphrase {
        /// Reason the passphrase was rejected
        reason: String,
    },

    /// Missing configuration error
    #[error("Missing required configuration: {field}")]
    MissingConfiguration {
        /// Missing configuration field
        field: String,
    },

    /// Invalid state error
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState {
        /// Expected state
        expected: String,
        /// Actual state
        actual: String,
    },

    /// The join request for connection details failed
    #[error("Join request failed: {reason}")]
    JoinRequest {
        /// Reason for the failure
        reason: String,
    },

    /// The owning conference view was torn down while an operation was in flight
    #[error("Conference view closed")]
    ViewClosed,

    /// Unclassified SDK error
    #[error("SDK error: {reason}")]
    Sdk {
        /// Reason reported by the SDK
        reason: String,
    },
}

impl MeetRtcError {
    /// Shorthand for a platform rejection of a track mutation
    pub fn track_unsupported(operation: &str, reason: impl Into<String>) -> Self {
        MeetRtcError::TrackMutationUnsupported {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }

    /// Get error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            MeetRtcError::PermissionDenied { .. } => "PERMISSION_DENIED",
            MeetRtcError::EncryptionUnsupported { .. } => "ENCRYPTION_UNSUPPORTED",
            MeetRtcError::Encryption { .. } => "ENCRYPTION_FAILED",
            MeetRtcError::ConnectFailure { .. } => "CONNECT_FAILED",
            MeetRtcError::DeviceEnableFailure { .. } => "DEVICE_ENABLE_FAILED",
            MeetRtcError::TrackMutationUnsupported { .. } => "TRACK_MUTATION_UNSUPPORTED",
            MeetRtcError::TrackMutation { .. } => "TRACK_MUTATION_FAILED",
            MeetRtcError::InvalidPassphrase { .. } => "INVALID_PASSPHRASE",
            MeetRtcError::MissingConfiguration { .. } => "MISSING_CONFIGURATION",
            MeetRtcError::InvalidState { .. } => "INVALID_STATE",
            MeetRtcError::JoinRequest { .. } => "JOIN_REQUEST_FAILED",
            MeetRtcError::ViewClosed => "VIEW_CLOSED",
            MeetRtcError::Sdk { .. } => "SDK_ERROR",
        }
    }

    /// Whether the failure is recovered locally without tearing down the view
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MeetRtcError::PermissionDenied { .. }
                | MeetRtcError::ConnectFailure { .. }
                | MeetRtcError::DeviceEnableFailure { .. }
                | MeetRtcError::TrackMutationUnsupported { .. }
                | MeetRtcError::JoinRequest { .. }
        )
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            MeetRtcError::PermissionDenied { .. } => ErrorCategory::Permission,
            MeetRtcError::EncryptionUnsupported { .. }
            | MeetRtcError::Encryption { .. }
            | MeetRtcError::InvalidPassphrase { .. } => ErrorCategory::Encryption,
            MeetRtcError::ConnectFailure { .. } | MeetRtcError::JoinRequest { .. } => {
                ErrorCategory::Connection
            }
            MeetRtcError::DeviceEnableFailure { .. } => ErrorCategory::Device,
            MeetRtcError::TrackMutationUnsupported { .. } | MeetRtcError::TrackMutation { .. } => {
                ErrorCategory::Track
            }
            MeetRtcError::MissingConfiguration { .. } => ErrorCategory::Configuration,
            MeetRtcError::InvalidState { .. } | MeetRtcError::ViewClosed => ErrorCategory::State,
            MeetRtcError::Sdk { .. } => ErrorCategory::Sdk,
        }
    }
}

/// Error categories for grouping related errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Camera/microphone permission
    Permission,
    /// End-to-end encryption setup
    Encryption,
    /// Join request and room connect
    Connection,
    /// Local device enablement
    Device,
    /// Capture restart and encoder parameters
    Track,
    /// Configuration problems
    Configuration,
    /// Lifecycle state violations
    State,
    /// Anything the SDK did not classify
    Sdk,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Permission => write!(f, "permission"),
            ErrorCategory::Encryption => write!(f, "encryption"),
            ErrorCategory::Connection => write!(f, "connection"),
            ErrorCategory::Device => write!(f, "device"),
            ErrorCategory::Track => write!(f, "track"),
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::State => write!(f, "state"),
            ErrorCategory::Sdk => write!(f, "sdk"),
        }
    }
}
