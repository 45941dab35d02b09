//! # meetrtc Core
//!
//! Error taxonomy, local video quality presets, and the trait seams to the
//! external real-time media SDK. An in-memory [`loopback`] SDK implements
//! every seam for demos and tests.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod loopback;
pub mod media;
pub mod quality;

// Re-export main types
pub use error::{ErrorCategory, MeetRtcError, MeetRtcResult};
pub use media::{
    CaptureConstraints, ConnectOptions, ConnectionState, DisconnectReason, EncodingParameters,
    KeyProvider, LocalTrackRef, LocalVideoTrack, MediaPermissions, MediaRoom, PermissionStatus,
    PublishDefaults, PublishedTrack, RoomEvent, RoomOptions, RtpSender, SenderParameters,
    SenderStats, TrackKind, TrackSource, VideoCodec,
};
pub use quality::{
    preset_for, QualityKey, QualityPreset, UnknownQualityKey, VideoPreset, VideoResolution,
    AUTO_CAPTURE_BASELINE,
};
