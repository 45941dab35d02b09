//! Seams to the external real-time media SDK
//!
//! An SDK binding implements [`MediaRoom`], [`LocalVideoTrack`], [`RtpSender`],
//! [`KeyProvider`] and [`MediaPermissions`]. Everything in meetrtc drives the
//! room through these traits only.

use crate::error::MeetRtcResult;
use crate::quality::{QualityPreset, VideoPreset, VideoResolution};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Room connection state as reported by the SDK
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Not connected
    Disconnected,
    /// Connect in progress
    Connecting,
    /// Connected to the room
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

/// Track kind enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// Audio track
    Audio,
    /// Video track
    Video,
}

/// Role of a published track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackSource {
    /// Camera/webcam video
    Camera,
    /// Microphone audio
    Microphone,
    /// Screen sharing video
    ScreenShare,
}

impl TrackSource {
    /// Media kind carried by this source
    pub fn kind(&self) -> TrackKind {
        match self {
            TrackSource::Camera | TrackSource::ScreenShare => TrackKind::Video,
            TrackSource::Microphone => TrackKind::Audio,
        }
    }
}

impl fmt::Display for TrackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackSource::Camera => write!(f, "camera"),
            TrackSource::Microphone => write!(f, "microphone"),
            TrackSource::ScreenShare => write!(f, "screen_share"),
        }
    }
}

/// Constraints handed to a capture restart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureConstraints {
    /// Capture resolution and frame rate
    pub resolution: VideoResolution,
}

impl CaptureConstraints {
    /// Constraints for an explicit resolution
    pub fn new(resolution: VideoResolution) -> Self {
        Self { resolution }
    }

    /// Constraints for a preset, `None` when the preset is adaptive
    pub fn from_preset(preset: &QualityPreset) -> Option<Self> {
        preset.resolution.map(Self::new)
    }
}

/// One encoding entry of the outbound sender
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodingParameters {
    /// RID of the simulcast layer, if any
    pub rid: Option<String>,
    /// Bitrate ceiling in bps
    pub max_bitrate: Option<u32>,
    /// Frame rate ceiling
    pub max_framerate: Option<u32>,
    /// Whether the encoding is active
    pub active: bool,
}

/// Sender parameter object read and written back as a whole
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderParameters {
    /// Opaque transaction id issued by the platform
    pub transaction_id: String,
    /// Encoding entries, primary first
    pub encodings: Vec<EncodingParameters>,
}

/// Outbound sender statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderStats {
    /// Encoder target bitrate in bps
    pub target_bitrate: Option<u64>,
    /// Frames encoded so far
    pub frames_encoded: u64,
}

/// Outbound RTP sender of a local track
#[async_trait]
pub trait RtpSender: Send + Sync + fmt::Debug {
    /// Read the current sender parameters
    fn parameters(&self) -> MeetRtcResult<SenderParameters>;

    /// Write sender parameters back
    async fn set_parameters(&self, parameters: SenderParameters) -> MeetRtcResult<()>;

    /// Fetch sender statistics
    async fn stats(&self) -> MeetRtcResult<SenderStats>;
}

/// Live local video track
#[async_trait]
pub trait LocalVideoTrack: Send + Sync + fmt::Debug {
    /// Track SID
    fn sid(&self) -> String;

    /// Re-acquire the capture device under new constraints, `None` for the
    /// SDK's adaptive default
    async fn restart_track(&self, constraints: Option<CaptureConstraints>) -> MeetRtcResult<()>;

    /// Outbound sender, absent until the track is negotiated
    fn sender(&self) -> Option<Arc<dyn RtpSender>>;
}

/// Track payload of a publication, tagged by media kind
#[derive(Debug, Clone)]
pub enum LocalTrackRef {
    /// Video track handle
    Video(Arc<dyn LocalVideoTrack>),
    /// Audio track (no mutable surface needed here)
    Audio,
}

/// A local track published into the room
#[derive(Debug, Clone)]
pub struct PublishedTrack {
    /// Publication SID
    pub sid: String,
    /// Role of the track
    pub source: TrackSource,
    /// Track payload
    pub track: LocalTrackRef,
}

impl PublishedTrack {
    /// Video handle, if this is a video publication
    pub fn video(&self) -> Option<Arc<dyn LocalVideoTrack>> {
        match &self.track {
            LocalTrackRef::Video(track) => Some(Arc::clone(track)),
            LocalTrackRef::Audio => None,
        }
    }
}

/// Why the room went away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    /// Local `disconnect` call
    ClientInitiated,
    /// Server closed the session
    ServerInitiated,
    /// Signaling connection lost
    ConnectionLost,
}

/// Signals emitted by the SDK room
#[derive(Debug, Clone)]
pub enum RoomEvent {
    /// Connection state changed
    ConnectionStateChanged {
        /// New state
        state: ConnectionState,
    },
    /// Room disconnected
    Disconnected {
        /// Reason for the disconnect
        reason: DisconnectReason,
    },
    /// A local track was published
    LocalTrackPublished {
        /// The publication
        publication: PublishedTrack,
    },
    /// A local track was unpublished
    LocalTrackUnpublished {
        /// Publication SID
        sid: String,
    },
    /// A media device error occurred
    MediaDevicesError {
        /// Error text
        message: String,
    },
    /// An encryption error occurred
    EncryptionError {
        /// Error text
        message: String,
    },
}

/// Options passed to `connect`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectOptions {
    /// Subscribe to remote tracks automatically
    pub auto_subscribe: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            auto_subscribe: true,
        }
    }
}

/// Video codec for published tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    /// VP8
    Vp8,
    /// H.264
    H264,
    /// VP9
    #[default]
    Vp9,
    /// AV1
    Av1,
}

impl VideoCodec {
    /// Whether the SDK can encrypt frames of this codec
    pub fn supports_e2ee(&self) -> bool {
        matches!(self, VideoCodec::Vp8 | VideoCodec::H264)
    }
}

/// Defaults applied to every track the room publishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishDefaults {
    /// Codec, `None` for the SDK default
    pub video_codec: Option<VideoCodec>,
    /// Redundant audio encoding
    pub red: bool,
    /// Lower simulcast layers
    pub simulcast_layers: Vec<VideoPreset>,
}

/// Options the SDK room is created with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomOptions {
    /// Publish defaults
    pub publish_defaults: PublishDefaults,
    /// Subscriber-side adaptive resolution
    pub adaptive_stream: bool,
    /// Pause unused simulcast layers
    pub dynacast: bool,
    /// Whether the room is created with an E2EE key provider
    pub e2ee: bool,
    /// Multiplex publish and subscribe over one peer connection
    pub single_peer_connection: bool,
}

/// SDK room handle
#[async_trait]
pub trait MediaRoom: Send + Sync + fmt::Debug {
    /// Current connection state
    fn connection_state(&self) -> ConnectionState;

    /// Connect to the room server
    async fn connect(&self, server_url: &str, token: &str, options: ConnectOptions)
        -> MeetRtcResult<()>;

    /// Disconnect from the room
    async fn disconnect(&self) -> MeetRtcResult<()>;

    /// Turn frame encryption on or off
    async fn set_e2ee_enabled(&self, enabled: bool) -> MeetRtcResult<()>;

    /// Whether frame encryption is on
    fn is_e2ee_enabled(&self) -> bool;

    /// Enable or disable the local camera
    async fn set_camera_enabled(&self, enabled: bool) -> MeetRtcResult<()>;

    /// Enable or disable the local microphone
    async fn set_microphone_enabled(&self, enabled: bool) -> MeetRtcResult<()>;

    /// Whether the local camera is publishing
    fn is_camera_enabled(&self) -> bool;

    /// Whether the local microphone is publishing
    fn is_microphone_enabled(&self) -> bool;

    /// Local publications
    fn published_tracks(&self) -> Vec<PublishedTrack>;

    /// Subscribe to room signals
    fn events(&self) -> broadcast::Receiver<RoomEvent>;
}

/// E2EE key provider shared with the SDK room
#[async_trait]
pub trait KeyProvider: Send + Sync + fmt::Debug {
    /// Install the shared key material
    async fn set_key(&self, key: &str) -> MeetRtcResult<()>;
}

/// Outcome of a camera+microphone permission prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    /// User granted access
    Granted,
    /// User denied access
    Denied,
}

/// Platform camera+microphone permission prompt
#[async_trait]
pub trait MediaPermissions: Send + Sync + fmt::Debug {
    /// Prompt for camera and microphone access
    async fn request_camera_and_microphone(&self) -> PermissionStatus;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::{preset_for, QualityKey};

    #[test]
    fn test_track_source_kind() {
        assert_eq!(TrackSource::Camera.kind(), TrackKind::Video);
        assert_eq!(TrackSource::ScreenShare.kind(), TrackKind::Video);
        assert_eq!(TrackSource::Microphone.kind(), TrackKind::Audio);
    }

    #[test]
    fn test_constraints_from_preset() {
        assert!(CaptureConstraints::from_preset(&preset_for(QualityKey::Auto)).is_none());
        let constraints = CaptureConstraints::from_preset(&preset_for(QualityKey::P360)).unwrap();
        assert_eq!(constraints.resolution.width, 640);
        assert_eq!(constraints.resolution.height, 360);
    }

    #[test]
    fn test_codec_e2ee_support() {
        assert!(VideoCodec::Vp8.supports_e2ee());
        assert!(!VideoCodec::Vp9.supports_e2ee());
        assert!(!VideoCodec::Av1.supports_e2ee());
    }
}
