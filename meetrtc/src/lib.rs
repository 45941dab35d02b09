//! # meetrtc - meeting room client
//!
//! meetrtc drives one participant through a video meeting on top of an
//! external real-time media SDK: the pre-join permission prompt, the join
//! request, optional end-to-end encryption, connecting, starting devices,
//! switching the published camera quality, and tearing everything down when
//! the meeting view goes away.
//!
//! ## Key Features
//!
//! - **Ordered join**: permission, join request, encryption and connect run as
//!   an explicit state machine with one transition in flight
//! - **Quality switching**: `auto`, `720p`, `480p` and `360p` map to capture
//!   constraints and encoder caps; unsupported platforms degrade gracefully
//! - **Exactly-once teardown**: unmounting or dropping a view disconnects once
//! - **SDK agnostic**: the media SDK sits behind traits in `meetrtc-core`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use meetrtc::{MeetRtc, QualityKey};
//! use meetrtc::loopback::{LoopbackPermissions, LoopbackRoom, LoopbackScript, OrderingTrace};
//! use meetrtc::{MediaRoom, PermissionStatus};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), meetrtc::MeetRtcError> {
//!     let meet = MeetRtc::init()?;
//!     let trace = OrderingTrace::new();
//!
//!     let (view, _report) = meet
//!         .room("demo")
//!         .participant("alice")
//!         .enable_video()
//!         .enable_audio()
//!         .permissions(Arc::new(LoopbackPermissions::new(PermissionStatus::Granted, trace.clone())))
//!         .join(|options| {
//!             Arc::new(LoopbackRoom::with_trace(options, LoopbackScript::default(), trace))
//!                 as Arc<dyn MediaRoom>
//!         })
//!         .await?;
//!
//!     view.select_quality(QualityKey::P480).await?;
//!     view.unmount().await?;
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export core types for easy access
pub use meetrtc_core::{
    loopback, preset_for, CaptureConstraints, ConnectOptions, ConnectionState, DisconnectReason,
    ErrorCategory, KeyProvider, LocalVideoTrack, MediaPermissions, MediaRoom, MeetRtcError,
    MeetRtcResult, PermissionStatus, QualityKey, QualityPreset, RoomEvent, RoomOptions,
    TrackSource, VideoCodec, VideoPreset, VideoResolution,
};

pub use meetrtc_signaling::{
    ConnectionDetails, ConnectionDetailsSource, FixedConnectionDetails, JoinClient, JoinRequest,
    SignalingError,
};

#[cfg(feature = "diagnostics")]
pub use meetrtc_diagnostics::{BitrateMonitor, BitrateSample, LogConfig, PublicationMonitor};

// Public API modules
pub mod applier;
pub mod conference;
pub mod config;
pub mod event;
pub mod lifecycle;
pub mod participant;
pub mod quality_state;
pub mod room;
pub mod sequencer;
pub mod track;

// Re-export main API types
pub use applier::{ApplyOutcome, QualityApplier, StepStatus};
pub use conference::ConferenceView;
pub use config::{decode_passphrase, E2eeSetup, GlobalConfig, RoomConfig};
pub use event::{Event, EventStream, UserNotice};
pub use lifecycle::{RoomLifecycleGuard, TeardownHandle, ViewScope};
pub use participant::{LocalParticipantStatus, LocalUserChoices};
pub use quality_state::{QualityState, QualityWatcher};
pub use room::{RoomBuilder, RoomSession};
pub use sequencer::{ConnectionSequencer, JoinReport, SequencerDeps, SequencerState};
pub use track::LocalVideoTrackHandle;

use std::sync::Arc;
use tracing::debug;

/// Main entry point for meetrtc
#[derive(Debug, Clone)]
pub struct MeetRtc {
    inner: Arc<MeetRtcInner>,
}

#[derive(Debug)]
struct MeetRtcInner {
    config: GlobalConfig,
    details_source: Arc<dyn ConnectionDetailsSource>,
}

impl MeetRtc {
    /// Initialize from the environment
    ///
    /// # Example
    /// ```rust,no_run
    /// use meetrtc::MeetRtc;
    ///
    /// let meet = MeetRtc::init()?;
    /// # Ok::<(), meetrtc::MeetRtcError>(())
    /// ```
    pub fn init() -> MeetRtcResult<Self> {
        Self::init_with(GlobalConfig::from_env())
    }

    /// Initialize with custom global configuration, joining through the
    /// HTTP connection details endpoint
    pub fn init_with(config: GlobalConfig) -> MeetRtcResult<Self> {
        let client = JoinClient::new(&config.conn_details_endpoint, &config.origin)?;
        Ok(Self::with_details_source(config, Arc::new(client)))
    }

    /// Initialize with a custom connection details source
    pub fn with_details_source(
        config: GlobalConfig,
        details_source: Arc<dyn ConnectionDetailsSource>,
    ) -> Self {
        #[cfg(feature = "diagnostics")]
        {
            if config.debug_logging {
                let log_config = LogConfig::with_directive(&config.log_directive);
                if let Err(e) = meetrtc_diagnostics::init_logging(&log_config) {
                    debug!("Logging already initialized: {}", e);
                }
            }
        }
        debug!("meetrtc initialized (endpoint {})", config.conn_details_endpoint);

        Self {
            inner: Arc::new(MeetRtcInner {
                config,
                details_source,
            }),
        }
    }

    /// Global configuration
    pub fn config(&self) -> &GlobalConfig {
        &self.inner.config
    }

    pub(crate) fn details_source(&self) -> Arc<dyn ConnectionDetailsSource> {
        Arc::clone(&self.inner.details_source)
    }

    /// Create a room builder for the given room name
    ///
    /// # Example
    /// ```rust,no_run
    /// use meetrtc::MeetRtc;
    ///
    /// # fn example() -> Result<(), meetrtc::MeetRtcError> {
    /// let meet = MeetRtc::init()?;
    /// let builder = meet.room("standup").participant("alice").enable_video();
    /// # Ok(())
    /// # }
    /// ```
    pub fn room(&self, name: &str) -> RoomBuilder {
        RoomBuilder::new(self, name)
    }
}
