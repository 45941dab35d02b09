//! Applies a quality selection to the published camera track
//!
//! A selection runs in two independent steps: the capture restart under new
//! constraints, then the encoder caps on the primary encoding. A step the
//! platform refuses as unsupported is logged and recorded; any other failure
//! is returned to the caller once both steps have run.

use crate::room::RoomSession;
use meetrtc_core::{
    preset_for, CaptureConstraints, EncodingParameters, LocalVideoTrack, MeetRtcError,
    MeetRtcResult, QualityKey, QualityPreset, VideoResolution, AUTO_CAPTURE_BASELINE,
};
use tracing::{debug, info, warn};

/// Result of one apply step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// Step took effect
    Applied,
    /// Step did not apply to this selection
    Skipped,
    /// Platform refused the operation as unsupported
    Unsupported(MeetRtcError),
}

impl StepStatus {
    /// Whether the step took effect
    pub fn is_applied(&self) -> bool {
        matches!(self, StepStatus::Applied)
    }
}

/// What applying a selection did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// No camera track is published; nothing happened
    NoCameraTrack,
    /// Both steps were attempted
    Applied {
        /// Capture restart
        capture: StepStatus,
        /// Encoder caps
        encoder: StepStatus,
    },
}

/// Drives capture restarts and encoder caps for quality selections
#[derive(Debug, Clone)]
pub struct QualityApplier {
    auto_baseline: VideoResolution,
}

impl Default for QualityApplier {
    fn default() -> Self {
        Self {
            auto_baseline: AUTO_CAPTURE_BASELINE,
        }
    }
}

impl QualityApplier {
    /// Applier with a custom baseline for `auto`
    pub fn with_auto_baseline(auto_baseline: VideoResolution) -> Self {
        Self { auto_baseline }
    }

    /// Apply `key` to the session's camera track
    pub async fn apply(&self, session: &RoomSession, key: QualityKey) -> MeetRtcResult<ApplyOutcome> {
        let Some(track) = session.camera_track() else {
            debug!("No camera track for quality {}", key);
            return Ok(ApplyOutcome::NoCameraTrack);
        };

        let preset = preset_for(key);
        let constraints = CaptureConstraints::from_preset(&preset)
            .unwrap_or_else(|| CaptureConstraints::new(self.auto_baseline));

        let capture = classify(
            "restart_track",
            track
                .restart_track(Some(constraints))
                .await
                .map(|()| StepStatus::Applied),
        );
        if capture.as_ref().is_ok_and(|status| status.is_applied()) {
            debug!("Restarted {} at {}", track.sid(), constraints.resolution);
        }

        // the encoder cap runs even when the restart failed
        let encoder = if key.is_auto() {
            Ok(StepStatus::Skipped)
        } else {
            classify("set_parameters", self.cap_encoder(track.as_ref(), &preset).await)
        };

        let (capture, encoder) = match (capture, encoder) {
            (Ok(capture), Ok(encoder)) => (capture, encoder),
            (Err(e), encoder) => {
                warn!("Quality {} capture step failed (encoder step: {:?})", key, encoder);
                return Err(e);
            }
            (Ok(capture), Err(e)) => {
                warn!("Quality {} encoder step failed (capture step: {:?})", key, capture);
                return Err(e);
            }
        };

        info!("🎚️ Applied quality {} to {}", key.label(), track.sid());
        Ok(ApplyOutcome::Applied { capture, encoder })
    }

    async fn cap_encoder(
        &self,
        track: &dyn LocalVideoTrack,
        preset: &QualityPreset,
    ) -> MeetRtcResult<StepStatus> {
        let Some(sender) = track.sender() else {
            debug!("Track {} has no sender yet", track.sid());
            return Ok(StepStatus::Skipped);
        };

        let mut parameters = sender.parameters()?;
        if parameters.encodings.is_empty() {
            parameters.encodings.push(EncodingParameters {
                active: true,
                ..EncodingParameters::default()
            });
        }
        let primary = &mut parameters.encodings[0];
        primary.max_bitrate = preset.max_bitrate;
        primary.max_framerate = preset.frame_rate();

        sender.set_parameters(parameters).await?;
        Ok(StepStatus::Applied)
    }
}

fn classify(operation: &str, result: MeetRtcResult<StepStatus>) -> MeetRtcResult<StepStatus> {
    match result {
        Ok(status) => Ok(status),
        Err(e @ MeetRtcError::TrackMutationUnsupported { .. }) => {
            warn!("{} not supported: {}", operation, e);
            Ok(StepStatus::Unsupported(e))
        }
        Err(MeetRtcError::Sdk { reason }) => Err(MeetRtcError::TrackMutation {
            operation: operation.to_string(),
            reason,
        }),
        Err(e) => Err(e),
    }
}
