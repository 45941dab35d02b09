//! Room session and builder

use crate::conference::ConferenceView;
use crate::config::{E2eeSetup, RoomConfig};
use crate::participant::{LocalParticipantStatus, LocalUserChoices};
use crate::sequencer::JoinReport;
use crate::track::LocalVideoTrackHandle;
use crate::MeetRtc;
use meetrtc_core::{
    ConnectionState, LocalVideoTrack, MediaPermissions, MediaRoom, MeetRtcError, MeetRtcResult,
    RoomOptions, VideoCodec,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Shared handle to one SDK room
///
/// Only the join sequence and the lifecycle guard connect or disconnect the
/// room; everything else reads through this handle.
#[derive(Debug, Clone)]
pub struct RoomSession {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    id: Uuid,
    room_name: String,
    room: Arc<dyn MediaRoom>,
    disconnect_issued: AtomicBool,
}

impl RoomSession {
    /// Wrap an SDK room
    pub fn new(room_name: &str, room: Arc<dyn MediaRoom>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id: Uuid::new_v4(),
                room_name: room_name.to_string(),
                room,
                disconnect_issued: AtomicBool::new(false),
            }),
        }
    }

    /// Local session id, used in logs
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Room name
    pub fn room_name(&self) -> &str {
        &self.inner.room_name
    }

    /// Underlying SDK room
    pub fn media(&self) -> &Arc<dyn MediaRoom> {
        &self.inner.room
    }

    /// SDK connection state
    pub fn connection_state(&self) -> ConnectionState {
        self.inner.room.connection_state()
    }

    /// Publishing status of the local participant
    pub fn local_status(&self) -> LocalParticipantStatus {
        LocalParticipantStatus::read(self.inner.room.as_ref())
    }

    /// Lookup handle for the camera track
    pub fn camera_handle(&self) -> LocalVideoTrackHandle {
        LocalVideoTrackHandle::camera(Arc::clone(&self.inner.room))
    }

    /// Camera track, if one is published right now
    pub fn camera_track(&self) -> Option<Arc<dyn LocalVideoTrack>> {
        self.camera_handle().resolve()
    }

    /// Disconnect once; true if this call issued the disconnect
    pub async fn disconnect(&self) -> MeetRtcResult<bool> {
        if self.inner.disconnect_issued.swap(true, Ordering::AcqRel) {
            debug!("Session {} already disconnecting", self.inner.id);
            return Ok(false);
        }
        if self.connection_state() == ConnectionState::Disconnected {
            debug!("Session {} already disconnected", self.inner.id);
            return Ok(false);
        }
        info!("👋 Disconnecting from room {}", self.inner.room_name);
        self.inner.room.disconnect().await?;
        Ok(true)
    }
}

/// Fluent builder for a conference view
#[derive(Debug)]
pub struct RoomBuilder {
    meet: MeetRtc,
    room_name: String,
    participant: Option<String>,
    config: RoomConfig,
    e2ee: Option<E2eeSetup>,
    permissions: Option<Arc<dyn MediaPermissions>>,
}

impl RoomBuilder {
    pub(crate) fn new(meet: &MeetRtc, room_name: &str) -> Self {
        Self {
            meet: meet.clone(),
            room_name: room_name.to_string(),
            participant: None,
            config: RoomConfig::default(),
            e2ee: None,
            permissions: None,
        }
    }

    /// Set participant name (required for `join`)
    pub fn participant(mut self, name: &str) -> Self {
        self.participant = Some(name.to_string());
        self
    }

    /// Publish the camera after joining
    pub fn enable_video(mut self) -> Self {
        self.config.video_enabled = true;
        self
    }

    /// Publish the microphone after joining
    pub fn enable_audio(mut self) -> Self {
        self.config.audio_enabled = true;
        self
    }

    /// Preferred video codec
    pub fn video_codec(mut self, codec: VideoCodec) -> Self {
        self.config.video_codec = codec;
        self
    }

    /// Preferred server region
    pub fn region(mut self, region: &str) -> Self {
        self.config.region = Some(region.to_string());
        self
    }

    /// Replace the whole room config
    pub fn config(mut self, config: RoomConfig) -> Self {
        self.config = config;
        self
    }

    /// Join with end-to-end encryption
    pub fn e2ee(mut self, setup: E2eeSetup) -> Self {
        self.e2ee = Some(setup);
        self
    }

    /// Permission prompt used before connecting (required)
    pub fn permissions(mut self, permissions: Arc<dyn MediaPermissions>) -> Self {
        self.permissions = Some(permissions);
        self
    }

    /// SDK room options this builder will create the room with
    pub fn room_options(&self) -> RoomOptions {
        self.config.room_options(self.e2ee.is_some())
    }

    /// Create the SDK room and mount a view over it without joining
    pub fn mount<F>(self, create_room: F) -> MeetRtcResult<ConferenceView>
    where
        F: FnOnce(RoomOptions) -> Arc<dyn MediaRoom>,
    {
        let permissions = self
            .permissions
            .ok_or_else(|| MeetRtcError::MissingConfiguration {
                field: "permissions".to_string(),
            })?;
        let options = self.config.room_options(self.e2ee.is_some());
        let session = RoomSession::new(&self.room_name, create_room(options));
        debug!(
            "Mounting view for room {} (session {})",
            self.room_name,
            session.id()
        );
        Ok(ConferenceView::mount(
            session,
            self.config.region,
            permissions,
            self.meet.details_source(),
            self.e2ee,
        ))
    }

    /// Mount and join with the builder's participant and device settings
    pub async fn join<F>(self, create_room: F) -> MeetRtcResult<(ConferenceView, JoinReport)>
    where
        F: FnOnce(RoomOptions) -> Arc<dyn MediaRoom>,
    {
        let participant = self
            .participant
            .clone()
            .ok_or_else(|| MeetRtcError::MissingConfiguration {
                field: "participant".to_string(),
            })?;
        let choices = LocalUserChoices {
            username: participant,
            video_enabled: self.config.video_enabled,
            audio_enabled: self.config.audio_enabled,
            video_device_id: None,
            audio_device_id: None,
        };
        let mut view = self.mount(create_room)?;
        let report = view.join(choices).await?;
        Ok((view, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meetrtc_core::loopback::{LoopbackRoom, LoopbackScript};
    use meetrtc_core::ConnectOptions;

    fn loopback() -> Arc<LoopbackRoom> {
        let options = RoomConfig::default().room_options(false);
        Arc::new(LoopbackRoom::new(options, LoopbackScript::default()))
    }

    #[tokio::test]
    async fn test_disconnect_once() {
        let room = loopback();
        room.connect("wss://loopback", "token", ConnectOptions::default())
            .await
            .unwrap();
        let session = RoomSession::new("demo", room.clone());

        assert!(session.disconnect().await.unwrap());
        assert!(!session.disconnect().await.unwrap());
        assert_eq!(room.trace().count("disconnect"), 1);
    }

    #[tokio::test]
    async fn test_disconnect_when_never_connected() {
        let room = loopback();
        let session = RoomSession::new("demo", room.clone());
        assert!(!session.disconnect().await.unwrap());
        assert_eq!(room.trace().count("disconnect"), 0);
    }

    #[test]
    fn test_mount_requires_permissions() {
        let meet = MeetRtc::with_details_source(
            crate::GlobalConfig::default(),
            Arc::new(meetrtc_signaling::FixedConnectionDetails::new(
                meetrtc_signaling::ConnectionDetails::new("wss://loopback", "token"),
            )),
        );
        let err = meet
            .room("demo")
            .mount(|_| loopback() as Arc<dyn MediaRoom>)
            .unwrap_err();
        assert_eq!(err.error_code(), "MISSING_CONFIGURATION");
    }
}
