//! Join sequence state machine
//!
//! ```text
//! Idle -> PermissionPending -> [EncryptionPending] -> Connecting -> Connected
//!   ^            |                     |                  |            |
//!   +------------+---------------------+------------------+            v
//!                 (denied / join or encryption unsupported / failed)  Disconnected
//! ```
//!
//! Every stage takes `&mut self`, so only one transition is ever in flight.
//! Each stage re-checks the view scope after its await points and drops its
//! result if the view has been torn down in the meantime.

use crate::config::E2eeSetup;
use crate::event::{Event, UserNotice};
use crate::lifecycle::ViewScope;
use crate::participant::LocalUserChoices;
use crate::room::RoomSession;
use meetrtc_core::{
    ConnectOptions, DisconnectReason, MediaPermissions, MeetRtcError, MeetRtcResult,
    PermissionStatus, RoomEvent, TrackSource,
};
use meetrtc_signaling::{ConnectionDetails, ConnectionDetailsSource, JoinRequest};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// State of the join sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequencerState {
    /// Pre-join form shown, nothing in flight
    Idle,
    /// Waiting on the permission prompt or the join request
    PermissionPending,
    /// Installing the key and turning on frame encryption
    EncryptionPending,
    /// Connecting to the media server
    Connecting,
    /// In the room
    Connected,
    /// Session over
    Disconnected,
}

impl SequencerState {
    /// Whether `self -> next` is a legal transition
    pub fn can_transition_to(self, next: SequencerState) -> bool {
        use SequencerState::*;
        matches!(
            (self, next),
            (Idle, PermissionPending)
                | (PermissionPending, Idle | EncryptionPending | Connecting)
                | (EncryptionPending, Idle | Connecting)
                | (Connecting, Idle | Connected)
                | (
                    Idle | PermissionPending | EncryptionPending | Connecting | Connected,
                    Disconnected
                )
        )
    }

    /// Whether the session has ended
    pub fn is_terminal(self) -> bool {
        self == SequencerState::Disconnected
    }
}

impl fmt::Display for SequencerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SequencerState::Idle => "idle",
            SequencerState::PermissionPending => "permission_pending",
            SequencerState::EncryptionPending => "encryption_pending",
            SequencerState::Connecting => "connecting",
            SequencerState::Connected => "connected",
            SequencerState::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}

/// Result of a successful join
#[derive(Debug, Clone)]
pub struct JoinReport {
    /// Details the room was joined with
    pub details: ConnectionDetails,
    /// Camera is publishing
    pub camera_enabled: bool,
    /// Microphone is publishing
    pub microphone_enabled: bool,
    /// Devices that failed to start
    pub device_errors: Vec<MeetRtcError>,
}

impl JoinReport {
    /// Whether every requested device started
    pub fn all_devices_started(&self) -> bool {
        self.device_errors.is_empty()
    }
}

/// Collaborators the sequencer drives
#[derive(Debug, Clone)]
pub struct SequencerDeps {
    /// Permission prompt
    pub permissions: Arc<dyn MediaPermissions>,
    /// Join request backend
    pub details_source: Arc<dyn ConnectionDetailsSource>,
    /// Encryption setup, when the meeting is end-to-end encrypted
    pub e2ee: Option<E2eeSetup>,
    /// Preferred server region
    pub region: Option<String>,
}

/// Orders permission, join request, encryption, connect and device start
#[derive(Debug)]
pub struct ConnectionSequencer {
    state: SequencerState,
    session: RoomSession,
    deps: SequencerDeps,
    scope: ViewScope,
    events: mpsc::UnboundedSender<Event>,
    notice: Option<UserNotice>,
    pending: Option<(LocalUserChoices, ConnectionDetails)>,
}

impl ConnectionSequencer {
    /// Sequencer for `session`, emitting view events on `events`
    pub fn new(
        session: RoomSession,
        deps: SequencerDeps,
        scope: ViewScope,
        events: mpsc::UnboundedSender<Event>,
    ) -> Self {
        Self {
            state: SequencerState::Idle,
            session,
            deps,
            scope,
            events,
            notice: None,
            pending: None,
        }
    }

    /// Current state
    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// Notice currently shown to the user
    pub fn notice(&self) -> Option<&UserNotice> {
        self.notice.as_ref()
    }

    /// Run the whole sequence: `submit` then `establish`
    pub async fn join(&mut self, choices: LocalUserChoices) -> MeetRtcResult<JoinReport> {
        self.submit(choices).await?;
        self.establish().await
    }

    /// Ask for device permission and resolve connection details
    pub async fn submit(&mut self, choices: LocalUserChoices) -> MeetRtcResult<ConnectionDetails> {
        if choices.username.trim().is_empty() {
            return Err(MeetRtcError::MissingConfiguration {
                field: "username".to_string(),
            });
        }
        self.transition(SequencerState::PermissionPending)?;
        self.notice = None;

        let status = self.deps.permissions.request_camera_and_microphone().await;
        self.ensure_open()?;
        if status == PermissionStatus::Denied {
            warn!("Camera/microphone permission denied");
            self.transition(SequencerState::Idle)?;
            self.show_notice(UserNotice::PermissionRequired);
            return Err(MeetRtcError::PermissionDenied {
                message: UserNotice::PermissionRequired.message().to_string(),
            });
        }

        let mut request = JoinRequest::new(self.session.room_name(), choices.username.as_str());
        if let Some(region) = &self.deps.region {
            request = request.with_region(region.as_str());
        }
        let fetched = self.deps.details_source.fetch(&request).await;
        self.ensure_open()?;
        match fetched {
            Ok(details) => {
                debug!("Join request for {} resolved", request.room_name);
                self.pending = Some((choices, details.clone()));
                Ok(details)
            }
            Err(e) => {
                warn!("Join request failed: {}", e);
                self.transition(SequencerState::Idle)?;
                Err(e.into())
            }
        }
    }

    /// Encrypt (if configured), connect, then start devices
    pub async fn establish(&mut self) -> MeetRtcResult<JoinReport> {
        let Some((choices, details)) = self.pending.take() else {
            return Err(MeetRtcError::InvalidState {
                expected: "submitted join request".to_string(),
                actual: self.state.to_string(),
            });
        };
        if self.state != SequencerState::PermissionPending {
            return Err(MeetRtcError::InvalidState {
                expected: SequencerState::PermissionPending.to_string(),
                actual: self.state.to_string(),
            });
        }

        if let Some(e2ee) = self.deps.e2ee.clone() {
            self.transition(SequencerState::EncryptionPending)?;
            let result = self.enable_encryption(&e2ee).await;
            self.ensure_open()?;
            match result {
                Ok(()) => {}
                Err(e @ MeetRtcError::EncryptionUnsupported { .. }) => {
                    warn!("Encryption unsupported: {}", e);
                    self.transition(SequencerState::Idle)?;
                    self.show_notice(UserNotice::EncryptionUnsupported);
                    return Err(e);
                }
                Err(e) => {
                    error!("Failed to enable encryption: {}", e);
                    self.transition(SequencerState::Idle)?;
                    return Err(e);
                }
            }
        }

        self.transition(SequencerState::Connecting)?;
        let connected = self
            .session
            .media()
            .connect(
                &details.server_url,
                &details.participant_token,
                ConnectOptions {
                    auto_subscribe: true,
                },
            )
            .await;
        if !self.scope.is_open() {
            if connected.is_ok() {
                // the teardown's disconnect ran before this connect finished
                debug!("View closed during connect; dropping the late connection");
                if let Err(e) = self.session.media().disconnect().await {
                    warn!("Failed to drop late connection: {}", e);
                }
            }
            return Err(MeetRtcError::ViewClosed);
        }
        if let Err(e) = connected {
            let e = match e {
                MeetRtcError::Sdk { reason } => MeetRtcError::ConnectFailure {
                    server_url: details.server_url.clone(),
                    reason,
                },
                other => other,
            };
            error!("Failed to connect to {}: {}", details.server_url, e);
            self.transition(SequencerState::Idle)?;
            return Err(e);
        }
        self.transition(SequencerState::Connected)?;
        info!(
            "✅ Joined room {} as {}",
            self.session.room_name(),
            choices.username
        );

        self.enable_devices(&choices, details).await
    }

    /// React to a room signal
    pub fn handle_room_event(&mut self, event: &RoomEvent) {
        if !self.scope.is_open() {
            return;
        }
        match event {
            RoomEvent::Disconnected { reason } => {
                if self.state.is_terminal() {
                    return;
                }
                info!("Room disconnected ({:?})", reason);
                if self.transition(SequencerState::Disconnected).is_ok()
                    && *reason != DisconnectReason::ClientInitiated
                {
                    self.show_notice(UserNotice::ReturnHome);
                }
            }
            RoomEvent::MediaDevicesError { message } => error!("Media device error: {}", message),
            RoomEvent::EncryptionError { message } => error!("Encryption error: {}", message),
            _ => {}
        }
    }

    /// Leave the room; repeated calls are no-ops
    pub async fn disconnect(&mut self) -> MeetRtcResult<bool> {
        let issued = self.session.disconnect().await?;
        if self.scope.is_open() && !self.state.is_terminal() {
            self.transition(SequencerState::Disconnected)?;
        }
        Ok(issued)
    }

    async fn enable_encryption(&self, e2ee: &E2eeSetup) -> MeetRtcResult<()> {
        e2ee.key_provider().set_key(e2ee.passphrase()).await?;
        self.session.media().set_e2ee_enabled(true).await?;
        debug!("E2EE enabled for room {}", self.session.room_name());
        Ok(())
    }

    async fn enable_devices(
        &self,
        choices: &LocalUserChoices,
        details: ConnectionDetails,
    ) -> MeetRtcResult<JoinReport> {
        let media = self.session.media();
        let camera = async {
            if choices.video_enabled {
                Some(media.set_camera_enabled(true).await)
            } else {
                None
            }
        };
        let microphone = async {
            if choices.audio_enabled {
                Some(media.set_microphone_enabled(true).await)
            } else {
                None
            }
        };
        let (camera, microphone) = tokio::join!(camera, microphone);
        self.ensure_open()?;

        let mut device_errors = Vec::new();
        for (device, result) in [
            (TrackSource::Camera, camera),
            (TrackSource::Microphone, microphone),
        ] {
            if let Some(Err(e)) = result {
                warn!("Failed to enable {}: {}", device, e);
                let failure = MeetRtcError::DeviceEnableFailure {
                    device,
                    reason: e.to_string(),
                };
                self.emit(Event::DeviceFailed {
                    error: failure.clone(),
                });
                device_errors.push(failure);
            }
        }

        let status = self.session.local_status();
        Ok(JoinReport {
            details,
            camera_enabled: status.camera_enabled,
            microphone_enabled: status.microphone_enabled,
            device_errors,
        })
    }

    fn transition(&mut self, next: SequencerState) -> MeetRtcResult<()> {
        self.ensure_open()?;
        if !self.state.can_transition_to(next) {
            return Err(MeetRtcError::InvalidState {
                expected: format!("a state that can move to {}", next),
                actual: self.state.to_string(),
            });
        }
        let from = std::mem::replace(&mut self.state, next);
        debug!("Sequencer {} -> {}", from, next);
        self.emit(Event::StateChanged { from, to: next });
        Ok(())
    }

    fn ensure_open(&self) -> MeetRtcResult<()> {
        if self.scope.is_open() {
            Ok(())
        } else {
            Err(MeetRtcError::ViewClosed)
        }
    }

    fn show_notice(&mut self, notice: UserNotice) {
        self.notice = Some(notice.clone());
        self.emit(Event::Notice { notice });
    }

    fn emit(&self, event: Event) {
        // the view may have dropped its stream
        let _ = self.events.send(event);
    }
}
