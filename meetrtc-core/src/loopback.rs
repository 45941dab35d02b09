//! In-memory loopback implementation of the media SDK seams
//!
//! Nothing leaves the process: connect flips state, enabling the camera
//! publishes a fake video track, and every call is appended to a shared
//! [`OrderingTrace`]. Failures and delays are scripted through
//! [`LoopbackScript`]. Used by the demos and by the test suites.

use crate::error::{MeetRtcError, MeetRtcResult};
use crate::media::{
    CaptureConstraints, ConnectOptions, ConnectionState, DisconnectReason, EncodingParameters,
    KeyProvider, LocalTrackRef, LocalVideoTrack, MediaPermissions, MediaRoom, PermissionStatus,
    PublishedTrack, RoomEvent, RoomOptions, RtpSender, SenderParameters, SenderStats, TrackSource,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::debug;

/// Shared, append-only log of SDK calls in completion order
#[derive(Debug, Clone, Default)]
pub struct OrderingTrace {
    entries: Arc<Mutex<Vec<String>>>,
}

impl OrderingTrace {
    /// Create an empty trace
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry
    pub fn record(&self, entry: impl Into<String>) {
        let entry = entry.into();
        debug!("loopback: {}", entry);
        self.entries.lock().push(entry);
    }

    /// Snapshot of all entries
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Index of the first entry equal to `entry`
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries.lock().iter().position(|e| e == entry)
    }

    /// Number of entries equal to `entry`
    pub fn count(&self, entry: &str) -> usize {
        self.entries.lock().iter().filter(|e| *e == entry).count()
    }
}

/// Scripted behavior of the loopback SDK
#[derive(Debug, Clone, Default)]
pub struct LoopbackScript {
    /// Delay before `connect` resolves
    pub connect_delay: Duration,
    /// Delay before `set_key` resolves
    pub key_delay: Duration,
    /// Delay before `set_e2ee_enabled` resolves
    pub e2ee_delay: Duration,
    /// `connect` fails with this reason
    pub connect_error: Option<String>,
    /// `set_e2ee_enabled` fails with this error
    pub e2ee_error: Option<MeetRtcError>,
    /// `set_key` fails with this error
    pub key_error: Option<MeetRtcError>,
    /// Enabling the camera fails
    pub camera_error: Option<String>,
    /// Enabling the microphone fails
    pub microphone_error: Option<String>,
    /// `restart_track` fails with this error
    pub restart_error: Option<MeetRtcError>,
    /// `set_parameters` fails with this error
    pub encoder_error: Option<MeetRtcError>,
    /// Published camera tracks have no sender
    pub camera_without_sender: bool,
}

#[derive(Debug)]
struct RoomState {
    connection: ConnectionState,
    e2ee: bool,
    camera: Option<PublishedTrack>,
    camera_track: Option<Arc<LoopbackVideoTrack>>,
    microphone: Option<PublishedTrack>,
}

/// Loopback room
#[derive(Debug)]
pub struct LoopbackRoom {
    options: RoomOptions,
    script: LoopbackScript,
    trace: OrderingTrace,
    state: Mutex<RoomState>,
    events: broadcast::Sender<RoomEvent>,
    next_sid: Mutex<u32>,
}

impl LoopbackRoom {
    /// Create a room with a fresh trace
    pub fn new(options: RoomOptions, script: LoopbackScript) -> Self {
        Self::with_trace(options, script, OrderingTrace::new())
    }

    /// Create a room that appends to an existing trace
    pub fn with_trace(options: RoomOptions, script: LoopbackScript, trace: OrderingTrace) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            options,
            script,
            trace,
            state: Mutex::new(RoomState {
                connection: ConnectionState::Disconnected,
                e2ee: false,
                camera: None,
                camera_track: None,
                microphone: None,
            }),
            events,
            next_sid: Mutex::new(0),
        }
    }

    /// Options the room was created with
    pub fn options(&self) -> &RoomOptions {
        &self.options
    }

    /// Trace this room appends to
    pub fn trace(&self) -> &OrderingTrace {
        &self.trace
    }

    /// Loopback camera track, if published
    pub fn camera_track(&self) -> Option<Arc<LoopbackVideoTrack>> {
        self.state.lock().camera_track.clone()
    }

    /// Drop the session as if the server had closed it
    pub fn simulate_server_disconnect(&self) {
        let was_connected = {
            let mut state = self.state.lock();
            let was = state.connection != ConnectionState::Disconnected;
            state.connection = ConnectionState::Disconnected;
            state.camera = None;
            state.camera_track = None;
            state.microphone = None;
            was
        };
        if was_connected {
            self.trace.record("server_disconnect");
            self.emit(RoomEvent::Disconnected {
                reason: DisconnectReason::ServerInitiated,
            });
        }
    }

    fn emit(&self, event: RoomEvent) {
        // no receivers is fine
        let _ = self.events.send(event);
    }

    fn allocate_sid(&self, prefix: &str) -> String {
        let mut next = self.next_sid.lock();
        *next += 1;
        format!("{}_{}", prefix, *next)
    }

    fn require_connected(&self, operation: &str) -> MeetRtcResult<()> {
        let actual = self.state.lock().connection;
        if actual == ConnectionState::Connected {
            Ok(())
        } else {
            Err(MeetRtcError::InvalidState {
                expected: format!("connected before {}", operation),
                actual: actual.to_string(),
            })
        }
    }
}

#[async_trait]
impl MediaRoom for LoopbackRoom {
    fn connection_state(&self) -> ConnectionState {
        self.state.lock().connection
    }

    async fn connect(
        &self,
        server_url: &str,
        _token: &str,
        _options: ConnectOptions,
    ) -> MeetRtcResult<()> {
        self.state.lock().connection = ConnectionState::Connecting;
        self.emit(RoomEvent::ConnectionStateChanged {
            state: ConnectionState::Connecting,
        });
        self.trace.record("connect:start");
        if !self.script.connect_delay.is_zero() {
            tokio::time::sleep(self.script.connect_delay).await;
        }
        if let Some(reason) = &self.script.connect_error {
            self.state.lock().connection = ConnectionState::Disconnected;
            self.trace.record("connect:failed");
            return Err(MeetRtcError::ConnectFailure {
                server_url: server_url.to_string(),
                reason: reason.clone(),
            });
        }
        self.state.lock().connection = ConnectionState::Connected;
        self.trace.record("connect:done");
        self.emit(RoomEvent::ConnectionStateChanged {
            state: ConnectionState::Connected,
        });
        Ok(())
    }

    async fn disconnect(&self) -> MeetRtcResult<()> {
        {
            let mut state = self.state.lock();
            if state.connection == ConnectionState::Disconnected {
                return Ok(());
            }
            state.connection = ConnectionState::Disconnected;
            state.camera = None;
            state.camera_track = None;
            state.microphone = None;
        }
        self.trace.record("disconnect");
        self.emit(RoomEvent::Disconnected {
            reason: DisconnectReason::ClientInitiated,
        });
        Ok(())
    }

    async fn set_e2ee_enabled(&self, enabled: bool) -> MeetRtcResult<()> {
        if !self.script.e2ee_delay.is_zero() {
            tokio::time::sleep(self.script.e2ee_delay).await;
        }
        if let Some(err) = &self.script.e2ee_error {
            self.trace.record("e2ee:failed");
            return Err(err.clone());
        }
        self.state.lock().e2ee = enabled;
        self.trace.record(format!("e2ee:{}", enabled));
        Ok(())
    }

    fn is_e2ee_enabled(&self) -> bool {
        self.state.lock().e2ee
    }

    async fn set_camera_enabled(&self, enabled: bool) -> MeetRtcResult<()> {
        self.require_connected("camera")?;
        if !enabled {
            let removed = {
                let mut state = self.state.lock();
                state.camera_track = None;
                state.camera.take()
            };
            if let Some(publication) = removed {
                self.trace.record("camera:off");
                self.emit(RoomEvent::LocalTrackUnpublished {
                    sid: publication.sid,
                });
            }
            return Ok(());
        }
        if let Some(reason) = &self.script.camera_error {
            self.trace.record("camera:failed");
            return Err(MeetRtcError::Sdk {
                reason: reason.clone(),
            });
        }
        if self.state.lock().camera.is_some() {
            return Ok(());
        }

        let track = Arc::new(LoopbackVideoTrack::new(
            self.allocate_sid("TR_cam"),
            self.script.clone(),
            self.trace.clone(),
        ));
        let publication = PublishedTrack {
            sid: self.allocate_sid("PUB_cam"),
            source: TrackSource::Camera,
            track: LocalTrackRef::Video(track.clone()),
        };
        {
            let mut state = self.state.lock();
            state.camera = Some(publication.clone());
            state.camera_track = Some(track);
        }
        self.trace.record("camera:on");
        self.emit(RoomEvent::LocalTrackPublished { publication });
        Ok(())
    }

    async fn set_microphone_enabled(&self, enabled: bool) -> MeetRtcResult<()> {
        self.require_connected("microphone")?;
        if !enabled {
            let removed = self.state.lock().microphone.take();
            if let Some(publication) = removed {
                self.trace.record("microphone:off");
                self.emit(RoomEvent::LocalTrackUnpublished {
                    sid: publication.sid,
                });
            }
            return Ok(());
        }
        if let Some(reason) = &self.script.microphone_error {
            self.trace.record("microphone:failed");
            return Err(MeetRtcError::Sdk {
                reason: reason.clone(),
            });
        }
        if self.state.lock().microphone.is_some() {
            return Ok(());
        }

        let publication = PublishedTrack {
            sid: self.allocate_sid("PUB_mic"),
            source: TrackSource::Microphone,
            track: LocalTrackRef::Audio,
        };
        self.state.lock().microphone = Some(publication.clone());
        self.trace.record("microphone:on");
        self.emit(RoomEvent::LocalTrackPublished { publication });
        Ok(())
    }

    fn is_camera_enabled(&self) -> bool {
        self.state.lock().camera.is_some()
    }

    fn is_microphone_enabled(&self) -> bool {
        self.state.lock().microphone.is_some()
    }

    fn published_tracks(&self) -> Vec<PublishedTrack> {
        let state = self.state.lock();
        state
            .camera
            .iter()
            .chain(state.microphone.iter())
            .cloned()
            .collect()
    }

    fn events(&self) -> broadcast::Receiver<RoomEvent> {
        self.events.subscribe()
    }
}

/// Loopback camera track
#[derive(Debug)]
pub struct LoopbackVideoTrack {
    sid: String,
    script: LoopbackScript,
    trace: OrderingTrace,
    restarts: Mutex<Vec<Option<CaptureConstraints>>>,
    sender: Option<Arc<LoopbackSender>>,
}

impl LoopbackVideoTrack {
    fn new(sid: String, script: LoopbackScript, trace: OrderingTrace) -> Self {
        let sender = if script.camera_without_sender {
            None
        } else {
            Some(Arc::new(LoopbackSender::new(
                script.encoder_error.clone(),
                trace.clone(),
            )))
        };
        Self {
            sid,
            script,
            trace,
            restarts: Mutex::new(Vec::new()),
            sender,
        }
    }

    /// Every successful restart, oldest first
    pub fn restarts(&self) -> Vec<Option<CaptureConstraints>> {
        self.restarts.lock().clone()
    }

    /// Loopback sender, if the track has one
    pub fn loopback_sender(&self) -> Option<Arc<LoopbackSender>> {
        self.sender.clone()
    }
}

#[async_trait]
impl LocalVideoTrack for LoopbackVideoTrack {
    fn sid(&self) -> String {
        self.sid.clone()
    }

    async fn restart_track(&self, constraints: Option<CaptureConstraints>) -> MeetRtcResult<()> {
        if let Some(err) = &self.script.restart_error {
            self.trace.record("restart:failed");
            return Err(err.clone());
        }
        match constraints {
            Some(c) => self.trace.record(format!("restart:{}", c.resolution)),
            None => self.trace.record("restart:default"),
        }
        self.restarts.lock().push(constraints);
        Ok(())
    }

    fn sender(&self) -> Option<Arc<dyn RtpSender>> {
        self.sender
            .as_ref()
            .map(|s| Arc::clone(s) as Arc<dyn RtpSender>)
    }
}

/// Loopback RTP sender
#[derive(Debug)]
pub struct LoopbackSender {
    parameters: Mutex<SenderParameters>,
    error: Option<MeetRtcError>,
    trace: OrderingTrace,
}

impl LoopbackSender {
    fn new(error: Option<MeetRtcError>, trace: OrderingTrace) -> Self {
        Self {
            parameters: Mutex::new(SenderParameters {
                transaction_id: "loopback".to_string(),
                encodings: vec![EncodingParameters {
                    rid: Some("f".to_string()),
                    max_bitrate: Some(1_700_000),
                    max_framerate: Some(30),
                    active: true,
                }],
            }),
            error,
            trace,
        }
    }

    /// Parameters as last written
    pub fn current_parameters(&self) -> SenderParameters {
        self.parameters.lock().clone()
    }
}

#[async_trait]
impl RtpSender for LoopbackSender {
    fn parameters(&self) -> MeetRtcResult<SenderParameters> {
        Ok(self.parameters.lock().clone())
    }

    async fn set_parameters(&self, parameters: SenderParameters) -> MeetRtcResult<()> {
        if let Some(err) = &self.error {
            self.trace.record("encoder:failed");
            return Err(err.clone());
        }
        let primary = parameters.encodings.first().cloned().unwrap_or_default();
        self.trace.record(format!(
            "encoder:{}bps@{}",
            primary.max_bitrate.unwrap_or(0),
            primary.max_framerate.unwrap_or(0)
        ));
        *self.parameters.lock() = parameters;
        Ok(())
    }

    async fn stats(&self) -> MeetRtcResult<SenderStats> {
        let parameters = self.parameters.lock();
        let target = parameters
            .encodings
            .first()
            .and_then(|e| e.max_bitrate)
            .map(|b| u64::from(b) * 9 / 10);
        Ok(SenderStats {
            target_bitrate: target,
            frames_encoded: 0,
        })
    }
}

/// Loopback key provider
#[derive(Debug)]
pub struct LoopbackKeyProvider {
    script: LoopbackScript,
    trace: OrderingTrace,
    key: Mutex<Option<String>>,
}

impl LoopbackKeyProvider {
    /// Create a key provider appending to `trace`
    pub fn new(script: LoopbackScript, trace: OrderingTrace) -> Self {
        Self {
            script,
            trace,
            key: Mutex::new(None),
        }
    }

    /// Key installed last
    pub fn installed_key(&self) -> Option<String> {
        self.key.lock().clone()
    }
}

#[async_trait]
impl KeyProvider for LoopbackKeyProvider {
    async fn set_key(&self, key: &str) -> MeetRtcResult<()> {
        self.trace.record("set_key:start");
        if !self.script.key_delay.is_zero() {
            tokio::time::sleep(self.script.key_delay).await;
        }
        if let Some(err) = &self.script.key_error {
            self.trace.record("set_key:failed");
            return Err(err.clone());
        }
        *self.key.lock() = Some(key.to_string());
        self.trace.record("set_key:done");
        Ok(())
    }
}

/// Loopback permission prompt with a fixed answer
#[derive(Debug)]
pub struct LoopbackPermissions {
    status: PermissionStatus,
    trace: OrderingTrace,
}

impl LoopbackPermissions {
    /// Prompt that always answers `status`
    pub fn new(status: PermissionStatus, trace: OrderingTrace) -> Self {
        Self { status, trace }
    }
}

#[async_trait]
impl MediaPermissions for LoopbackPermissions {
    async fn request_camera_and_microphone(&self) -> PermissionStatus {
        let entry = match self.status {
            PermissionStatus::Granted => "permission:granted",
            PermissionStatus::Denied => "permission:denied",
        };
        self.trace.record(entry);
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::PublishDefaults;

    fn options() -> RoomOptions {
        RoomOptions {
            publish_defaults: PublishDefaults {
                video_codec: None,
                red: true,
                simulcast_layers: vec![],
            },
            adaptive_stream: true,
            dynacast: true,
            e2ee: false,
            single_peer_connection: true,
        }
    }

    #[tokio::test]
    async fn test_camera_publishes_video_track() {
        let room = LoopbackRoom::new(options(), LoopbackScript::default());
        room.connect("wss://loopback", "token", ConnectOptions::default())
            .await
            .unwrap();
        room.set_camera_enabled(true).await.unwrap();

        let tracks = room.published_tracks();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].source, TrackSource::Camera);
        assert!(tracks[0].video().is_some());
    }

    #[tokio::test]
    async fn test_devices_require_connection() {
        let room = LoopbackRoom::new(options(), LoopbackScript::default());
        let err = room.set_microphone_enabled(true).await.unwrap_err();
        assert!(matches!(err, MeetRtcError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_disconnect_records_once() {
        let room = LoopbackRoom::new(options(), LoopbackScript::default());
        room.connect("wss://loopback", "token", ConnectOptions::default())
            .await
            .unwrap();
        room.disconnect().await.unwrap();
        room.disconnect().await.unwrap();
        assert_eq!(room.trace().count("disconnect"), 1);
    }
}
