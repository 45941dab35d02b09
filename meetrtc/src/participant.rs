//! Local participant choices and status

use meetrtc_core::MediaRoom;
use serde::{Deserialize, Serialize};

/// What the user picked on the pre-join screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalUserChoices {
    /// Display name
    pub username: String,
    /// Publish the camera after connecting
    pub video_enabled: bool,
    /// Publish the microphone after connecting
    pub audio_enabled: bool,
    /// Preferred camera device id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_device_id: Option<String>,
    /// Preferred microphone device id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_device_id: Option<String>,
}

impl Default for LocalUserChoices {
    fn default() -> Self {
        Self {
            username: String::new(),
            video_enabled: true,
            audio_enabled: true,
            video_device_id: None,
            audio_device_id: None,
        }
    }
}

impl LocalUserChoices {
    /// Choices for `username` with both devices on
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            ..Self::default()
        }
    }

    /// Same choices with the camera turned off
    pub fn without_video(mut self) -> Self {
        self.video_enabled = false;
        self
    }

    /// Same choices with the microphone turned off
    pub fn without_audio(mut self) -> Self {
        self.audio_enabled = false;
        self
    }
}

/// Snapshot of what the local participant is publishing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalParticipantStatus {
    /// Camera is publishing
    pub camera_enabled: bool,
    /// Microphone is publishing
    pub microphone_enabled: bool,
    /// Frames are encrypted
    pub e2ee_enabled: bool,
}

impl LocalParticipantStatus {
    /// Read the status from the SDK room
    pub fn read(room: &dyn MediaRoom) -> Self {
        Self {
            camera_enabled: room.is_camera_enabled(),
            microphone_enabled: room.is_microphone_enabled(),
            e2ee_enabled: room.is_e2ee_enabled(),
        }
    }
}
