//! Local video quality keys and their capture/encode presets

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Capture resolution and frame rate target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResolution {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frames per second
    pub frame_rate: u32,
}

impl VideoResolution {
    /// Create a resolution triple
    pub const fn new(width: u32, height: u32, frame_rate: u32) -> Self {
        Self {
            width,
            height,
            frame_rate,
        }
    }

    /// Whether every dimension is strictly positive
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && self.frame_rate > 0
    }
}

impl fmt::Display for VideoResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}@{}", self.width, self.height, self.frame_rate)
    }
}

/// Standard encoding presets shared with the SDK's simulcast layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoPreset {
    /// Capture target
    pub resolution: VideoResolution,
    /// Encoder bitrate ceiling in bps
    pub max_bitrate: u32,
}

impl VideoPreset {
    /// 1280x720 @ 30
    pub const H720: VideoPreset = VideoPreset {
        resolution: VideoResolution::new(1280, 720, 30),
        max_bitrate: 1_700_000,
    };
    /// 960x540 @ 25
    pub const H540: VideoPreset = VideoPreset {
        resolution: VideoResolution::new(960, 540, 25),
        max_bitrate: 800_000,
    };
    /// 854x480 @ 30
    pub const H480: VideoPreset = VideoPreset {
        resolution: VideoResolution::new(854, 480, 30),
        max_bitrate: 900_000,
    };
    /// 640x360 @ 20
    pub const H360: VideoPreset = VideoPreset {
        resolution: VideoResolution::new(640, 360, 20),
        max_bitrate: 450_000,
    };
    /// 384x216 @ 20
    pub const H216: VideoPreset = VideoPreset {
        resolution: VideoResolution::new(384, 216, 20),
        max_bitrate: 180_000,
    };
}

/// Capture baseline used when the user picks `auto`
pub const AUTO_CAPTURE_BASELINE: VideoResolution = VideoPreset::H720.resolution;

/// User-selectable local video quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QualityKey {
    /// Let adaptive logic decide
    #[default]
    #[serde(rename = "auto")]
    Auto,
    /// 1280x720
    #[serde(rename = "720p")]
    P720,
    /// 854x480
    #[serde(rename = "480p")]
    P480,
    /// 640x360
    #[serde(rename = "360p")]
    P360,
}

impl QualityKey {
    /// Every key in menu order
    pub const ALL: [QualityKey; 4] = [
        QualityKey::Auto,
        QualityKey::P720,
        QualityKey::P480,
        QualityKey::P360,
    ];

    /// Wire/string form
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityKey::Auto => "auto",
            QualityKey::P720 => "720p",
            QualityKey::P480 => "480p",
            QualityKey::P360 => "360p",
        }
    }

    /// Upper-case label for menus
    pub fn label(&self) -> String {
        self.as_str().to_uppercase()
    }

    /// Whether this key delegates to adaptive heuristics
    pub fn is_auto(&self) -> bool {
        matches!(self, QualityKey::Auto)
    }

    /// Preset for this key
    pub fn preset(&self) -> QualityPreset {
        preset_for(*self)
    }
}

impl fmt::Display for QualityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown quality key
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown quality key: {0}")]
pub struct UnknownQualityKey(pub String);

impl FromStr for QualityKey {
    type Err = UnknownQualityKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QualityKey::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownQualityKey(s.to_string()))
    }
}

/// Target capture/encode constraints for one quality key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityPreset {
    /// Capture target, absent for `auto`
    pub resolution: Option<VideoResolution>,
    /// Encoder bitrate ceiling in bps, absent for `auto`
    pub max_bitrate: Option<u32>,
}

impl QualityPreset {
    const fn fixed(preset: VideoPreset) -> Self {
        Self {
            resolution: Some(preset.resolution),
            max_bitrate: Some(preset.max_bitrate),
        }
    }

    /// Frame rate of the capture target
    pub fn frame_rate(&self) -> Option<u32> {
        self.resolution.map(|r| r.frame_rate)
    }

    /// Whether the preset leaves everything to adaptive logic
    pub fn is_adaptive(&self) -> bool {
        self.resolution.is_none() && self.max_bitrate.is_none()
    }
}

/// Look up the preset for a quality key
pub fn preset_for(key: QualityKey) -> QualityPreset {
    match key {
        QualityKey::Auto => QualityPreset::default(),
        QualityKey::P720 => QualityPreset::fixed(VideoPreset::H720),
        QualityKey::P480 => QualityPreset::fixed(VideoPreset::H480),
        QualityKey::P360 => QualityPreset::fixed(VideoPreset::H360),
    }
}
