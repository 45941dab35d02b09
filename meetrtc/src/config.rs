//! Configuration types and defaults

use meetrtc_core::{
    KeyProvider, MeetRtcError, MeetRtcResult, PublishDefaults, RoomOptions, VideoCodec,
    VideoPreset,
};
use meetrtc_signaling::DEFAULT_CONN_DETAILS_ENDPOINT;
use percent_encoding::percent_decode_str;
use std::sync::Arc;

/// Environment variable overriding the connection details endpoint
pub const CONN_DETAILS_ENDPOINT_ENV: &str = "CONN_DETAILS_ENDPOINT";
/// Environment variable overriding the origin relative endpoints resolve against
pub const ORIGIN_ENV: &str = "MEETRTC_ORIGIN";
/// Origin used when none is configured
pub const DEFAULT_ORIGIN: &str = "http://localhost:3000";

/// Global meetrtc configuration
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    /// Enable debug logging
    pub debug_logging: bool,
    /// Fallback log directive when `RUST_LOG` is unset
    pub log_directive: String,
    /// Connection details endpoint, absolute or relative to `origin`
    pub conn_details_endpoint: String,
    /// Origin used to resolve a relative endpoint
    pub origin: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            debug_logging: false,
            log_directive: "meetrtc=info".to_string(),
            conn_details_endpoint: DEFAULT_CONN_DETAILS_ENDPOINT.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
        }
    }
}

impl GlobalConfig {
    /// Defaults overridden by `CONN_DETAILS_ENDPOINT` and `MEETRTC_ORIGIN`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(endpoint) = lookup(CONN_DETAILS_ENDPOINT_ENV).filter(|v| !v.is_empty()) {
            config.conn_details_endpoint = endpoint;
        }
        if let Some(origin) = lookup(ORIGIN_ENV).filter(|v| !v.is_empty()) {
            config.origin = origin;
        }
        config
    }
}

/// Room-specific configuration
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Enable camera on join
    pub video_enabled: bool,
    /// Enable microphone on join
    pub audio_enabled: bool,
    /// Preferred video codec
    pub video_codec: VideoCodec,
    /// Preferred server region
    pub region: Option<String>,
    /// Subscriber-side adaptive resolution
    pub adaptive_stream: bool,
    /// Pause unused simulcast layers
    pub dynacast: bool,
    /// Multiplex publish and subscribe over one peer connection
    pub single_peer_connection: bool,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            video_enabled: false,
            audio_enabled: false,
            video_codec: VideoCodec::default(),
            region: None,
            adaptive_stream: true,
            dynacast: true,
            single_peer_connection: true,
        }
    }
}

impl RoomConfig {
    /// SDK room options for this config
    ///
    /// With E2EE on, codecs the SDK cannot encrypt fall back to the SDK
    /// default and redundant audio is turned off.
    pub fn room_options(&self, e2ee_enabled: bool) -> RoomOptions {
        let video_codec = if e2ee_enabled && !self.video_codec.supports_e2ee() {
            None
        } else {
            Some(self.video_codec)
        };

        RoomOptions {
            publish_defaults: PublishDefaults {
                video_codec,
                red: !e2ee_enabled,
                simulcast_layers: vec![VideoPreset::H540, VideoPreset::H216],
            },
            adaptive_stream: self.adaptive_stream,
            dynacast: self.dynacast,
            e2ee: e2ee_enabled,
            single_peer_connection: self.single_peer_connection,
        }
    }
}

/// End-to-end encryption setup shared with the SDK room
#[derive(Debug, Clone)]
pub struct E2eeSetup {
    passphrase: String,
    key_provider: Arc<dyn KeyProvider>,
}

impl E2eeSetup {
    /// Setup from an already decoded passphrase
    pub fn new(passphrase: String, key_provider: Arc<dyn KeyProvider>) -> MeetRtcResult<Self> {
        if passphrase.is_empty() {
            return Err(MeetRtcError::InvalidPassphrase {
                reason: "passphrase is empty".to_string(),
            });
        }
        Ok(Self {
            passphrase,
            key_provider,
        })
    }

    /// Setup from a percent-encoded passphrase (as carried in a URL fragment)
    pub fn from_encoded(encoded: &str, key_provider: Arc<dyn KeyProvider>) -> MeetRtcResult<Self> {
        Self::new(decode_passphrase(encoded)?, key_provider)
    }

    /// Decoded passphrase
    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }

    /// Key provider
    pub fn key_provider(&self) -> &Arc<dyn KeyProvider> {
        &self.key_provider
    }
}

/// Percent-decode a passphrase, rejecting malformed escapes and invalid UTF-8
pub fn decode_passphrase(encoded: &str) -> MeetRtcResult<String> {
    let bytes = encoded.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape = bytes.get(i + 1..i + 3);
            if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
                return Err(MeetRtcError::InvalidPassphrase {
                    reason: format!("malformed escape at byte {}", i),
                });
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let decoded = percent_decode_str(encoded)
        .decode_utf8()
        .map_err(|e| MeetRtcError::InvalidPassphrase {
            reason: e.to_string(),
        })?;
    if decoded.is_empty() {
        return Err(MeetRtcError::InvalidPassphrase {
            reason: "passphrase is empty".to_string(),
        });
    }
    Ok(decoded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_global_config_from_lookup() {
        let vars: HashMap<&str, &str> = [(CONN_DETAILS_ENDPOINT_ENV, "https://tokens.example.org/join")]
            .into_iter()
            .collect();
        let config = GlobalConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.conn_details_endpoint, "https://tokens.example.org/join");
        assert_eq!(config.origin, DEFAULT_ORIGIN);

        let defaults = GlobalConfig::from_lookup(|_| None);
        assert_eq!(defaults.conn_details_endpoint, "/api/connection-details");
    }

    #[test]
    fn test_room_options_without_e2ee() {
        let config = RoomConfig::default();
        let options = config.room_options(false);
        assert_eq!(options.publish_defaults.video_codec, Some(VideoCodec::Vp9));
        assert!(options.publish_defaults.red);
        assert_eq!(
            options.publish_defaults.simulcast_layers,
            vec![VideoPreset::H540, VideoPreset::H216]
        );
        assert!(!options.e2ee);
    }

    #[test]
    fn test_room_options_with_e2ee() {
        let vp9 = RoomConfig::default().room_options(true);
        assert_eq!(vp9.publish_defaults.video_codec, None);
        assert!(!vp9.publish_defaults.red);
        assert!(vp9.e2ee);

        let h264 = RoomConfig {
            video_codec: VideoCodec::H264,
            ..RoomConfig::default()
        }
        .room_options(true);
        assert_eq!(h264.publish_defaults.video_codec, Some(VideoCodec::H264));
    }

    #[test]
    fn test_decode_passphrase() {
        assert_eq!(decode_passphrase("hello%20world").unwrap(), "hello world");
        assert_eq!(decode_passphrase("caf%C3%A9").unwrap(), "café");
        assert_eq!(decode_passphrase("plain").unwrap(), "plain");
    }

    #[test]
    fn test_decode_passphrase_rejects_malformed() {
        for bad in ["", "%", "abc%2", "%zz", "%C3%28"] {
            let err = decode_passphrase(bad).unwrap_err();
            assert!(
                matches!(err, MeetRtcError::InvalidPassphrase { .. }),
                "{bad:?} gave {err:?}"
            );
        }
    }
}
