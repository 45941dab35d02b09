//! Lookup of local tracks by source

use meetrtc_core::{LocalVideoTrack, MediaRoom, PublishedTrack, TrackSource};
use std::sync::Arc;

/// Find the publication for `source` among `tracks`
pub fn find_publication(tracks: &[PublishedTrack], source: TrackSource) -> Option<&PublishedTrack> {
    tracks.iter().find(|publication| publication.source == source)
}

/// Non-owning handle to a local video track
///
/// The track itself belongs to the SDK room; the handle resolves it on
/// demand so a republished or removed camera is always seen as current.
#[derive(Debug, Clone)]
pub struct LocalVideoTrackHandle {
    room: Arc<dyn MediaRoom>,
    source: TrackSource,
}

impl LocalVideoTrackHandle {
    /// Handle for the camera track of `room`
    pub fn camera(room: Arc<dyn MediaRoom>) -> Self {
        Self {
            room,
            source: TrackSource::Camera,
        }
    }

    /// Source this handle looks up
    pub fn source(&self) -> TrackSource {
        self.source
    }

    /// Current track, `None` if nothing is published for the source
    pub fn resolve(&self) -> Option<Arc<dyn LocalVideoTrack>> {
        let tracks = self.room.published_tracks();
        find_publication(&tracks, self.source).and_then(PublishedTrack::video)
    }

    /// Whether a track is currently published for the source
    pub fn is_published(&self) -> bool {
        self.resolve().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meetrtc_core::loopback::{LoopbackRoom, LoopbackScript};
    use meetrtc_core::{ConnectOptions, LocalTrackRef, PublishDefaults, RoomOptions};

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

    #[test]
    fn test_find_publication() {
        let tracks = vec![PublishedTrack {
            sid: "TR_mic".to_string(),
            source: TrackSource::Microphone,
            track: LocalTrackRef::Audio,
        }];
        assert!(find_publication(&tracks, TrackSource::Microphone).is_some());
        assert!(find_publication(&tracks, TrackSource::Camera).is_none());
    }

    #[tokio::test]
    async fn test_handle_follows_publication() {
        let room = Arc::new(LoopbackRoom::new(options(), LoopbackScript::default()));
        let handle = LocalVideoTrackHandle::camera(room.clone());
        assert!(!handle.is_published());

        room.connect("wss://loopback", "token", ConnectOptions::default())
            .await
            .unwrap();
        room.set_camera_enabled(true).await.unwrap();
        assert!(handle.is_published());

        room.set_camera_enabled(false).await.unwrap();
        assert!(handle.resolve().is_none());
    }
}
