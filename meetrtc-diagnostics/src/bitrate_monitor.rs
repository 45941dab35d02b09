//! Periodic outbound bitrate sampling for local video tracks

use meetrtc_core::{LocalVideoTrack, MediaRoom, RoomEvent, RtpSender, TrackKind};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default sampling interval
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(2);

/// One sender stats sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitrateSample {
    /// Encoder target bitrate in kbps
    pub target_kbps: u64,
    /// When the sample was taken
    pub taken_at: Instant,
}

/// Samples a track's sender until stopped or dropped
#[derive(Debug)]
pub struct BitrateMonitor {
    track_sid: String,
    latest: Arc<Mutex<Option<BitrateSample>>>,
    handle: JoinHandle<()>,
}

impl BitrateMonitor {
    /// Start sampling `track`; `None` when the track has no sender yet
    pub fn spawn(track: Arc<dyn LocalVideoTrack>, interval: Duration) -> Option<Self> {
        let sender = track.sender()?;
        let track_sid = track.sid();
        let latest = Arc::new(Mutex::new(None));
        let handle = tokio::spawn(sample_loop(
            track_sid.clone(),
            sender,
            interval,
            Arc::clone(&latest),
        ));
        Some(Self {
            track_sid,
            latest,
            handle,
        })
    }

    /// SID of the sampled track
    pub fn track_sid(&self) -> &str {
        &self.track_sid
    }

    /// Most recent sample
    pub fn latest(&self) -> Option<BitrateSample> {
        *self.latest.lock()
    }

    /// Stop sampling
    pub fn stop(self) {
        debug!("Stopping bitrate monitor for {}", self.track_sid);
    }
}

impl Drop for BitrateMonitor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn sample_loop(
    track_sid: String,
    sender: Arc<dyn RtpSender>,
    interval: Duration,
    latest: Arc<Mutex<Option<BitrateSample>>>,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        match sender.stats().await {
            Ok(stats) => {
                if let Some(bps) = stats.target_bitrate {
                    let target_kbps = (bps + 500) / 1000;
                    debug!("{} bitrate: {} kbps", track_sid, target_kbps);
                    *latest.lock() = Some(BitrateSample {
                        target_kbps,
                        taken_at: Instant::now(),
                    });
                }
            }
            Err(e) => warn!("Failed to read sender stats for {}: {}", track_sid, e),
        }
    }
}

/// Samples every local video publication of a room until it is
/// unpublished or the room disconnects
///
/// Dropping the monitor stops all sampling.
#[derive(Debug)]
pub struct PublicationMonitor {
    monitors: Arc<Mutex<HashMap<String, BitrateMonitor>>>,
    handle: JoinHandle<()>,
}

impl PublicationMonitor {
    /// Start following `room`; must be called inside a tokio runtime
    pub fn spawn(room: Arc<dyn MediaRoom>, interval: Duration) -> Self {
        let mut events = room.events();
        let monitors: Arc<Mutex<HashMap<String, BitrateMonitor>>> = Arc::default();
        let tracked = Arc::clone(&monitors);
        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(RoomEvent::LocalTrackPublished { publication }) => {
                        if publication.source.kind() != TrackKind::Video {
                            continue;
                        }
                        let Some(track) = publication.video() else {
                            continue;
                        };
                        if let Some(monitor) = BitrateMonitor::spawn(track, interval) {
                            tracked.lock().insert(publication.sid, monitor);
                        }
                    }
                    Ok(RoomEvent::LocalTrackUnpublished { sid }) => {
                        if let Some(monitor) = tracked.lock().remove(&sid) {
                            monitor.stop();
                        }
                    }
                    Ok(RoomEvent::Disconnected { .. }) => tracked.lock().clear(),
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Bitrate monitor lagged {} room events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        Self { monitors, handle }
    }

    /// Most recent sample for the publication `track_sid`
    pub fn latest(&self, track_sid: &str) -> Option<BitrateSample> {
        self.monitors.lock().get(track_sid).and_then(BitrateMonitor::latest)
    }

    /// SIDs of the publications currently sampled
    pub fn tracked(&self) -> Vec<String> {
        self.monitors.lock().keys().cloned().collect()
    }

    /// Whether the monitor is still following the room
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop following the room
    pub fn stop(self) {
        debug!("Stopping publication monitor");
    }
}

impl Drop for PublicationMonitor {
    fn drop(&mut self) {
        self.handle.abort();
        self.monitors.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meetrtc_core::loopback::{LoopbackRoom, LoopbackScript};
    use meetrtc_core::{ConnectOptions, PublishDefaults, RoomOptions};

    fn room() -> LoopbackRoom {
        LoopbackRoom::new(
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
            },
            LoopbackScript::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_samples_target_bitrate() {
        let room = room();
        room.connect("wss://loopback", "token", ConnectOptions::default())
            .await
            .unwrap();
        room.set_camera_enabled(true).await.unwrap();

        let track = room.camera_track().unwrap();
        let monitor = BitrateMonitor::spawn(track, DEFAULT_SAMPLE_INTERVAL).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        // loopback reports 90% of the 1.7 Mbps ceiling
        assert_eq!(monitor.latest().map(|s| s.target_kbps), Some(1530));
    }

    #[tokio::test(start_paused = true)]
    async fn test_publication_monitor_follows_camera() {
        let room = Arc::new(room());
        let monitor = PublicationMonitor::spawn(room.clone(), DEFAULT_SAMPLE_INTERVAL);
        room.connect("wss://loopback", "token", ConnectOptions::default())
            .await
            .unwrap();
        room.set_camera_enabled(true).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let tracked = monitor.tracked();
        assert_eq!(tracked.len(), 1);
        assert_eq!(monitor.latest(&tracked[0]).map(|s| s.target_kbps), Some(1530));

        room.set_camera_enabled(false).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(monitor.tracked().is_empty());
        assert!(monitor.is_running());
    }

    #[tokio::test]
    async fn test_no_sender_no_monitor() {
        let room = LoopbackRoom::new(
            room().options().clone(),
            LoopbackScript {
                camera_without_sender: true,
                ..Default::default()
            },
        );
        room.connect("wss://loopback", "token", ConnectOptions::default())
            .await
            .unwrap();
        room.set_camera_enabled(true).await.unwrap();

        assert!(BitrateMonitor::spawn(room.camera_track().unwrap(), DEFAULT_SAMPLE_INTERVAL).is_none());
    }
}
