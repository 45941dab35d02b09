//! Loopback Meeting Demo
//!
//! Walks one participant through a full meeting against the in-memory
//! loopback SDK:
//! - pre-join permission prompt and join request
//! - end-to-end encryption setup before connecting
//! - quality switching across every preset
//! - bitrate sampling of the published camera by the view
//! - teardown on unmount
//!
//! Run with `RUST_LOG=meetrtc=debug` to see every SDK call.

use meetrtc::loopback::{
    LoopbackKeyProvider, LoopbackPermissions, LoopbackRoom, LoopbackScript, OrderingTrace,
};
use meetrtc::{
    ApplyOutcome, ConnectionDetails, E2eeSetup, FixedConnectionDetails, GlobalConfig,
    LocalUserChoices, MediaRoom, MeetRtc, PermissionStatus, QualityKey,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("🚀 meetrtc loopback meeting demo");
    println!("================================");

    let config = GlobalConfig {
        debug_logging: true,
        ..GlobalConfig::from_env()
    };
    let meet = MeetRtc::with_details_source(
        config,
        Arc::new(FixedConnectionDetails::new(ConnectionDetails::new(
            "wss://media.loopback.local",
            "demo-token",
        ))),
    );

    let trace = OrderingTrace::new();
    let script = LoopbackScript {
        key_delay: Duration::from_millis(50),
        connect_delay: Duration::from_millis(100),
        ..Default::default()
    };
    let key_provider = Arc::new(LoopbackKeyProvider::new(script.clone(), trace.clone()));
    let e2ee = E2eeSetup::from_encoded("demo%20passphrase", key_provider)?;

    let mut room_handle = None;
    let mut view = meet
        .room("demo")
        .e2ee(e2ee)
        .permissions(Arc::new(LoopbackPermissions::new(
            PermissionStatus::Granted,
            trace.clone(),
        )))
        .mount(|options| {
            println!("🏗️ Creating room with {:?}", options.publish_defaults);
            let room = Arc::new(LoopbackRoom::with_trace(options, script, trace.clone()));
            room_handle = Some(room.clone());
            room as Arc<dyn MediaRoom>
        })?;

    let mut events = view
        .events()
        .ok_or_else(|| anyhow::anyhow!("event stream already taken"))?;

    // ============================================================================
    // Join
    // ============================================================================
    println!("\n📋 Joining as alice");
    let report = view.join(LocalUserChoices::new("alice")).await?;
    println!(
        "✅ {} (camera: {}, microphone: {}, e2ee: {})",
        view.state(),
        report.camera_enabled,
        report.microphone_enabled,
        view.session().local_status().e2ee_enabled
    );
    for event in events.drain().iter().filter(|e| e.is_lifecycle_event()) {
        println!("   • {:?}", event);
    }

    // ============================================================================
    // Quality switching
    // ============================================================================
    println!("\n📋 Switching quality");
    for key in [QualityKey::P720, QualityKey::P480, QualityKey::P360, QualityKey::Auto] {
        match view.select_quality(key).await? {
            ApplyOutcome::NoCameraTrack => println!("⚠️ {}: no camera track", key.label()),
            ApplyOutcome::Applied { capture, encoder } => {
                println!("🎚️ {}: capture {:?}, encoder {:?}", key.label(), capture, encoder)
            }
        }
        tokio::time::sleep(Duration::from_millis(2100)).await;
        if let Some(monitor) = view.bitrate_monitor() {
            for sid in monitor.tracked() {
                if let Some(sample) = monitor.latest(&sid) {
                    println!("📊 {} target bitrate: {} kbps", sid, sample.target_kbps);
                }
            }
        }
    }
    let quality_events = events.drain().iter().filter(|e| e.is_quality_event()).count();
    println!("🎚️ {} quality events emitted", quality_events);

    // ============================================================================
    // Teardown
    // ============================================================================
    println!("\n📋 Leaving");
    let disconnected = view.unmount().await?;
    println!("👋 Disconnect issued: {}", disconnected);

    if let Some(room) = room_handle {
        println!("\n📜 SDK call order:");
        for (i, entry) in room.trace().entries().iter().enumerate() {
            println!("  {:>2}. {}", i + 1, entry);
        }
    }

    Ok(())
}
