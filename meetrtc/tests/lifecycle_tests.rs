//! View teardown tests over the loopback SDK

mod common;

use common::{mount, Mounted};
use meetrtc::loopback::{LoopbackScript, OrderingTrace};
use meetrtc::{
    ConnectionState, Event, LocalUserChoices, MediaRoom, MeetRtcError, SequencerState,
};
use std::time::Duration;

async fn joined() -> Mounted {
    let mut mounted = mount(LoopbackScript::default());
    mounted
        .view
        .join(LocalUserChoices::new("alice"))
        .await
        .unwrap();
    mounted
}

async fn wait_for_disconnect(trace: &OrderingTrace) {
    for _ in 0..10 {
        if trace.count("disconnect") > 0 {
            return;
        }
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_unmount_disconnects_once() {
    let Mounted { view, room, trace } = joined().await;

    assert!(view.unmount().await.unwrap());

    assert_eq!(room.connection_state(), ConnectionState::Disconnected);
    assert_eq!(trace.count("disconnect"), 1);
}

#[tokio::test]
async fn test_unmount_after_leave_is_noop() {
    let Mounted {
        mut view, trace, ..
    } = joined().await;
    view.leave().await.unwrap();

    assert!(!view.unmount().await.unwrap());
    assert_eq!(trace.count("disconnect"), 1);
}

#[tokio::test]
async fn test_unmount_after_server_disconnect_skips_disconnect() {
    let Mounted { view, room, trace } = joined().await;
    room.simulate_server_disconnect();

    assert!(!view.unmount().await.unwrap());
    assert_eq!(trace.count("disconnect"), 0);
}

#[tokio::test]
async fn test_unmount_before_join() {
    let Mounted { view, trace, .. } = mount(LoopbackScript::default());

    assert!(!view.unmount().await.unwrap());
    assert!(trace.entries().is_empty());
}

#[tokio::test]
async fn test_drop_without_unmount_disconnects_once() {
    let Mounted { view, room, trace } = joined().await;
    let handle = view.teardown_handle().unwrap();

    drop(view);
    wait_for_disconnect(&trace).await;

    assert_eq!(room.connection_state(), ConnectionState::Disconnected);
    assert_eq!(trace.count("disconnect"), 1);
    assert!(!handle.trigger().await.unwrap());
    assert_eq!(trace.count("disconnect"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_teardown_during_connect_discards_result() {
    let Mounted {
        mut view,
        room,
        trace,
    } = mount(LoopbackScript {
        connect_delay: Duration::from_millis(500),
        ..Default::default()
    });
    let mut events = view.events().unwrap();
    let handle = view.teardown_handle().unwrap();

    let (joined, _) = tokio::join!(view.join(LocalUserChoices::new("alice")), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.trigger().await.unwrap()
    });

    assert!(matches!(joined.unwrap_err(), MeetRtcError::ViewClosed));
    assert_eq!(view.state(), SequencerState::Connecting);
    assert!(!view.is_mounted());
    assert_eq!(room.connection_state(), ConnectionState::Disconnected);
    // one disconnect from the teardown while connecting, one for the late connection
    assert_eq!(trace.count("disconnect"), 2);
    let last_disconnect = trace
        .entries()
        .iter()
        .rposition(|entry| entry == "disconnect")
        .unwrap();
    assert!(common::position(&trace, "connect:done") < last_disconnect);
    assert!(trace.position("camera:on").is_none());
    assert!(!events.drain().iter().any(|event| matches!(
        event,
        Event::StateChanged {
            to: SequencerState::Connected,
            ..
        }
    )));
}

#[test]
fn test_view_dropped_outside_runtime_disconnects_once() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let Mounted { view, room, trace } = runtime.block_on(joined());
    drop(runtime);

    drop(view);

    assert_eq!(room.connection_state(), ConnectionState::Disconnected);
    assert_eq!(trace.count("disconnect"), 1);
}

#[cfg(feature = "diagnostics")]
#[tokio::test(start_paused = true)]
async fn test_view_samples_camera_bitrate() {
    let Mounted { view, .. } = joined().await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    let monitor = view.bitrate_monitor().unwrap();
    let tracked = monitor.tracked();
    assert_eq!(tracked.len(), 1);
    assert!(monitor.latest(&tracked[0]).is_some());
    assert!(monitor.is_running());

    view.unmount().await.unwrap();
}
