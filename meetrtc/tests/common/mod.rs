//! Shared fixtures for meetrtc integration tests

#![allow(dead_code)]

use meetrtc::loopback::{LoopbackPermissions, LoopbackRoom, LoopbackScript, OrderingTrace};
use meetrtc::{
    ConferenceView, ConnectionDetails, Event, FixedConnectionDetails, GlobalConfig, MediaRoom,
    MeetRtc, PermissionStatus, RoomBuilder,
};
use std::sync::Arc;

pub const SERVER_URL: &str = "wss://media.loopback.test";
pub const TOKEN: &str = "loopback-token";

/// Entry point answering every join request with fixed details
pub fn meet() -> MeetRtc {
    MeetRtc::with_details_source(
        GlobalConfig::default(),
        Arc::new(FixedConnectionDetails::new(ConnectionDetails::new(
            SERVER_URL, TOKEN,
        ))),
    )
}

/// A mounted view over a loopback room
pub struct Mounted {
    pub view: ConferenceView,
    pub room: Arc<LoopbackRoom>,
    pub trace: OrderingTrace,
}

/// Mount `builder` over a loopback room scripted by `script`
pub fn mount_with(
    trace: OrderingTrace,
    builder: RoomBuilder,
    script: LoopbackScript,
    permission: PermissionStatus,
) -> Mounted {
    let builder = builder.permissions(Arc::new(LoopbackPermissions::new(
        permission,
        trace.clone(),
    )));
    let room = Arc::new(LoopbackRoom::with_trace(
        builder.room_options(),
        script,
        trace.clone(),
    ));
    let sdk_room = room.clone();
    let view = builder
        .mount(move |_| sdk_room as Arc<dyn MediaRoom>)
        .expect("mount");
    Mounted { view, room, trace }
}

/// Mount a plain room named `demo` with permission granted
pub fn mount(script: LoopbackScript) -> Mounted {
    mount_with(
        OrderingTrace::new(),
        meet().room("demo"),
        script,
        PermissionStatus::Granted,
    )
}

/// Index of `entry` in the trace, panicking with the full trace if absent
pub fn position(trace: &OrderingTrace, entry: &str) -> usize {
    trace
        .position(entry)
        .unwrap_or_else(|| panic!("{entry} missing from {:?}", trace.entries()))
}

/// Event types in arrival order
pub fn event_types(events: &[Event]) -> Vec<&'static str> {
    events.iter().map(Event::event_type).collect()
}
