//! Event system for conference view events

use crate::applier::ApplyOutcome;
use crate::sequencer::SequencerState;
use meetrtc_core::{MeetRtcError, QualityKey, RoomEvent};
use std::fmt;
use tokio::sync::mpsc;

/// Message surfaced to the user by the view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserNotice {
    /// Camera and microphone access was refused
    PermissionRequired,
    /// The platform cannot run encrypted meetings
    EncryptionUnsupported,
    /// The session ended; navigate back to the home page
    ReturnHome,
}

impl UserNotice {
    /// Text shown to the user
    pub fn message(&self) -> &'static str {
        match self {
            UserNotice::PermissionRequired => {
                "You need to allow the use of the camera and microphone to enter the room."
            }
            UserNotice::EncryptionUnsupported => "Browser does not support encrypted meetings.",
            UserNotice::ReturnHome => "The meeting has ended.",
        }
    }

    /// Whether the notice is a blocking alert rather than inline text
    pub fn is_alert(&self) -> bool {
        matches!(self, UserNotice::EncryptionUnsupported)
    }
}

impl fmt::Display for UserNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Events emitted by a conference view
#[derive(Debug, Clone)]
pub enum Event {
    /// The join sequence moved to a new state
    StateChanged {
        /// Previous state
        from: SequencerState,
        /// New state
        to: SequencerState,
    },
    /// A notice should be shown to the user
    Notice {
        /// The notice
        notice: UserNotice,
    },
    /// A device could not be enabled after connecting
    DeviceFailed {
        /// The failure
        error: MeetRtcError,
    },
    /// The user picked a quality key
    QualityRequested {
        /// Requested key
        key: QualityKey,
    },
    /// A quality selection finished applying
    QualityApplied {
        /// Applied key
        key: QualityKey,
        /// Per-step result
        outcome: ApplyOutcome,
    },
    /// Signal forwarded from the SDK room
    Room {
        /// The room signal
        event: RoomEvent,
    },
}

impl Event {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::StateChanged { .. } => "state_changed",
            Event::Notice { .. } => "notice",
            Event::DeviceFailed { .. } => "device_failed",
            Event::QualityRequested { .. } => "quality_requested",
            Event::QualityApplied { .. } => "quality_applied",
            Event::Room { .. } => "room",
        }
    }

    /// Check if this is a join lifecycle event
    pub fn is_lifecycle_event(&self) -> bool {
        matches!(
            self,
            Event::StateChanged { .. } | Event::Notice { .. } | Event::DeviceFailed { .. }
        )
    }

    /// Check if this is a quality event
    pub fn is_quality_event(&self) -> bool {
        matches!(
            self,
            Event::QualityRequested { .. } | Event::QualityApplied { .. }
        )
    }

    /// Check if this is a forwarded room signal
    pub fn is_room_event(&self) -> bool {
        matches!(self, Event::Room { .. })
    }
}

/// Stream of view events for async iteration
#[derive(Debug)]
pub struct EventStream {
    receiver: mpsc::UnboundedReceiver<Event>,
}

impl EventStream {
    /// Create a new event stream with a receiver
    pub fn new(receiver: mpsc::UnboundedReceiver<Event>) -> Self {
        Self { receiver }
    }

    /// Get the next event from the stream
    pub async fn next(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Try to get the next event without blocking
    pub fn try_next(&mut self) -> Result<Option<Event>, mpsc::error::TryRecvError> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => {
                Err(mpsc::error::TryRecvError::Disconnected)
            }
        }
    }

    /// Drain everything currently queued
    pub fn drain(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Close the event stream
    pub fn close(&mut self) {
        self.receiver.close();
    }
}
