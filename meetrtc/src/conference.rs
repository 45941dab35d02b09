//! Conference view: one mounted meeting screen

use crate::applier::{ApplyOutcome, QualityApplier};
use crate::config::E2eeSetup;
use crate::event::{Event, EventStream, UserNotice};
use crate::lifecycle::{RoomLifecycleGuard, TeardownHandle, ViewScope};
use crate::participant::LocalUserChoices;
use crate::quality_state::QualityState;
use crate::room::RoomSession;
use crate::sequencer::{ConnectionSequencer, JoinReport, SequencerDeps, SequencerState};
use meetrtc_core::{MediaPermissions, MeetRtcError, MeetRtcResult, QualityKey, RoomEvent};
#[cfg(feature = "diagnostics")]
use meetrtc_diagnostics::{PublicationMonitor, DEFAULT_SAMPLE_INTERVAL};
use meetrtc_signaling::ConnectionDetailsSource;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// A mounted meeting view
///
/// Owns the room session, the quality selection, the join sequence and the
/// single teardown registered for the room. Dropping the view without
/// `unmount` still tears the room down.
#[derive(Debug)]
pub struct ConferenceView {
    session: RoomSession,
    scope: ViewScope,
    quality: QualityState,
    applier: QualityApplier,
    sequencer: ConnectionSequencer,
    guard: Option<RoomLifecycleGuard>,
    event_tx: mpsc::UnboundedSender<Event>,
    event_rx: Option<mpsc::UnboundedReceiver<Event>>,
    room_events: broadcast::Receiver<RoomEvent>,
    #[cfg(feature = "diagnostics")]
    bitrate: Option<PublicationMonitor>,
}

impl ConferenceView {
    /// Mount a view over `session`
    pub fn mount(
        session: RoomSession,
        region: Option<String>,
        permissions: Arc<dyn MediaPermissions>,
        details_source: Arc<dyn ConnectionDetailsSource>,
        e2ee: Option<E2eeSetup>,
    ) -> Self {
        let scope = ViewScope::new();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let sequencer = ConnectionSequencer::new(
            session.clone(),
            SequencerDeps {
                permissions,
                details_source,
                e2ee,
                region,
            },
            scope.clone(),
            event_tx.clone(),
        );
        let room_events = session.media().events();
        let guard = RoomLifecycleGuard::register(session.clone(), scope.clone());
        #[cfg(feature = "diagnostics")]
        let bitrate = tokio::runtime::Handle::try_current().ok().map(|_| {
            PublicationMonitor::spawn(Arc::clone(session.media()), DEFAULT_SAMPLE_INTERVAL)
        });

        Self {
            quality: QualityState::scoped(scope.clone()),
            applier: QualityApplier::default(),
            session,
            scope,
            sequencer,
            guard: Some(guard),
            event_tx,
            event_rx: Some(event_rx),
            room_events,
            #[cfg(feature = "diagnostics")]
            bitrate,
        }
    }

    /// Room session
    pub fn session(&self) -> &RoomSession {
        &self.session
    }

    /// Quality selection
    pub fn quality(&self) -> &QualityState {
        &self.quality
    }

    /// Join sequence state
    pub fn state(&self) -> SequencerState {
        self.sequencer.state()
    }

    /// Notice currently shown
    pub fn notice(&self) -> Option<&UserNotice> {
        self.sequencer.notice()
    }

    /// Whether the view is still mounted
    pub fn is_mounted(&self) -> bool {
        self.scope.is_open()
    }

    /// Take the view's event stream; `None` after the first call
    pub fn events(&mut self) -> Option<EventStream> {
        self.event_rx.take().map(EventStream::new)
    }

    /// Outbound bitrate sampling of local video publications; `None` when
    /// the view was mounted outside a tokio runtime
    #[cfg(feature = "diagnostics")]
    pub fn bitrate_monitor(&self) -> Option<&PublicationMonitor> {
        self.bitrate.as_ref()
    }

    /// Trigger for this view's teardown, usable from other tasks
    pub fn teardown_handle(&self) -> Option<TeardownHandle> {
        self.guard.as_ref().map(RoomLifecycleGuard::handle)
    }

    /// Submit the pre-join choices and run the join sequence
    pub async fn join(&mut self, choices: LocalUserChoices) -> MeetRtcResult<JoinReport> {
        self.sequencer.join(choices).await
    }

    /// Switch quality
    ///
    /// The selection is recorded before the track is touched, so it stays in
    /// effect even when the apply step fails.
    pub async fn select_quality(&self, key: QualityKey) -> MeetRtcResult<ApplyOutcome> {
        if !self.quality.request(key) {
            return Err(MeetRtcError::ViewClosed);
        }
        self.emit(Event::QualityRequested { key });

        let outcome = self.applier.apply(&self.session, key).await?;
        if !self.scope.is_open() {
            debug!("Dropping quality {} result after unmount", key);
            return Err(MeetRtcError::ViewClosed);
        }
        self.emit(Event::QualityApplied {
            key,
            outcome: outcome.clone(),
        });
        Ok(outcome)
    }

    /// Wait for the next room signal, route it through the join sequence
    /// and forward it as a view event
    pub async fn process_room_event(&mut self) -> Option<Event> {
        loop {
            match self.room_events.recv().await {
                Ok(event) => {
                    self.sequencer.handle_room_event(&event);
                    if !self.scope.is_open() {
                        return None;
                    }
                    let forwarded = Event::Room { event };
                    self.emit(forwarded.clone());
                    return Some(forwarded);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("View lagged {} room events", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Leave the room but keep the view mounted
    pub async fn leave(&mut self) -> MeetRtcResult<bool> {
        self.sequencer.disconnect().await
    }

    /// Tear the view down; true if this call disconnected the room
    pub async fn unmount(mut self) -> MeetRtcResult<bool> {
        #[cfg(feature = "diagnostics")]
        if let Some(monitor) = self.bitrate.take() {
            monitor.stop();
        }
        let Some(guard) = self.guard.take() else {
            return Ok(false);
        };
        info!("Unmounting view for room {}", self.session.room_name());
        guard.release().await
    }

    fn emit(&self, event: Event) {
        // the caller may never take the stream
        let _ = self.event_tx.send(event);
    }
}
