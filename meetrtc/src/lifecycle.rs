//! View scope and room teardown

use crate::room::RoomSession;
use meetrtc_core::MeetRtcResult;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Liveness flag of a mounted view
///
/// Async work started by the view checks the scope when it resumes and
/// drops its result once the view is gone.
#[derive(Debug, Clone)]
pub struct ViewScope {
    open: Arc<AtomicBool>,
}

impl ViewScope {
    /// New open scope
    pub fn new() -> Self {
        Self {
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Whether the view is still mounted
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Mark the view as gone; returns false if it already was
    pub fn close(&self) -> bool {
        self.open.swap(false, Ordering::AcqRel)
    }
}

impl Default for ViewScope {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct Teardown {
    session: RoomSession,
    scope: ViewScope,
    done: AtomicBool,
}

impl Teardown {
    async fn run(&self) -> MeetRtcResult<bool> {
        if self.done.swap(true, Ordering::AcqRel) {
            return Ok(false);
        }
        self.scope.close();
        let disconnected = self.session.disconnect().await?;
        info!(
            "🧹 Released room {} (disconnect issued: {})",
            self.session.room_name(),
            disconnected
        );
        Ok(disconnected)
    }
}

/// The one teardown registered for a view
///
/// Releasing closes the view scope and disconnects the room unless it is
/// already disconnected. Dropping an unreleased guard inside a tokio runtime
/// spawns the same teardown; outside one it runs to completion on a
/// current-thread runtime before `drop` returns.
#[derive(Debug)]
pub struct RoomLifecycleGuard {
    teardown: Arc<Teardown>,
}

impl RoomLifecycleGuard {
    /// Register teardown of `session` for the view owning `scope`
    pub fn register(session: RoomSession, scope: ViewScope) -> Self {
        debug!("Registered teardown for room {}", session.room_name());
        Self {
            teardown: Arc::new(Teardown {
                session,
                scope,
                done: AtomicBool::new(false),
            }),
        }
    }

    /// Run the teardown now; true if this call disconnected the room
    pub async fn release(self) -> MeetRtcResult<bool> {
        self.teardown.run().await
    }

    /// Handle that can trigger the same teardown from elsewhere
    pub fn handle(&self) -> TeardownHandle {
        TeardownHandle {
            teardown: Arc::clone(&self.teardown),
        }
    }

    /// Whether the teardown has run
    pub fn is_released(&self) -> bool {
        self.teardown.done.load(Ordering::Acquire)
    }
}

impl Drop for RoomLifecycleGuard {
    fn drop(&mut self) {
        if self.is_released() {
            return;
        }
        let teardown = Arc::clone(&self.teardown);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = teardown.run().await {
                        warn!("Teardown on drop failed: {}", e);
                    }
                });
            }
            Err(_) => {
                debug!(
                    "Room {} dropped outside a runtime; tearing down on a one-shot runtime",
                    teardown.session.room_name()
                );
                match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => {
                        if let Err(e) = runtime.block_on(teardown.run()) {
                            warn!("Teardown on drop failed: {}", e);
                        }
                    }
                    Err(e) => {
                        teardown.scope.close();
                        warn!(
                            "Room {} left connected, no runtime for teardown: {}",
                            teardown.session.room_name(),
                            e
                        );
                    }
                }
            }
        }
    }
}

/// Clonable trigger for a view's teardown
#[derive(Debug, Clone)]
pub struct TeardownHandle {
    teardown: Arc<Teardown>,
}

impl TeardownHandle {
    /// Run the teardown; later calls are no-ops
    pub async fn trigger(&self) -> MeetRtcResult<bool> {
        self.teardown.run().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoomConfig;
    use meetrtc_core::loopback::{LoopbackRoom, LoopbackScript};
    use meetrtc_core::{ConnectOptions, ConnectionState, MediaRoom};

    fn connected_room() -> Arc<LoopbackRoom> {
        let room = Arc::new(LoopbackRoom::new(
            RoomConfig::default().room_options(false),
            LoopbackScript::default(),
        ));
        tokio_test::block_on(room.connect("wss://loopback", "token", ConnectOptions::default()))
            .unwrap();
        room
    }

    #[test]
    fn test_drop_outside_runtime_disconnects() {
        let room = connected_room();
        let scope = ViewScope::new();
        let guard = RoomLifecycleGuard::register(RoomSession::new("demo", room.clone()), scope.clone());
        let handle = guard.handle();

        drop(guard);
        assert!(!scope.is_open());
        assert_eq!(room.connection_state(), ConnectionState::Disconnected);
        assert_eq!(room.trace().count("disconnect"), 1);
        assert!(!tokio_test::block_on(handle.trigger()).unwrap());
    }

    #[test]
    fn test_release_then_handle_is_noop() {
        let room = connected_room();
        let guard = RoomLifecycleGuard::register(RoomSession::new("demo", room.clone()), ViewScope::new());
        let handle = guard.handle();

        assert!(tokio_test::block_on(guard.release()).unwrap());
        assert!(!tokio_test::block_on(handle.trigger()).unwrap());
        assert_eq!(room.trace().count("disconnect"), 1);
    }

    #[test]
    fn test_scope_close_once() {
        let scope = ViewScope::new();
        let clone = scope.clone();
        assert!(clone.is_open());
        assert!(scope.close());
        assert!(!clone.is_open());
        assert!(!scope.close());
    }
}
