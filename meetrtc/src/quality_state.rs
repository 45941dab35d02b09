//! Current quality selection of a view

use crate::lifecycle::ViewScope;
use meetrtc_core::QualityKey;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Observable quality key, `auto` until the user picks something
///
/// Updates are visible to `current()` as soon as `request` returns,
/// independent of whether applying the selection to the track succeeds.
#[derive(Debug, Clone)]
pub struct QualityState {
    sender: Arc<watch::Sender<QualityKey>>,
    scope: ViewScope,
}

impl QualityState {
    /// State with its own scope
    pub fn new() -> Self {
        Self::scoped(ViewScope::new())
    }

    /// State tied to a view scope
    pub fn scoped(scope: ViewScope) -> Self {
        let (sender, _) = watch::channel(QualityKey::Auto);
        Self {
            sender: Arc::new(sender),
            scope,
        }
    }

    /// Current key
    pub fn current(&self) -> QualityKey {
        *self.sender.borrow()
    }

    /// Record a selection; false once the view is gone
    pub fn request(&self, key: QualityKey) -> bool {
        if !self.scope.is_open() {
            debug!("Ignoring quality request {} after unmount", key);
            return false;
        }
        let previous = self.sender.send_replace(key);
        debug!("Quality {} -> {}", previous, key);
        true
    }

    /// Observe selections
    pub fn subscribe(&self) -> QualityWatcher {
        QualityWatcher {
            receiver: self.sender.subscribe(),
        }
    }

    /// Stop accepting selections
    pub fn close(&self) {
        self.scope.close();
    }

    /// Whether selections are still accepted
    pub fn is_open(&self) -> bool {
        self.scope.is_open()
    }
}

impl Default for QualityState {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver side of [`QualityState`]
#[derive(Debug, Clone)]
pub struct QualityWatcher {
    receiver: watch::Receiver<QualityKey>,
}

impl QualityWatcher {
    /// Wait for the next selection; `None` when the state is gone
    pub async fn changed(&mut self) -> Option<QualityKey> {
        self.receiver.changed().await.ok()?;
        Some(*self.receiver.borrow_and_update())
    }

    /// Latest key
    pub fn current(&self) -> QualityKey {
        *self.receiver.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_auto() {
        assert_eq!(QualityState::new().current(), QualityKey::Auto);
    }

    #[test]
    fn test_request_is_immediate() {
        let state = QualityState::new();
        assert!(state.request(QualityKey::P480));
        assert_eq!(state.current(), QualityKey::P480);
        assert!(state.request(QualityKey::P480));
        assert_eq!(state.current(), QualityKey::P480);
    }

    #[test]
    fn test_closed_state_rejects() {
        let state = QualityState::new();
        state.request(QualityKey::P360);
        state.close();
        assert!(!state.request(QualityKey::P720));
        assert_eq!(state.current(), QualityKey::P360);
    }

    #[tokio::test]
    async fn test_watcher_sees_requests() {
        let state = QualityState::new();
        let mut watcher = state.subscribe();
        state.request(QualityKey::P720);
        assert_eq!(watcher.changed().await, Some(QualityKey::P720));
        assert_eq!(watcher.current(), QualityKey::P720);

        drop(state);
        assert_eq!(watcher.changed().await, None);
    }
}
