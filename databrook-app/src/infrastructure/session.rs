use crate::application::SessionProvider;
use crate::domain::ViewerId;
use tokio::sync::watch;

/// In-process session holder. Sign-in and sign-out are broadcast to subscribers.
pub struct SessionState {
    viewer: watch::Sender<Option<ViewerId>>,
}

impl SessionState {
    pub fn new() -> Self {
        let (viewer, _) = watch::channel(None);
        Self { viewer }
    }

    pub fn sign_in(&self, viewer: ViewerId) {
        let previous = self.viewer.send_replace(Some(viewer));
        if previous != Some(viewer) {
            tracing::info!(viewer = %viewer, "viewer signed in");
        }
    }

    /// Returns the viewer that was signed in, if any.
    pub fn sign_out(&self) -> Option<ViewerId> {
        let previous = self.viewer.send_replace(None);
        if let Some(viewer) = previous {
            tracing::info!(viewer = %viewer, "viewer signed out");
        }
        previous
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionProvider for SessionState {
    fn current_viewer(&self) -> Option<ViewerId> {
        *self.viewer.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<Option<ViewerId>> {
        self.viewer.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transitions_reach_subscribers() {
        let session = SessionState::new();
        let mut rx = session.subscribe();
        let viewer = ViewerId(uuid::Uuid::from_u128(5));

        session.sign_in(viewer);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Some(viewer));
        assert_eq!(session.current_viewer(), Some(viewer));

        assert_eq!(session.sign_out(), Some(viewer));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), None);
    }

    #[test]
    fn test_sign_out_when_anonymous() {
        let session = SessionState::new();
        assert_eq!(session.sign_out(), None);
        assert_eq!(session.current_viewer(), None);
    }
}
