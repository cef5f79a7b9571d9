use crate::domain::ViewerId;
use tokio::sync::watch;

/// Source of the current viewer identity and its sign-in/sign-out transitions.
pub trait SessionProvider: Send + Sync {
    fn current_viewer(&self) -> Option<ViewerId>;

    fn subscribe(&self) -> watch::Receiver<Option<ViewerId>>;
}
