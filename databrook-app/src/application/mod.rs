mod session;
mod vote_reconciler;
mod vote_store;

pub use session::SessionProvider;
pub use vote_reconciler::VoteReconciler;
pub use vote_store::{TallyStream, VoteStore};
