use crate::application::VoteStore;
use crate::infrastructure::db::{
    DbVoteStore, OutcomeRepository, UserRepository, VideoRepository, VoteRepository,
};
use crate::infrastructure::realtime::TallyHub;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Shared handles for the hosted backend.
#[derive(Clone)]
pub struct AppContext {
    pub user_repo: UserRepository,
    pub outcome_repo: OutcomeRepository,
    pub video_repo: VideoRepository,
    pub vote_store: Arc<dyn VoteStore>,
    pub tally_hub: TallyHub,
}

impl AppContext {
    pub fn new(db: DatabaseConnection) -> Self {
        let tally_hub = TallyHub::new();
        let vote_store = DbVoteStore::new(VoteRepository::new(db.clone()), tally_hub.clone());
        Self {
            user_repo: UserRepository::new(db.clone()),
            outcome_repo: OutcomeRepository::new(db.clone()),
            video_repo: VideoRepository::new(db),
            vote_store: Arc::new(vote_store),
            tally_hub,
        }
    }
}
