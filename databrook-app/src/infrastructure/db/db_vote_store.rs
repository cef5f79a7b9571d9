use super::VoteRepository;
use crate::application::{TallyStream, VoteStore};
use crate::domain::{TallyPush, VideoId, ViewerId, VoteMark};
use crate::infrastructure::realtime::TallyHub;
use async_trait::async_trait;
use databrook_errors::AppError;
use sea_orm::DbErr;

/// Postgres-backed vote store. Committed tally changes are announced on the hub.
#[derive(Clone)]
pub struct DbVoteStore {
    votes: VoteRepository,
    hub: TallyHub,
}

impl DbVoteStore {
    pub fn new(votes: VoteRepository, hub: TallyHub) -> Self {
        Self { votes, hub }
    }

    async fn apply(&self, viewer: ViewerId, video: VideoId, mark: Option<VoteMark>) -> Result<TallyPush, AppError> {
        let push = self
            .votes
            .apply_mark(viewer.0, video.0, mark)
            .await
            .map_err(|e| match e {
                DbErr::RecordNotFound(_) => AppError::NotFound,
                other => AppError::RemotePersistFailure(other.to_string()),
            })?;
        let receivers = self.hub.publish(push);
        tracing::debug!(video_id = %video, revision = push.revision, receivers, "published tally");
        Ok(push)
    }
}

#[async_trait]
impl VoteStore for DbVoteStore {
    async fn read_mark(&self, viewer: ViewerId, video: VideoId) -> Result<Option<VoteMark>, AppError> {
        self.votes
            .find_mark(viewer.0, video.0)
            .await
            .map_err(|e| AppError::RemoteReadFailure(e.to_string()))
    }

    async fn upsert_mark(
        &self,
        viewer: ViewerId,
        video: VideoId,
        mark: VoteMark,
    ) -> Result<TallyPush, AppError> {
        self.apply(viewer, video, Some(mark)).await
    }

    async fn delete_mark(&self, viewer: ViewerId, video: VideoId) -> Result<TallyPush, AppError> {
        self.apply(viewer, video, None).await
    }

    async fn subscribe_tally_changes(&self, video: VideoId) -> Result<TallyStream, AppError> {
        Ok(self.hub.stream(video))
    }
}
