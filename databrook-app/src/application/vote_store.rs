use crate::domain::{TallyPush, VideoId, ViewerId, VoteMark};
use async_trait::async_trait;
use databrook_errors::AppError;
use futures::stream::BoxStream;

/// Realtime tally notifications for one video. Dropping the stream unsubscribes.
pub type TallyStream = BoxStream<'static, TallyPush>;

/// The remote persistent store holding vote records and tally aggregates.
///
/// Writes return the authoritative tally after the change, so the caller can
/// confirm its optimistic state without waiting for the push channel.
#[async_trait]
pub trait VoteStore: Send + Sync {
    /// The viewer's existing mark, `None` when no record exists.
    async fn read_mark(&self, viewer: ViewerId, video: VideoId) -> Result<Option<VoteMark>, AppError>;

    /// Create or replace the (viewer, video) record.
    async fn upsert_mark(
        &self,
        viewer: ViewerId,
        video: VideoId,
        mark: VoteMark,
    ) -> Result<TallyPush, AppError>;

    /// Remove the (viewer, video) record. Removing an absent record is not an error.
    async fn delete_mark(&self, viewer: ViewerId, video: VideoId) -> Result<TallyPush, AppError>;

    /// Push channel of tally changes. At-least-once, no ordering promise.
    async fn subscribe_tally_changes(&self, video: VideoId) -> Result<TallyStream, AppError>;
}
