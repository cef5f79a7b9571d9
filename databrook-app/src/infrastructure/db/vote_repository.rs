use super::entities::{video, vote, Video, Vote};
use crate::domain::{TallyDelta, TallyPush, VoteMark};
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, TransactionTrait};
use uuid::Uuid;

#[derive(Clone)]
pub struct VoteRepository {
    db: DatabaseConnection,
}

impl VoteRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_mark(&self, user_id: Uuid, video_id: i64) -> Result<Option<VoteMark>, DbErr> {
        let vote = Vote::find()
            .filter(vote::Column::UserId.eq(user_id))
            .filter(vote::Column::VideoId.eq(video_id))
            .one(&self.db)
            .await?;
        Ok(vote.and_then(|v| VoteMark::from_value(v.value)))
    }

    /// Set the user's mark (`None` deletes the record) and adjust the video's
    /// tally in the same transaction.
    ///
    /// The video row is locked for the duration, so concurrent votes on the
    /// same video serialize and every tally change bumps `tally_revision` once.
    pub async fn apply_mark(
        &self,
        user_id: Uuid,
        video_id: i64,
        mark: Option<VoteMark>,
    ) -> Result<TallyPush, DbErr> {
        let txn = self.db.begin().await?;

        let video = Video::find_by_id(video_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(DbErr::RecordNotFound("Video not found".to_string()))?;

        let existing = Vote::find()
            .filter(vote::Column::UserId.eq(user_id))
            .filter(vote::Column::VideoId.eq(video_id))
            .one(&txn)
            .await?;
        let previous = existing.as_ref().and_then(|v| VoteMark::from_value(v.value));
        let now = chrono::Utc::now();

        match (existing, mark) {
            (Some(row), Some(mark)) if row.value != mark.value() => {
                let mut active: vote::ActiveModel = row.into();
                active.value = Set(mark.value());
                active.updated_at = Set(Some(now));
                active.update(&txn).await?;
            }
            (Some(_), Some(_)) => {}
            (None, Some(mark)) => {
                let active = vote::ActiveModel {
                    user_id: Set(user_id),
                    video_id: Set(video_id),
                    value: Set(mark.value()),
                    created_at: Set(Some(now)),
                    updated_at: Set(Some(now)),
                };
                active.insert(&txn).await?;
            }
            (Some(_), None) => {
                Vote::delete_many()
                    .filter(vote::Column::UserId.eq(user_id))
                    .filter(vote::Column::VideoId.eq(video_id))
                    .exec(&txn)
                    .await?;
            }
            (None, None) => {}
        }

        let delta = TallyDelta::between(previous, mark);
        let push = if delta.is_zero() {
            video.tally_push()
        } else {
            let tally = video.tally().apply(delta);
            let revision = video.tally_revision + 1;
            let mut active: video::ActiveModel = video.into();
            active.upvote_count = Set(i32::try_from(tally.up).unwrap_or(i32::MAX));
            active.downvote_count = Set(i32::try_from(tally.down).unwrap_or(i32::MAX));
            active.tally_revision = Set(revision);
            active.update(&txn).await?.tally_push()
        };

        txn.commit().await?;
        Ok(push)
    }
}
