use super::entities::{video, Video};
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr};

#[derive(Clone)]
pub struct VideoRepository {
    db: DatabaseConnection,
}

impl VideoRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<video::Model>, DbErr> {
        Video::find_by_id(id).one(&self.db).await
    }

    /// Playlist order: most upvoted first, ties by insertion order.
    pub async fn find_by_outcome(&self, outcome_id: i64) -> Result<Vec<crate::domain::Video>, DbErr> {
        let videos = Video::find()
            .filter(video::Column::OutcomeId.eq(outcome_id))
            .order_by_desc(video::Column::UpvoteCount)
            .order_by_asc(video::Column::Id)
            .all(&self.db)
            .await?;
        Ok(videos.into_iter().map(Into::into).collect())
    }
}
