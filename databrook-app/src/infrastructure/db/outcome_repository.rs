use super::entities::Outcome;
use super::VideoRepository;
use crate::domain::OutcomePlaylist;
use sea_orm::{entity::*, DatabaseConnection, DbErr};

#[derive(Clone)]
pub struct OutcomeRepository {
    db: DatabaseConnection,
}

impl OutcomeRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<crate::domain::Outcome>, DbErr> {
        Ok(Outcome::find_by_id(id).one(&self.db).await?.map(Into::into))
    }

    pub async fn find_playlist(
        &self,
        id: i64,
        video_repo: &VideoRepository,
    ) -> Result<Option<OutcomePlaylist>, DbErr> {
        let Some(outcome) = self.find_by_id(id).await? else {
            return Ok(None);
        };
        let videos = video_repo.find_by_outcome(id).await?;
        Ok(Some(OutcomePlaylist { outcome, videos }))
    }
}
