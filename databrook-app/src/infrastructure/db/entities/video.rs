use crate::domain::{Tally, TallyPush, VideoId};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "videos")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub outcome_id: i64,
    pub title: String,
    pub provider: String,
    pub provider_id: String,
    pub upvote_count: i32,
    pub downvote_count: i32,
    pub tally_revision: i64,
    pub created_at: Option<DateTimeUtc>,
}

impl Model {
    pub fn tally(&self) -> Tally {
        Tally::new(
            u32::try_from(self.upvote_count).unwrap_or(0),
            u32::try_from(self.downvote_count).unwrap_or(0),
        )
    }

    pub fn tally_push(&self) -> TallyPush {
        TallyPush {
            video_id: VideoId(self.id),
            tally: self.tally(),
            revision: u64::try_from(self.tally_revision).unwrap_or(0),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::outcome::Entity",
        from = "Column::OutcomeId",
        to = "super::outcome::Column::Id",
        on_delete = "Cascade"
    )]
    Outcome,
    #[sea_orm(has_many = "super::vote::Entity")]
    Votes,
}

impl Related<super::outcome::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Outcome.def()
    }
}

impl Related<super::vote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Votes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::domain::Video {
    fn from(m: Model) -> Self {
        let push = m.tally_push();
        Self {
            id: push.video_id,
            outcome_id: m.outcome_id,
            title: m.title,
            provider: m.provider,
            provider_id: m.provider_id,
            tally: push.tally,
            revision: push.revision,
        }
    }
}
