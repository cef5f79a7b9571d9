use super::entities::{user, User};
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr};
use uuid::Uuid;

#[derive(Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<crate::domain::User>, DbErr> {
        Ok(User::find_by_id(id).one(&self.db).await?.map(Into::into))
    }

    pub async fn find_by_google_id(&self, google_id: &str) -> Result<Option<user::Model>, DbErr> {
        User::find()
            .filter(user::Column::GoogleId.eq(google_id))
            .one(&self.db)
            .await
    }

    /// Insert on first sign-in, refresh the profile on later ones.
    pub async fn upsert(&self, user_data: &crate::domain::User) -> Result<crate::domain::User, DbErr> {
        let now = chrono::Utc::now();
        let model = if let Some(existing) = self.find_by_google_id(&user_data.google_id).await? {
            let mut active: user::ActiveModel = existing.into();
            active.email = Set(user_data.email.clone());
            active.name = Set(user_data.name.clone());
            active.avatar_url = Set(user_data.avatar_url.clone());
            active.updated_at = Set(Some(now));
            active.update(&self.db).await?
        } else {
            let active = user::ActiveModel {
                id: Set(user_data.id),
                google_id: Set(user_data.google_id.clone()),
                email: Set(user_data.email.clone()),
                name: Set(user_data.name.clone()),
                avatar_url: Set(user_data.avatar_url.clone()),
                created_at: Set(Some(now)),
                updated_at: Set(Some(now)),
            };
            active.insert(&self.db).await?
        };
        Ok(model.into())
    }
}
