use crate::{entities::user, errors::ServiceError};
use sea_orm::{DatabaseConnection, EntityTrait};
use std::sync::Arc;
use tracing::instrument;

/// Contact details stored on the user's account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

impl From<user::Model> for Profile {
    fn from(model: user::Model) -> Self {
        Self {
            full_name: model.full_name,
            email: Some(model.email),
            address: model.address,
            phone: model.phone,
        }
    }
}

/// Read-only access to user profiles.
#[derive(Clone)]
pub struct ProfileService {
    db: Arc<DatabaseConnection>,
}

impl ProfileService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn get_profile(&self, user_id: i32) -> Result<Profile, ServiceError> {
        user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .map(Profile::from)
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))
    }
}
