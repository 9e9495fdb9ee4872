use std::sync::Arc;

use chrono::Utc;
use faultline_core::new_id;
use faultline_entities::organizations;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use tracing::info;

use crate::error::RepositoryError;

#[derive(Debug, Clone)]
pub struct NewOrganization {
    pub name: String,
    pub retention_days: i32,
    pub max_events_per_month: i32,
}

/// Tenant root repository. Organizations are created by external signup
/// flows and only ever soft-suspended by the core.
pub struct OrganizationRepository {
    db: Arc<DatabaseConnection>,
}

impl OrganizationRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn add(
        &self,
        organization: NewOrganization,
    ) -> Result<organizations::Model, RepositoryError> {
        if organization.name.trim().is_empty() {
            return Err(RepositoryError::Validation(
                "organization name must not be empty".to_string(),
            ));
        }

        let now = Utc::now();
        let model = organizations::ActiveModel {
            id: Set(new_id()),
            name: Set(organization.name),
            retention_days: Set(organization.retention_days),
            max_events_per_month: Set(organization.max_events_per_month),
            is_suspended: Set(false),
            suspension_code: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(model.insert(self.db.as_ref()).await?)
    }

    pub async fn get_by_id(
        &self,
        id: &str,
    ) -> Result<Option<organizations::Model>, RepositoryError> {
        Ok(organizations::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?)
    }

    pub async fn suspend(
        &self,
        id: &str,
        code: Option<String>,
    ) -> Result<organizations::Model, RepositoryError> {
        let organization = self
            .get_by_id(id)
            .await?
            .ok_or(RepositoryError::NotFound("organization"))?;

        info!(organization_id = %id, "Suspending organization");
        let mut update: organizations::ActiveModel = organization.into();
        update.is_suspended = Set(true);
        update.suspension_code = Set(code);
        update.updated_at = Set(Utc::now());
        Ok(update.update(self.db.as_ref()).await?)
    }

    pub async fn unsuspend(&self, id: &str) -> Result<organizations::Model, RepositoryError> {
        let organization = self
            .get_by_id(id)
            .await?
            .ok_or(RepositoryError::NotFound("organization"))?;

        let mut update: organizations::ActiveModel = organization.into();
        update.is_suspended = Set(false);
        update.suspension_code = Set(None);
        update.updated_at = Set(Utc::now());
        Ok(update.update(self.db.as_ref()).await?)
    }
}
