use std::sync::Arc;

use chrono::Utc;
use faultline_core::{new_id, PagingOptions};
use faultline_entities::{projects, OwnedByOrganization};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::error::RepositoryError;
use crate::query::apply_paging;
use crate::validation::require_organization;

#[derive(Debug, Clone)]
pub struct NewProject {
    pub organization_id: String,
    pub name: String,
    pub settings: serde_json::Value,
}

impl OwnedByOrganization for NewProject {
    fn organization_id(&self) -> &str {
        &self.organization_id
    }
}

pub struct ProjectRepository {
    db: Arc<DatabaseConnection>,
}

impl ProjectRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn add(&self, project: NewProject) -> Result<projects::Model, RepositoryError> {
        require_organization(&project)?;

        let now = Utc::now();
        let model = projects::ActiveModel {
            id: Set(new_id()),
            organization_id: Set(project.organization_id),
            name: Set(project.name),
            settings: Set(project.settings),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(model.insert(self.db.as_ref()).await?)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<projects::Model>, RepositoryError> {
        Ok(projects::Entity::find_by_id(id).one(self.db.as_ref()).await?)
    }

    pub async fn get_by_organization_id(
        &self,
        organization_id: &str,
        options: &PagingOptions,
    ) -> Result<Vec<projects::Model>, RepositoryError> {
        let select = projects::Entity::find()
            .filter(projects::Column::OrganizationId.eq(organization_id));
        Ok(apply_paging(select, options, projects::Column::Id)
            .all(self.db.as_ref())
            .await?)
    }

    /// Update one settings key. Settings toggle plugin behavior per project.
    pub async fn set_setting(
        &self,
        project_id: &str,
        key: &str,
        value: serde_json::Value,
    ) -> Result<projects::Model, RepositoryError> {
        let project = self
            .get_by_id(project_id)
            .await?
            .ok_or(RepositoryError::NotFound("project"))?;

        let mut settings = match project.settings.clone() {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        settings.insert(key.to_string(), value);

        let mut update: projects::ActiveModel = project.into();
        update.settings = Set(serde_json::Value::Object(settings));
        update.updated_at = Set(Utc::now());
        Ok(update.update(self.db.as_ref()).await?)
    }

    pub async fn remove_all_by_organization_id(
        &self,
        organization_id: &str,
    ) -> Result<u64, RepositoryError> {
        let result = projects::Entity::delete_many()
            .filter(projects::Column::OrganizationId.eq(organization_id))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }
}
