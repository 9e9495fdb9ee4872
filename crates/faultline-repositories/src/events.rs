use std::sync::Arc;

use chrono::Utc;
use faultline_core::{new_id, PagingOptions, UtcDateTime};
use faultline_entities::events;
use faultline_entities::{OwnedByOrganization, OwnedByProject, OwnedByStack};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::error::RepositoryError;
use crate::query::apply_paging;
use crate::validation::{require_organization, require_project, require_stack};

/// A persistent event under construction. The pipeline fills in the stack id
/// before the event reaches `add`.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub id: String,
    pub organization_id: String,
    pub project_id: String,
    pub stack_id: String,
    pub event_type: String,
    pub source: Option<String>,
    pub message: Option<String>,
    pub date: UtcDateTime,
    pub reference_id: Option<String>,
    pub session_id: Option<String>,
    pub data: Option<serde_json::Value>,
}

impl NewEvent {
    pub fn new(organization_id: String, project_id: String, event_type: String) -> Self {
        Self {
            id: new_id(),
            organization_id,
            project_id,
            stack_id: String::new(),
            event_type,
            source: None,
            message: None,
            date: Utc::now(),
            reference_id: None,
            session_id: None,
            data: None,
        }
    }
}

impl OwnedByOrganization for NewEvent {
    fn organization_id(&self) -> &str {
        &self.organization_id
    }
}

impl OwnedByProject for NewEvent {
    fn project_id(&self) -> &str {
        &self.project_id
    }
}

impl OwnedByStack for NewEvent {
    fn stack_id(&self) -> &str {
        &self.stack_id
    }
}

/// Repository for persistent events. Events are immutable once written except
/// for the reference-id-linked user description and the session end marker.
pub struct EventRepository {
    db: Arc<DatabaseConnection>,
}

impl EventRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn validate(event: &NewEvent) -> Result<(), RepositoryError> {
        require_organization(event)?;
        require_project(event)?;
        require_stack(event)?;
        Ok(())
    }

    fn to_active_model(event: NewEvent) -> events::ActiveModel {
        events::ActiveModel {
            id: Set(event.id),
            organization_id: Set(event.organization_id),
            project_id: Set(event.project_id),
            stack_id: Set(event.stack_id),
            event_type: Set(event.event_type),
            source: Set(event.source),
            message: Set(event.message),
            date: Set(event.date),
            reference_id: Set(event.reference_id),
            session_id: Set(event.session_id),
            session_end: Set(false),
            user_description: Set(None),
            data: Set(event.data),
            created_at: Set(Utc::now()),
        }
    }

    pub async fn add(&self, event: NewEvent) -> Result<events::Model, RepositoryError> {
        Self::validate(&event)?;
        Ok(Self::to_active_model(event).insert(self.db.as_ref()).await?)
    }

    /// Validate every event before the first insert so a bad entity cannot
    /// leave a partial write behind.
    pub async fn add_many(&self, batch: Vec<NewEvent>) -> Result<usize, RepositoryError> {
        if batch.is_empty() {
            return Ok(0);
        }
        for event in &batch {
            Self::validate(event)?;
        }

        let count = batch.len();
        let models: Vec<events::ActiveModel> =
            batch.into_iter().map(Self::to_active_model).collect();
        events::Entity::insert_many(models)
            .exec(self.db.as_ref())
            .await?;
        Ok(count)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<events::Model>, RepositoryError> {
        Ok(events::Entity::find_by_id(id).one(self.db.as_ref()).await?)
    }

    pub async fn get_by_organization_id(
        &self,
        organization_id: &str,
        options: &PagingOptions,
    ) -> Result<Vec<events::Model>, RepositoryError> {
        let select =
            events::Entity::find().filter(events::Column::OrganizationId.eq(organization_id));
        Ok(apply_paging(select, options, events::Column::Id)
            .all(self.db.as_ref())
            .await?)
    }

    pub async fn get_by_project_id(
        &self,
        project_id: &str,
        options: &PagingOptions,
    ) -> Result<Vec<events::Model>, RepositoryError> {
        let select = events::Entity::find().filter(events::Column::ProjectId.eq(project_id));
        Ok(apply_paging(select, options, events::Column::Id)
            .all(self.db.as_ref())
            .await?)
    }

    pub async fn get_by_stack_id(
        &self,
        stack_id: &str,
        options: &PagingOptions,
    ) -> Result<Vec<events::Model>, RepositoryError> {
        let select = events::Entity::find().filter(events::Column::StackId.eq(stack_id));
        Ok(apply_paging(select, options, events::Column::Id)
            .all(self.db.as_ref())
            .await?)
    }

    pub async fn count_by_stack_id(&self, stack_id: &str) -> Result<u64, RepositoryError> {
        use sea_orm::PaginatorTrait;
        Ok(events::Entity::find()
            .filter(events::Column::StackId.eq(stack_id))
            .count(self.db.as_ref())
            .await?)
    }

    /// Attach a user-submitted description to the event that carried the
    /// given reference id.
    pub async fn set_user_description(
        &self,
        project_id: &str,
        reference_id: &str,
        description: &str,
    ) -> Result<u64, RepositoryError> {
        let result = events::Entity::update_many()
            .col_expr(
                events::Column::UserDescription,
                Expr::value(description.to_string()),
            )
            .filter(events::Column::ProjectId.eq(project_id))
            .filter(events::Column::ReferenceId.eq(reference_id))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }

    /// Flag the events of a session as ended.
    pub async fn mark_session_end(
        &self,
        project_id: &str,
        session_id: &str,
    ) -> Result<u64, RepositoryError> {
        let result = events::Entity::update_many()
            .col_expr(events::Column::SessionEnd, Expr::value(true))
            .filter(events::Column::ProjectId.eq(project_id))
            .filter(events::Column::SessionId.eq(session_id))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn remove_all_by_stack_id(&self, stack_id: &str) -> Result<u64, RepositoryError> {
        let result = events::Entity::delete_many()
            .filter(events::Column::StackId.eq(stack_id))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn remove_all_by_project_id(
        &self,
        project_id: &str,
    ) -> Result<u64, RepositoryError> {
        let result = events::Entity::delete_many()
            .filter(events::Column::ProjectId.eq(project_id))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn remove_all_by_organization_id(
        &self,
        organization_id: &str,
    ) -> Result<u64, RepositoryError> {
        let result = events::Entity::delete_many()
            .filter(events::Column::OrganizationId.eq(organization_id))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }
}
