use std::sync::Arc;

use chrono::Utc;
use faultline_core::{new_id, CacheClient, PagingOptions, UtcDateTime};
use faultline_entities::stacks::{self, StackStatus};
use faultline_entities::{OwnedByOrganization, OwnedByProject};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::debug;

use crate::cache_keys::{id_set_key, owner_key};
use crate::error::RepositoryError;
use crate::query::apply_paging;
use crate::validation::{require_organization, require_project};

const CACHE_PREFIX: &str = "stacks";

#[derive(Debug, Clone)]
pub struct NewStack {
    pub organization_id: String,
    pub project_id: String,
    pub signature_hash: String,
    pub signature_info: serde_json::Value,
    pub title: String,
    pub first_occurrence: UtcDateTime,
}

impl OwnedByOrganization for NewStack {
    fn organization_id(&self) -> &str {
        &self.organization_id
    }
}

impl OwnedByProject for NewStack {
    fn project_id(&self) -> &str {
        &self.project_id
    }
}

/// Repository for deduplicated stacks. The signature hash is unique within a
/// project; the dedup lookup is always `(project_id, signature_hash)`.
pub struct StackRepository {
    db: Arc<DatabaseConnection>,
    cache: Option<Arc<dyn CacheClient>>,
}

impl StackRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db, cache: None }
    }

    pub fn with_cache(db: Arc<DatabaseConnection>, cache: Arc<dyn CacheClient>) -> Self {
        Self {
            db,
            cache: Some(cache),
        }
    }

    pub async fn add(&self, stack: NewStack) -> Result<stacks::Model, RepositoryError> {
        require_organization(&stack)?;
        require_project(&stack)?;

        let now = Utc::now();
        let model = stacks::ActiveModel {
            id: Set(new_id()),
            organization_id: Set(stack.organization_id),
            project_id: Set(stack.project_id.clone()),
            signature_hash: Set(stack.signature_hash),
            signature_info: Set(stack.signature_info),
            title: Set(stack.title),
            status: Set(StackStatus::Open.as_str().to_string()),
            is_regressed: Set(false),
            first_occurrence: Set(stack.first_occurrence),
            last_occurrence: Set(stack.first_occurrence),
            total_occurrences: Set(1),
            date_fixed: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let inserted = model.insert(self.db.as_ref()).await?;
        self.invalidate_project(&stack.project_id).await;
        Ok(inserted)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<stacks::Model>, RepositoryError> {
        Ok(stacks::Entity::find_by_id(id).one(self.db.as_ref()).await?)
    }

    /// Dedup lookup used by the pipeline when resolving an event's stack.
    pub async fn get_by_signature_hash(
        &self,
        project_id: &str,
        signature_hash: &str,
    ) -> Result<Option<stacks::Model>, RepositoryError> {
        Ok(stacks::Entity::find()
            .filter(stacks::Column::ProjectId.eq(project_id))
            .filter(stacks::Column::SignatureHash.eq(signature_hash))
            .one(self.db.as_ref())
            .await?)
    }

    pub async fn get_by_project_id(
        &self,
        project_id: &str,
        options: &PagingOptions,
    ) -> Result<Vec<stacks::Model>, RepositoryError> {
        // Paged results must never be served from cache; a cursor or page
        // window cached once would silently go stale.
        let cacheable = options.use_cache && !options.is_paged();
        let key = owner_key(CACHE_PREFIX, project_id);

        if cacheable {
            if let Some(cache) = &self.cache {
                if let Some(value) = cache.get(&key).await {
                    if let Ok(models) = serde_json::from_value::<Vec<stacks::Model>>(value) {
                        debug!(project_id = %project_id, "Serving stacks from cache");
                        return Ok(models);
                    }
                }
            }
        }

        let select = stacks::Entity::find().filter(stacks::Column::ProjectId.eq(project_id));
        let models = apply_paging(select, options, stacks::Column::Id)
            .all(self.db.as_ref())
            .await?;

        if cacheable {
            if let Some(cache) = &self.cache {
                if let Ok(value) = serde_json::to_value(&models) {
                    cache.set(&key, value).await;
                }
            }
        }

        Ok(models)
    }

    pub async fn get_by_organization_id(
        &self,
        organization_id: &str,
        options: &PagingOptions,
    ) -> Result<Vec<stacks::Model>, RepositoryError> {
        let select =
            stacks::Entity::find().filter(stacks::Column::OrganizationId.eq(organization_id));
        Ok(apply_paging(select, options, stacks::Column::Id)
            .all(self.db.as_ref())
            .await?)
    }

    /// Fetch a set of stacks by id. The cache key is a digest of the sorted
    /// id set, so the same set hits the same entry in any input order.
    pub async fn get_by_ids(
        &self,
        ids: &[String],
        options: &PagingOptions,
    ) -> Result<Vec<stacks::Model>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let cacheable = options.use_cache && !options.is_paged();
        let key = id_set_key(CACHE_PREFIX, ids);

        if cacheable {
            if let Some(cache) = &self.cache {
                if let Some(value) = cache.get(&key).await {
                    if let Ok(models) = serde_json::from_value::<Vec<stacks::Model>>(value) {
                        return Ok(models);
                    }
                }
            }
        }

        let select = stacks::Entity::find().filter(stacks::Column::Id.is_in(ids.to_vec()));
        let models = apply_paging(select, options, stacks::Column::Id)
            .all(self.db.as_ref())
            .await?;

        if cacheable {
            if let Some(cache) = &self.cache {
                if let Ok(value) = serde_json::to_value(&models) {
                    cache.set(&key, value).await;
                }
            }
        }

        Ok(models)
    }

    /// Record one more occurrence. A single conditional UPDATE with an
    /// in-place increment keeps concurrent batches correct; a read-modify-
    /// write here would lose counts under racing workers.
    pub async fn increment_usage(
        &self,
        stack_id: &str,
        occurrence: UtcDateTime,
    ) -> Result<(), RepositoryError> {
        let result = stacks::Entity::update_many()
            .col_expr(
                stacks::Column::TotalOccurrences,
                Expr::col(stacks::Column::TotalOccurrences).add(1),
            )
            .col_expr(stacks::Column::LastOccurrence, Expr::value(occurrence))
            .col_expr(stacks::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(stacks::Column::Id.eq(stack_id))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound("stack"));
        }

        if let Some(stack) = self.get_by_id(stack_id).await? {
            self.invalidate_project(&stack.project_id).await;
        }
        Ok(())
    }

    pub async fn mark_resolved(&self, stack_id: &str) -> Result<stacks::Model, RepositoryError> {
        let stack = self
            .get_by_id(stack_id)
            .await?
            .ok_or(RepositoryError::NotFound("stack"))?;
        let project_id = stack.project_id.clone();

        let mut update: stacks::ActiveModel = stack.into();
        update.status = Set(StackStatus::Resolved.as_str().to_string());
        update.date_fixed = Set(Some(Utc::now()));
        update.is_regressed = Set(false);
        update.updated_at = Set(Utc::now());

        let updated = update.update(self.db.as_ref()).await?;
        self.invalidate_project(&project_id).await;
        Ok(updated)
    }

    pub async fn mark_open(&self, stack_id: &str) -> Result<stacks::Model, RepositoryError> {
        let stack = self
            .get_by_id(stack_id)
            .await?
            .ok_or(RepositoryError::NotFound("stack"))?;
        let project_id = stack.project_id.clone();

        let mut update: stacks::ActiveModel = stack.into();
        update.status = Set(StackStatus::Open.as_str().to_string());
        update.updated_at = Set(Utc::now());

        let updated = update.update(self.db.as_ref()).await?;
        self.invalidate_project(&project_id).await;
        Ok(updated)
    }

    /// A matching event arrived on a resolved stack: clear the resolved state
    /// and flag the regression.
    pub async fn mark_regressed(&self, stack_id: &str) -> Result<stacks::Model, RepositoryError> {
        let stack = self
            .get_by_id(stack_id)
            .await?
            .ok_or(RepositoryError::NotFound("stack"))?;
        let project_id = stack.project_id.clone();

        let mut update: stacks::ActiveModel = stack.into();
        update.status = Set(StackStatus::Open.as_str().to_string());
        update.is_regressed = Set(true);
        update.date_fixed = Set(None);
        update.updated_at = Set(Utc::now());

        let updated = update.update(self.db.as_ref()).await?;
        self.invalidate_project(&project_id).await;
        Ok(updated)
    }

    pub async fn remove_all_by_project_id(
        &self,
        project_id: &str,
    ) -> Result<u64, RepositoryError> {
        let result = stacks::Entity::delete_many()
            .filter(stacks::Column::ProjectId.eq(project_id))
            .exec(self.db.as_ref())
            .await?;
        self.invalidate_project(project_id).await;
        Ok(result.rows_affected)
    }

    pub async fn remove_all_by_organization_id(
        &self,
        organization_id: &str,
    ) -> Result<u64, RepositoryError> {
        let result = stacks::Entity::delete_many()
            .filter(stacks::Column::OrganizationId.eq(organization_id))
            .exec(self.db.as_ref())
            .await?;
        if let Some(cache) = &self.cache {
            cache.remove_by_prefix(&format!("{CACHE_PREFIX}:")).await;
        }
        Ok(result.rows_affected)
    }

    async fn invalidate_project(&self, project_id: &str) {
        if let Some(cache) = &self.cache {
            cache.remove(&owner_key(CACHE_PREFIX, project_id)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::organizations::{NewOrganization, OrganizationRepository};
    use crate::projects::{NewProject, ProjectRepository};
    use faultline_core::InMemoryCache;
    use faultline_database::test_utils::TestDatabase;

    async fn seed_project(db: &Arc<DatabaseConnection>) -> (String, String) {
        let organization = OrganizationRepository::new(db.clone())
            .add(NewOrganization {
                name: "Acme".to_string(),
                retention_days: 90,
                max_events_per_month: 0,
            })
            .await
            .unwrap();
        let project = ProjectRepository::new(db.clone())
            .add(NewProject {
                organization_id: organization.id.clone(),
                name: "Website".to_string(),
                settings: serde_json::json!({}),
            })
            .await
            .unwrap();
        (organization.id, project.id)
    }

    fn new_stack(organization_id: &str, project_id: &str, hash: &str) -> NewStack {
        NewStack {
            organization_id: organization_id.to_string(),
            project_id: project_id.to_string(),
            signature_hash: hash.to_string(),
            signature_info: serde_json::json!({"ExceptionType": "TypeError"}),
            title: "TypeError: boom".to_string(),
            first_occurrence: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_add_requires_owner_ids() {
        let test_db = TestDatabase::with_migrations().await.unwrap();
        let repo = StackRepository::new(test_db.connection_arc());

        let result = repo.add(new_stack("org1", "", "hash")).await;
        assert!(matches!(result, Err(RepositoryError::Validation(_))));

        let result = repo.add(new_stack("", "proj1", "hash")).await;
        assert!(matches!(result, Err(RepositoryError::Validation(_))));
    }

    #[tokio::test]
    async fn test_signature_lookup_is_project_scoped() {
        let test_db = TestDatabase::with_migrations().await.unwrap();
        let db = test_db.connection_arc();
        let (organization_id, project_id) = seed_project(&db).await;
        let repo = StackRepository::new(db);

        let stack = repo
            .add(new_stack(&organization_id, &project_id, "abc123"))
            .await
            .unwrap();

        let found = repo
            .get_by_signature_hash(&project_id, "abc123")
            .await
            .unwrap();
        assert_eq!(found.unwrap().id, stack.id);

        // Same hash under a different project must not match.
        let missing = repo
            .get_by_signature_hash("other-project", "abc123")
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_increment_usage_is_cumulative() {
        let test_db = TestDatabase::with_migrations().await.unwrap();
        let db = test_db.connection_arc();
        let (organization_id, project_id) = seed_project(&db).await;
        let repo = StackRepository::new(db);

        let stack = repo
            .add(new_stack(&organization_id, &project_id, "abc123"))
            .await
            .unwrap();
        assert_eq!(stack.total_occurrences, 1);

        let later = Utc::now();
        repo.increment_usage(&stack.id, later).await.unwrap();
        repo.increment_usage(&stack.id, later).await.unwrap();

        let updated = repo.get_by_id(&stack.id).await.unwrap().unwrap();
        assert_eq!(updated.total_occurrences, 3);
    }

    #[tokio::test]
    async fn test_increment_usage_unknown_stack() {
        let test_db = TestDatabase::with_migrations().await.unwrap();
        let repo = StackRepository::new(test_db.connection_arc());

        let result = repo.increment_usage("missing", Utc::now()).await;
        assert!(matches!(result, Err(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_resolve_then_regress() {
        let test_db = TestDatabase::with_migrations().await.unwrap();
        let db = test_db.connection_arc();
        let (organization_id, project_id) = seed_project(&db).await;
        let repo = StackRepository::new(db);

        let stack = repo
            .add(new_stack(&organization_id, &project_id, "abc123"))
            .await
            .unwrap();

        let resolved = repo.mark_resolved(&stack.id).await.unwrap();
        assert!(resolved.is_resolved());
        assert!(resolved.date_fixed.is_some());

        let regressed = repo.mark_regressed(&stack.id).await.unwrap();
        assert!(!regressed.is_resolved());
        assert!(regressed.is_regressed);
        assert!(regressed.date_fixed.is_none());
    }

    #[tokio::test]
    async fn test_unpaged_cached_query_is_served_from_cache() {
        let test_db = TestDatabase::with_migrations().await.unwrap();
        let db = test_db.connection_arc();
        let (organization_id, project_id) = seed_project(&db).await;
        let cache = Arc::new(InMemoryCache::new());
        let repo = StackRepository::with_cache(db, cache.clone());

        repo.add(new_stack(&organization_id, &project_id, "abc123"))
            .await
            .unwrap();

        let options = PagingOptions::new().cached();
        let first = repo.get_by_project_id(&project_id, &options).await.unwrap();
        assert_eq!(first.len(), 1);

        // Cached now; a paged variant of the same query must bypass it.
        let key = owner_key(CACHE_PREFIX, &project_id);
        assert!(cache.get(&key).await.is_some());

        let paged = PagingOptions::new().cached().with_page(1);
        let paged_result = repo.get_by_project_id(&project_id, &paged).await.unwrap();
        assert_eq!(paged_result.len(), 1);
    }

    #[tokio::test]
    async fn test_get_by_ids_shares_cache_entry_across_input_order() {
        let test_db = TestDatabase::with_migrations().await.unwrap();
        let db = test_db.connection_arc();
        let (organization_id, project_id) = seed_project(&db).await;
        let cache = Arc::new(InMemoryCache::new());
        let repo = StackRepository::with_cache(db, cache.clone());

        let first = repo
            .add(new_stack(&organization_id, &project_id, "h1"))
            .await
            .unwrap();
        let second = repo
            .add(new_stack(&organization_id, &project_id, "h2"))
            .await
            .unwrap();

        let forward = vec![first.id.clone(), second.id.clone()];
        let reversed = vec![second.id.clone(), first.id.clone()];

        let options = PagingOptions::new().cached();
        let fetched = repo.get_by_ids(&forward, &options).await.unwrap();
        assert_eq!(fetched.len(), 2);

        // Same id set in any order maps to the same cache entry.
        assert!(cache.get(&id_set_key(CACHE_PREFIX, &reversed)).await.is_some());
    }

    #[tokio::test]
    async fn test_cursor_paging_on_stacks() {
        let test_db = TestDatabase::with_migrations().await.unwrap();
        let db = test_db.connection_arc();
        let (organization_id, project_id) = seed_project(&db).await;
        let repo = StackRepository::new(db);

        for n in 0..5 {
            repo.add(new_stack(&organization_id, &project_id, &format!("hash{n}")))
                .await
                .unwrap();
        }

        let first_page = repo
            .get_by_project_id(&project_id, &PagingOptions::new().with_limit(2))
            .await
            .unwrap();
        assert_eq!(first_page.len(), 2);

        let cursor = first_page.last().unwrap().id.clone();
        let second_page = repo
            .get_by_project_id(
                &project_id,
                &PagingOptions::new().with_limit(2).with_after(&cursor),
            )
            .await
            .unwrap();
        assert_eq!(second_page.len(), 2);
        assert!(second_page.iter().all(|stack| stack.id > cursor));
    }
}
