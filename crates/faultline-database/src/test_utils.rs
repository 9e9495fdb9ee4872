//! Test utilities for database integration tests
//!
//! Every `TestDatabase` is an isolated in-memory sqlite database with the
//! full schema applied, so tests never share state and need no external
//! services.

use crate::DbConnection;
use faultline_migrations::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database};
use std::sync::Arc;

pub struct TestDatabase {
    pub db: Arc<DbConnection>,
}

impl TestDatabase {
    /// Create a fresh in-memory database with all migrations applied.
    pub async fn with_migrations() -> anyhow::Result<Self> {
        // A single connection keeps every query on the same in-memory
        // database; a pool would hand each connection its own empty one.
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1);

        let db = Database::connect(opt).await?;
        Migrator::up(&db, None).await?;

        Ok(Self { db: Arc::new(db) })
    }

    pub fn connection_arc(&self) -> Arc<DbConnection> {
        self.db.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnectionTrait, Statement};

    #[tokio::test]
    async fn test_with_migrations_creates_schema() {
        let test_db = TestDatabase::with_migrations()
            .await
            .expect("Failed to create test database");

        let result = test_db
            .db
            .query_one(Statement::from_string(
                sea_orm::DatabaseBackend::Sqlite,
                "SELECT COUNT(*) AS n FROM stacks".to_owned(),
            ))
            .await
            .expect("stacks table should exist");
        assert!(result.is_some());
    }
}
