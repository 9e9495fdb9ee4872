//! Database migrations for the Faultline core tables

pub use sea_orm_migration::prelude::*;

mod migration;
pub use migration::Migrator;
