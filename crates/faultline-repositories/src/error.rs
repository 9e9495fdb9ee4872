use sea_orm::DbErr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Fails fast before any write reaches storage.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("{0} not found")]
    NotFound(&'static str),
}
