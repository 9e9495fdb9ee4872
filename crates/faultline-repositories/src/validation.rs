//! Owner-id validation, run before any write
//!
//! Each helper requires exactly one ownership capability, so a repository
//! composes the checks matching what its entity declares instead of
//! inheriting a fixed chain.

use faultline_entities::{OwnedByOrganization, OwnedByProject, OwnedByStack};

use crate::error::RepositoryError;

fn require(id: &str, field: &'static str) -> Result<(), RepositoryError> {
    if id.trim().is_empty() {
        return Err(RepositoryError::Validation(format!(
            "{field} must be set before the entity can be added"
        )));
    }
    Ok(())
}

pub fn require_organization<T: OwnedByOrganization>(entity: &T) -> Result<(), RepositoryError> {
    require(entity.organization_id(), "organization_id")
}

pub fn require_project<T: OwnedByProject>(entity: &T) -> Result<(), RepositoryError> {
    require(entity.project_id(), "project_id")
}

pub fn require_stack<T: OwnedByStack>(entity: &T) -> Result<(), RepositoryError> {
    require(entity.stack_id(), "stack_id")
}
