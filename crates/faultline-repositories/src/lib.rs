//! Ownership-scoped repository layer
//!
//! Persistence and query services for the ownership chain
//! (Organization → Project → Stack → Event). Every write validates the owner
//! ids its entity declares through the capability traits before touching
//! storage; scoped reads share one paging/caching contract.

pub mod cache_keys;
pub mod error;
pub mod events;
pub mod organizations;
pub mod projects;
pub mod query;
pub mod stacks;
mod validation;

pub use error::RepositoryError;
pub use events::{EventRepository, NewEvent};
pub use organizations::{NewOrganization, OrganizationRepository};
pub use projects::{NewProject, ProjectRepository};
pub use stacks::{NewStack, StackRepository};
