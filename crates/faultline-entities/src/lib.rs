pub mod events;
pub mod organizations;
pub mod ownership;
pub mod projects;
pub mod stacks;

pub use ownership::{OwnedByOrganization, OwnedByProject, OwnedByStack};
