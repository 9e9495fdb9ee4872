//! Ownership capability traits
//!
//! Each level of the ownership chain (Organization → Project → Stack) is an
//! orthogonal capability. A type implements exactly the capabilities matching
//! the owner ids it must carry, and repository validation requires the ids of
//! every capability a type declares to be non-empty before any write.

pub trait OwnedByOrganization {
    fn organization_id(&self) -> &str;
}

pub trait OwnedByProject {
    fn project_id(&self) -> &str;
}

pub trait OwnedByStack {
    fn stack_id(&self) -> &str;
}

impl OwnedByOrganization for super::projects::Model {
    fn organization_id(&self) -> &str {
        &self.organization_id
    }
}

impl OwnedByOrganization for super::stacks::Model {
    fn organization_id(&self) -> &str {
        &self.organization_id
    }
}

impl OwnedByProject for super::stacks::Model {
    fn project_id(&self) -> &str {
        &self.project_id
    }
}

impl OwnedByOrganization for super::events::Model {
    fn organization_id(&self) -> &str {
        &self.organization_id
    }
}

impl OwnedByProject for super::events::Model {
    fn project_id(&self) -> &str {
        &self.project_id
    }
}

impl OwnedByStack for super::events::Model {
    fn stack_id(&self) -> &str {
        &self.stack_id
    }
}
