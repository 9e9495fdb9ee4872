//! Change notification payloads and publisher abstraction
//!
//! One logical channel carries every entity-change notification; subscribers
//! filter by the scope ids on the payload. The publisher is a trait so the
//! notification throttle can be exercised without a real transport.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeType {
    Added,
    Changed,
    Saved,
    Removed,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Changed => "changed",
            Self::Saved => "saved",
            Self::Removed => "removed",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payload published to subscribers when an entity changes. Carries the most
/// specific scope ids available so subscribers can filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityChanged {
    /// Entity type name, e.g. "Stack" or "PersistentEvent".
    pub type_name: String,
    pub change_type: ChangeType,
    pub id: Option<String>,
    pub organization_id: Option<String>,
    pub project_id: Option<String>,
    pub stack_id: Option<String>,
}

impl EntityChanged {
    /// Throttle scope for this change: the most specific id available, falling
    /// back level by level to a global scope.
    pub fn scope_key(&self) -> String {
        if let Some(id) = &self.id {
            return format!("{}:{}", self.type_name, id);
        }
        if let Some(stack_id) = &self.stack_id {
            return format!("stack:{}", stack_id);
        }
        if let Some(project_id) = &self.project_id {
            return format!("project:{}", project_id);
        }
        if let Some(organization_id) = &self.organization_id {
            return format!("org:{}", organization_id);
        }
        "global".to_string()
    }
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Publish transport unavailable: {0}")]
    TransportUnavailable(String),
}

/// Publish/subscribe seam for change notifications.
#[async_trait]
pub trait ChangePublisher: Send + Sync {
    async fn publish(&self, change: EntityChanged) -> Result<(), PublishError>;
}
