use std::collections::BTreeMap;

use faultline_core::UtcDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub organization_id: String,
    pub project_id: String,
    pub stack_id: String,

    /// Event kind, e.g. "error", "log", "session".
    pub event_type: String,
    pub source: Option<String>,
    pub message: Option<String>,
    pub date: UtcDateTime,

    /// Client-supplied correlation id used to attach user descriptions later.
    pub reference_id: Option<String>,
    pub session_id: Option<String>,
    pub session_end: bool,

    /// Attached after persistence through the reference id; one of the two
    /// fields an event may mutate after being written.
    pub user_description: Option<String>,

    /// Structured payload (error info, request info, user info).
    pub data: Option<Json>,

    pub created_at: UtcDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stacks::Entity",
        from = "Column::StackId",
        to = "super::stacks::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Stacks,
    #[sea_orm(
        belongs_to = "super::projects::Entity",
        from = "Column::ProjectId",
        to = "super::projects::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Projects,
}

impl Related<super::stacks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stacks.def()
    }
}

impl Related<super::projects::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Projects.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// ---------------------------------------------------------------------------
// Structured event payload stored in the `data` JSON column
// ---------------------------------------------------------------------------

/// Well-known event type names.
pub const TYPE_ERROR: &str = "error";
pub const TYPE_LOG: &str = "log";
pub const TYPE_SESSION: &str = "session";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestInfo>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserInfo>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_stacking: Option<ManualStackingInfo>,

    /// Free-form extra values supplied by the client SDK.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

impl EventData {
    pub fn to_json_value(&self) -> Option<serde_json::Value> {
        serde_json::to_value(self).ok()
    }

    pub fn from_json_value(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

/// Error details carried by "error" events. Chained causes nest through
/// `inner`, innermost being closest to the fault.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Frame the runtime reported as the fault site, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_frame: Option<StackFrame>,

    /// Call stack ordered from the throw site outward.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stack_trace: Vec<StackFrame>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub inner: Option<Box<ErrorInfo>>,
}

impl ErrorInfo {
    /// The innermost error in the chain (the one closest to the fault).
    pub fn innermost(&self) -> &ErrorInfo {
        let mut current = self;
        while let Some(inner) = &current.inner {
            current = inner;
        }
        current
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StackFrame {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<i32>,
}

impl StackFrame {
    /// Fully-qualified method signature, e.g. `Acme.Api.Controller.Save`.
    pub fn full_method(&self) -> String {
        let mut parts = Vec::new();
        if let Some(namespace) = &self.namespace {
            if !namespace.is_empty() {
                parts.push(namespace.as_str());
            }
        }
        if let Some(type_name) = &self.type_name {
            if !type_name.is_empty() {
                parts.push(type_name.as_str());
            }
        }
        if let Some(method) = &self.method {
            if !method.is_empty() {
                parts.push(method.as_str());
            }
        }
        parts.join(".")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Caller-supplied stacking overrides; when present they take precedence over
/// frame analysis entirely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManualStackingInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub signature_data: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_method() {
        let frame = StackFrame {
            namespace: Some("Acme.Api".to_string()),
            type_name: Some("OrderController".to_string()),
            method: Some("Submit".to_string()),
            file_name: None,
            line_number: Some(42),
        };
        assert_eq!(frame.full_method(), "Acme.Api.OrderController.Submit");

        let bare = StackFrame {
            method: Some("main".to_string()),
            ..Default::default()
        };
        assert_eq!(bare.full_method(), "main");
    }

    #[test]
    fn test_innermost_error() {
        let error = ErrorInfo {
            error_type: Some("Outer".to_string()),
            inner: Some(Box::new(ErrorInfo {
                error_type: Some("Inner".to_string()),
                ..Default::default()
            })),
            ..Default::default()
        };
        assert_eq!(error.innermost().error_type.as_deref(), Some("Inner"));
    }

    #[test]
    fn test_event_data_json_round_trip() {
        let data = EventData {
            error: Some(ErrorInfo {
                error_type: Some("NullReferenceException".to_string()),
                message: Some("Object reference not set".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let value = data.to_json_value().unwrap();
        let back = EventData::from_json_value(&value).unwrap();
        assert_eq!(
            back.error.unwrap().error_type.as_deref(),
            Some("NullReferenceException")
        );
    }
}
