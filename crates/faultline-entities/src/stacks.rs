use faultline_core::UtcDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Stack lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StackStatus {
    Open,
    Resolved,
    Ignored,
}

impl StackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Resolved => "resolved",
            Self::Ignored => "ignored",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "resolved" => Some(Self::Resolved),
            "ignored" => Some(Self::Ignored),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stacks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub organization_id: String,
    pub project_id: String,

    /// Signature hash, unique within the owning project. The dedup lookup is
    /// always (project_id, signature_hash).
    pub signature_hash: String,
    /// Signature key/value map the hash was derived from.
    pub signature_info: Json,

    pub title: String,
    pub status: String, // 'open', 'resolved', 'ignored'
    pub is_regressed: bool,

    pub first_occurrence: UtcDateTime,
    pub last_occurrence: UtcDateTime,
    pub total_occurrences: i64,

    pub date_fixed: Option<UtcDateTime>,

    pub created_at: UtcDateTime,
    pub updated_at: UtcDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::projects::Entity",
        from = "Column::ProjectId",
        to = "super::projects::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Projects,
    #[sea_orm(has_many = "super::events::Entity")]
    Events,
}

impl Related<super::projects::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Projects.def()
    }
}

impl Related<super::events::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Events.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_resolved(&self) -> bool {
        self.status == StackStatus::Resolved.as_str()
    }

    pub fn is_ignored(&self) -> bool {
        self.status == StackStatus::Ignored.as_str()
    }
}
