use faultline_core::UtcDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Project setting consulted by the private-information plugin. When absent
/// or false, user identity and request details are stripped at ingestion.
pub const SETTING_INCLUDE_PRIVATE_INFORMATION: &str = "IncludePrivateInformation";

/// Comma-separated namespace patterns marking frames as user code.
pub const SETTING_USER_NAMESPACES: &str = "UserNamespaces";

/// Comma-separated method patterns excluded from signature selection.
pub const SETTING_COMMON_METHODS: &str = "CommonMethods";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Owning organization. Non-empty, immutable after creation.
    pub organization_id: String,
    pub name: String,

    /// Key/value settings consumed by pipeline plugins to toggle behavior.
    pub settings: Json,

    pub created_at: UtcDateTime,
    pub updated_at: UtcDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::organizations::Entity",
        from = "Column::OrganizationId",
        to = "super::organizations::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Organizations,
    #[sea_orm(has_many = "super::stacks::Entity")]
    Stacks,
}

impl Related<super::organizations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organizations.def()
    }
}

impl Related<super::stacks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stacks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn setting(&self, key: &str) -> Option<&serde_json::Value> {
        self.settings.as_object().and_then(|map| map.get(key))
    }

    pub fn bool_setting(&self, key: &str) -> Option<bool> {
        self.setting(key).and_then(|value| value.as_bool())
    }

    pub fn string_setting(&self, key: &str) -> Option<&str> {
        self.setting(key).and_then(|value| value.as_str())
    }

    /// Parse a comma-separated list setting, trimming blank entries.
    pub fn list_setting(&self, key: &str) -> Vec<String> {
        self.string_setting(key)
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|entry| !entry.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn project_with_settings(settings: serde_json::Value) -> Model {
        Model {
            id: "proj1".to_string(),
            organization_id: "org1".to_string(),
            name: "Test".to_string(),
            settings,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_bool_setting() {
        let project = project_with_settings(serde_json::json!({
            SETTING_INCLUDE_PRIVATE_INFORMATION: true,
        }));
        assert_eq!(project.bool_setting(SETTING_INCLUDE_PRIVATE_INFORMATION), Some(true));
        assert_eq!(project.bool_setting("Missing"), None);
    }

    #[test]
    fn test_list_setting_trims_blank_entries() {
        let project = project_with_settings(serde_json::json!({
            SETTING_USER_NAMESPACES: "Acme.Api, Acme.Jobs,,  ",
        }));
        assert_eq!(
            project.list_setting(SETTING_USER_NAMESPACES),
            vec!["Acme.Api".to_string(), "Acme.Jobs".to_string()]
        );
        assert!(project.list_setting(SETTING_COMMON_METHODS).is_empty());
    }
}
