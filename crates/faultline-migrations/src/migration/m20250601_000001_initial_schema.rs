use sea_orm_migration::prelude::*;

/// Initial schema for the ownership chain: organizations, projects, stacks
/// and events.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create organizations table
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("organizations"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Alias::new("name")).string().not_null())
                    .col(
                        ColumnDef::new(Alias::new("retention_days"))
                            .integer()
                            .not_null()
                            .default(90),
                    )
                    .col(
                        ColumnDef::new(Alias::new("max_events_per_month"))
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Alias::new("is_suspended"))
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Alias::new("suspension_code")).string().null())
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("updated_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Create projects table
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("projects"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("organization_id"))
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Alias::new("name")).string().not_null())
                    .col(ColumnDef::new(Alias::new("settings")).json().not_null())
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("updated_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_projects_organization")
                            .from(Alias::new("projects"), Alias::new("organization_id"))
                            .to(Alias::new("organizations"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_projects_organization_id")
                    .table(Alias::new("projects"))
                    .col(Alias::new("organization_id"))
                    .to_owned(),
            )
            .await?;

        // Create stacks table
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("stacks"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("organization_id"))
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Alias::new("project_id")).string().not_null())
                    .col(
                        ColumnDef::new(Alias::new("signature_hash"))
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("signature_info"))
                            .json()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Alias::new("title")).string().not_null())
                    .col(
                        ColumnDef::new(Alias::new("status"))
                            .string()
                            .not_null()
                            .default("open"),
                    )
                    .col(
                        ColumnDef::new(Alias::new("is_regressed"))
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Alias::new("first_occurrence"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("last_occurrence"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("total_occurrences"))
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Alias::new("date_fixed"))
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("updated_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stacks_project")
                            .from(Alias::new("stacks"), Alias::new("project_id"))
                            .to(Alias::new("projects"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Dedup lookup is (project_id, signature_hash); hashes from different
        // projects may collide freely.
        manager
            .create_index(
                Index::create()
                    .name("idx_stacks_project_signature")
                    .table(Alias::new("stacks"))
                    .col(Alias::new("project_id"))
                    .col(Alias::new("signature_hash"))
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_stacks_organization_id")
                    .table(Alias::new("stacks"))
                    .col(Alias::new("organization_id"))
                    .to_owned(),
            )
            .await?;

        // Create events table
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("events"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("organization_id"))
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Alias::new("project_id")).string().not_null())
                    .col(ColumnDef::new(Alias::new("stack_id")).string().not_null())
                    .col(ColumnDef::new(Alias::new("event_type")).string().not_null())
                    .col(ColumnDef::new(Alias::new("source")).string().null())
                    .col(ColumnDef::new(Alias::new("message")).text().null())
                    .col(
                        ColumnDef::new(Alias::new("date"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Alias::new("reference_id")).string().null())
                    .col(ColumnDef::new(Alias::new("session_id")).string().null())
                    .col(
                        ColumnDef::new(Alias::new("session_end"))
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Alias::new("user_description"))
                            .text()
                            .null(),
                    )
                    .col(ColumnDef::new(Alias::new("data")).json().null())
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_events_stack")
                            .from(Alias::new("events"), Alias::new("stack_id"))
                            .to(Alias::new("stacks"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_events_stack_id")
                    .table(Alias::new("events"))
                    .col(Alias::new("stack_id"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_events_project_date")
                    .table(Alias::new("events"))
                    .col(Alias::new("project_id"))
                    .col(Alias::new("date"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_events_reference_id")
                    .table(Alias::new("events"))
                    .col(Alias::new("project_id"))
                    .col(Alias::new("reference_id"))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("events")).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Alias::new("stacks")).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Alias::new("projects")).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Alias::new("organizations")).to_owned())
            .await?;
        Ok(())
    }
}
