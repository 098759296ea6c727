//! Create polls table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Polls::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Polls::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Polls::Title).string_len(100).not_null())
                    .col(ColumnDef::new(Polls::Description).text().not_null())
                    .col(ColumnDef::new(Polls::StartDate).date().not_null())
                    .col(ColumnDef::new(Polls::EndDate).date().not_null())
                    .col(
                        ColumnDef::new(Polls::Status)
                            .string_len(20)
                            .not_null()
                            .default("draft"),
                    )
                    .col(ColumnDef::new(Polls::OrganizerId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Polls::IsPrivate)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Polls::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Polls::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_polls_organizer")
                            .from(Polls::Table, Polls::OrganizerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_polls_organizer_id")
                    .table(Polls::Table)
                    .col(Polls::OrganizerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_polls_status")
                    .table(Polls::Table)
                    .col(Polls::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_polls_title")
                    .table(Polls::Table)
                    .col(Polls::Title)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Polls::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Polls {
    Table,
    Id,
    Title,
    Description,
    StartDate,
    EndDate,
    Status,
    OrganizerId,
    IsPrivate,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}
