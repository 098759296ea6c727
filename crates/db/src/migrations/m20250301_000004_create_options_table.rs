//! Create options table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Options::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Options::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Options::QuestionId).string_len(32).not_null())
                    .col(ColumnDef::new(Options::Text).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Options::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Options::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_options_question")
                            .from(Options::Table, Options::QuestionId)
                            .to(Questions::Table, Questions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_options_question_id")
                    .table(Options::Table)
                    .col(Options::QuestionId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Options::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Options {
    Table,
    Id,
    QuestionId,
    Text,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Questions {
    Table,
    Id,
}
