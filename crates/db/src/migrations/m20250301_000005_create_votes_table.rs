//! Create votes table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Votes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Votes::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Votes::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Votes::OptionId).string_len(32).not_null())
                    .col(ColumnDef::new(Votes::QuestionId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Votes::SingleChoice)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Votes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_votes_user")
                            .from(Votes::Table, Votes::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_votes_option")
                            .from(Votes::Table, Votes::OptionId)
                            .to(Options::Table, Options::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_votes_question")
                            .from(Votes::Table, Votes::QuestionId)
                            .to(Questions::Table, Questions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique: one vote per (user, option)
        manager
            .create_index(
                Index::create()
                    .name("idx_votes_user_option")
                    .table(Votes::Table)
                    .col(Votes::UserId)
                    .col(Votes::OptionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_votes_question_id")
                    .table(Votes::Table)
                    .col(Votes::QuestionId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_votes_option_id")
                    .table(Votes::Table)
                    .col(Votes::OptionId)
                    .to_owned(),
            )
            .await?;

        // Partial unique index: one row per (user, single-choice question).
        // Same syntax on PostgreSQL and SQLite.
        manager
            .get_connection()
            .execute_unprepared(
                r"
                CREATE UNIQUE INDEX IF NOT EXISTS idx_votes_user_single_question
                ON votes (user_id, question_id)
                WHERE single_choice;
                ",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP INDEX IF EXISTS idx_votes_user_single_question;")
            .await?;

        manager
            .drop_table(Table::drop().table(Votes::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Votes {
    Table,
    Id,
    UserId,
    OptionId,
    QuestionId,
    SingleChoice,
    CreatedAt,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}

#[derive(Iden)]
enum Options {
    Table,
    Id,
}

#[derive(Iden)]
enum Questions {
    Table,
    Id,
}
