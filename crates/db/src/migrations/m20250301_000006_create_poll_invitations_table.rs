//! Create poll invitations table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PollInvitations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PollInvitations::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PollInvitations::PollId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PollInvitations::VoterId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PollInvitations::InvitedById)
                            .string_len(32)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PollInvitations::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(PollInvitations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(PollInvitations::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_poll_invitations_poll")
                            .from(PollInvitations::Table, PollInvitations::PollId)
                            .to(Polls::Table, Polls::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_poll_invitations_voter")
                            .from(PollInvitations::Table, PollInvitations::VoterId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_poll_invitations_invited_by")
                            .from(PollInvitations::Table, PollInvitations::InvitedById)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique: one invitation per (poll, voter)
        manager
            .create_index(
                Index::create()
                    .name("idx_poll_invitations_poll_voter")
                    .table(PollInvitations::Table)
                    .col(PollInvitations::PollId)
                    .col(PollInvitations::VoterId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_poll_invitations_voter_status")
                    .table(PollInvitations::Table)
                    .col(PollInvitations::VoterId)
                    .col(PollInvitations::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PollInvitations::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PollInvitations {
    Table,
    Id,
    PollId,
    VoterId,
    InvitedById,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Polls {
    Table,
    Id,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}
