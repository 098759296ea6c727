//! Database migrations.
//!
//! Schema migrations for the database. Foreign keys are declared inline so
//! the same migrations run on PostgreSQL and SQLite.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20250301_000001_create_users_table;
mod m20250301_000002_create_polls_table;
mod m20250301_000003_create_questions_table;
mod m20250301_000004_create_options_table;
mod m20250301_000005_create_votes_table;
mod m20250301_000006_create_poll_invitations_table;
mod m20250301_000007_create_comments_table;
mod m20250301_000008_create_activities_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_users_table::Migration),
            Box::new(m20250301_000002_create_polls_table::Migration),
            Box::new(m20250301_000003_create_questions_table::Migration),
            Box::new(m20250301_000004_create_options_table::Migration),
            Box::new(m20250301_000005_create_votes_table::Migration),
            Box::new(m20250301_000006_create_poll_invitations_table::Migration),
            Box::new(m20250301_000007_create_comments_table::Migration),
            Box::new(m20250301_000008_create_activities_table::Migration),
        ]
    }
}
