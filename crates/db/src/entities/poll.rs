//! Poll entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a poll. Transitions only move forward:
/// `draft -> active -> closed`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum PollStatus {
    /// Being assembled; not open for voting.
    #[sea_orm(string_value = "draft")]
    #[default]
    Draft,
    /// Open for voting.
    #[sea_orm(string_value = "active")]
    Active,
    /// Voting frozen. Terminal.
    #[sea_orm(string_value = "closed")]
    Closed,
}

impl PollStatus {
    /// Storage value of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Closed => "closed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "polls")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    pub start_date: Date,

    pub end_date: Date,

    #[sea_orm(indexed)]
    pub status: PollStatus,

    /// User who owns the poll (organizer or admin)
    #[sea_orm(indexed)]
    pub organizer_id: String,

    /// Restricted to invited voters
    #[sea_orm(default_value = false)]
    pub is_private: bool,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OrganizerId",
        to = "super::user::Column::Id",
        on_delete = "Restrict"
    )]
    Organizer,
    #[sea_orm(has_many = "super::question::Entity")]
    Questions,
    #[sea_orm(has_many = "super::poll_invitation::Entity")]
    Invitations,
    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organizer.def()
    }
}

impl Related<super::question::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Questions.def()
    }
}

impl Related<super::poll_invitation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invitations.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
