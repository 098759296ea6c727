//! Poll invitation entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Status of a poll invitation. `accepted` and `declined` are terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    /// Waiting for the voter's decision.
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    /// The voter accepted; grants view and vote access.
    #[sea_orm(string_value = "accepted")]
    Accepted,
    /// The voter declined.
    #[sea_orm(string_value = "declined")]
    Declined,
}

impl InvitationStatus {
    /// Storage value of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }
}

/// Poll invitation - grants a voter access to a private poll once accepted.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "poll_invitations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The private poll the invitation is for.
    #[sea_orm(indexed)]
    pub poll_id: String,

    /// The invited voter.
    #[sea_orm(indexed)]
    pub voter_id: String,

    /// The organizer or admin who sent the invitation. Cleared when that
    /// user is deleted.
    #[sea_orm(indexed, nullable)]
    pub invited_by_id: Option<String>,

    #[sea_orm(indexed)]
    pub status: InvitationStatus,

    pub created_at: DateTimeWithTimeZone,

    /// When the status was last updated.
    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::poll::Entity",
        from = "Column::PollId",
        to = "super::poll::Column::Id",
        on_delete = "Cascade"
    )]
    Poll,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::VoterId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Voter,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::InvitedById",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    InvitedBy,
}

impl Related<super::poll::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Poll.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
